use std::sync::Arc;

use super::counter_writer::CounterWriter;
use super::shared::IdGenerator;
use crate::behavior_log::BehaviorLogSink;
use crate::context::AppContext;
use crate::error::AppError;
use crate::event::event_bus::EventBus;
use crate::store::RelationLookup;
use domain::behavior::{BehaviorLog, BehaviorType};
use domain::comment::{Comment, CommentRepository};
use domain::counter::CounterKind;
use domain::interaction::{Interaction, InteractionEvent, InteractionRepository, RelationKind};
use domain::value::{CommentId, UserId, VideoId};
use log::{debug, warn};

#[derive(Debug, Clone)]
pub struct PlayCmd {
    pub video_id: VideoId,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct ToggleCmd {
    pub user_id: UserId,
    pub kind: RelationKind,
    /// 视频、评论或被关注用户的 ID，取决于 kind
    pub target_id: i64,
}

#[derive(Debug, Clone)]
pub enum FireAndForgetAction {
    Comment { content: String },
    Share,
}

#[derive(Debug, Clone)]
pub struct FireAndForgetCmd {
    pub video_id: VideoId,
    pub user_id: UserId,
    pub action: FireAndForgetAction,
}

/// 行为写入口。
///
/// 返回值只表达成功或失败，从不返回最新计数。
pub struct BehaviorRecorder<B: EventBus> {
    interactions: Arc<dyn InteractionRepository>,
    comments: Arc<dyn CommentRepository>,
    writer: CounterWriter,
    lookup: RelationLookup,
    log_sink: Arc<BehaviorLogSink>,
    id_generator: Arc<dyn IdGenerator>,
    event_bus: Arc<B>,
}

impl<B: EventBus> BehaviorRecorder<B> {
    pub fn new(
        interactions: Arc<dyn InteractionRepository>,
        comments: Arc<dyn CommentRepository>,
        writer: CounterWriter,
        lookup: RelationLookup,
        log_sink: Arc<BehaviorLogSink>,
        id_generator: Arc<dyn IdGenerator>,
        event_bus: Arc<B>,
    ) -> Self {
        Self {
            interactions,
            comments,
            writer,
            lookup,
            log_sink,
            id_generator,
            event_bus,
        }
    }

    pub async fn play(&self, ctx: &AppContext, cmd: PlayCmd) -> Result<(), AppError> {
        self.writer
            .apply(CounterKind::Play, cmd.video_id.as_i64(), 1)
            .await?;
        self.log(cmd.user_id, cmd.video_id, BehaviorType::Play);
        self.publish(
            ctx,
            InteractionEvent::Played {
                video_id: cmd.video_id,
                user_id: cmd.user_id,
            },
        )
        .await;
        Ok(())
    }

    pub async fn toggle_on(&self, ctx: &AppContext, cmd: ToggleCmd) -> Result<(), AppError> {
        Self::validate(&cmd)?;
        if self
            .lookup
            .is_member(cmd.user_id, cmd.kind, cmd.target_id)
            .await?
        {
            debug!(
                "duplicate {}: user={} target={}",
                cmd.kind, cmd.user_id, cmd.target_id
            );
            return Ok(());
        }

        let interaction = Interaction::new(cmd.user_id, cmd.kind, cmd.target_id)?;
        if !self.interactions.insert(&interaction).await? {
            // 并发请求已先一步落库，补齐缓存集合即可
            debug!(
                "duplicate {} rejected by db: user={} target={}",
                cmd.kind, cmd.user_id, cmd.target_id
            );
            self.add_membership(&cmd).await;
            return Ok(());
        }

        if let Some(counter) = cmd.kind.counter() {
            if let Err(e) = self.writer.apply(counter, cmd.target_id, 1).await {
                self.compensate_insert(&cmd).await;
                return Err(e);
            }
        }
        self.add_membership(&cmd).await;

        match cmd.kind {
            RelationKind::Like => self.log(cmd.user_id, cmd.target_id.into(), BehaviorType::Like),
            RelationKind::Favorite => {
                self.log(cmd.user_id, cmd.target_id.into(), BehaviorType::Favorite)
            }
            RelationKind::Follow | RelationKind::CommentLike => {}
        }
        self.publish(
            ctx,
            InteractionEvent::Toggled {
                user_id: cmd.user_id,
                kind: cmd.kind,
                target_id: cmd.target_id,
                active: true,
            },
        )
        .await;
        Ok(())
    }

    pub async fn toggle_off(&self, ctx: &AppContext, cmd: ToggleCmd) -> Result<(), AppError> {
        Self::validate(&cmd)?;
        if !self
            .interactions
            .delete(cmd.user_id, cmd.kind, cmd.target_id)
            .await?
        {
            debug!(
                "redundant un{}: user={} target={}",
                cmd.kind, cmd.user_id, cmd.target_id
            );
            self.remove_membership(&cmd).await;
            return Ok(());
        }

        if let Some(counter) = cmd.kind.counter() {
            if let Err(e) = self.writer.apply(counter, cmd.target_id, -1).await {
                self.compensate_delete(&cmd).await;
                return Err(e);
            }
        }
        self.remove_membership(&cmd).await;

        self.publish(
            ctx,
            InteractionEvent::Toggled {
                user_id: cmd.user_id,
                kind: cmd.kind,
                target_id: cmd.target_id,
                active: false,
            },
        )
        .await;
        Ok(())
    }

    /// 评论与分享：每次都计数，不做去重
    pub async fn fire_and_forget(
        &self,
        ctx: &AppContext,
        cmd: FireAndForgetCmd,
    ) -> Result<Option<CommentId>, AppError> {
        match cmd.action {
            FireAndForgetAction::Comment { content } => {
                let id = self.id_generator.next_id().await?;
                let comment = Comment::new(CommentId::from(id), cmd.video_id, cmd.user_id, content)?;
                let video = cmd.video_id.as_i64();
                self.writer.apply(CounterKind::Comment, video, 1).await?;
                if let Err(e) = self.comments.create(&comment).await {
                    if let Err(undo) = self.writer.apply(CounterKind::Comment, video, -1).await {
                        warn!("failed to revert comment count of video {}: {}", video, undo);
                    }
                    return Err(e.into());
                }
                self.log(cmd.user_id, cmd.video_id, BehaviorType::Comment);
                self.publish(
                    ctx,
                    InteractionEvent::Commented {
                        video_id: cmd.video_id,
                        user_id: cmd.user_id,
                        comment_id: comment.id,
                    },
                )
                .await;
                Ok(Some(comment.id))
            }
            FireAndForgetAction::Share => {
                self.writer
                    .apply(CounterKind::Share, cmd.video_id.as_i64(), 1)
                    .await?;
                self.log(cmd.user_id, cmd.video_id, BehaviorType::Share);
                self.publish(
                    ctx,
                    InteractionEvent::Shared {
                        video_id: cmd.video_id,
                        user_id: cmd.user_id,
                    },
                )
                .await;
                Ok(None)
            }
        }
    }

    pub async fn comment(
        &self,
        ctx: &AppContext,
        video_id: VideoId,
        user_id: UserId,
        content: impl Into<String>,
    ) -> Result<CommentId, AppError> {
        let cmd = FireAndForgetCmd {
            video_id,
            user_id,
            action: FireAndForgetAction::Comment {
                content: content.into(),
            },
        };
        self.fire_and_forget(ctx, cmd)
            .await?
            .ok_or_else(|| AppError::UnknownError("comment id missing".to_string()))
    }

    pub async fn share(
        &self,
        ctx: &AppContext,
        video_id: VideoId,
        user_id: UserId,
    ) -> Result<(), AppError> {
        let cmd = FireAndForgetCmd {
            video_id,
            user_id,
            action: FireAndForgetAction::Share,
        };
        self.fire_and_forget(ctx, cmd).await.map(|_| ())
    }

    fn validate(cmd: &ToggleCmd) -> Result<(), AppError> {
        if cmd.kind == RelationKind::Follow && cmd.user_id.as_i64() == cmd.target_id {
            return Err(AppError::InvalidInput("cannot follow yourself".to_string()));
        }
        Ok(())
    }

    async fn add_membership(&self, cmd: &ToggleCmd) {
        if let Err(e) = self
            .lookup
            .membership()
            .add(cmd.user_id, cmd.kind, cmd.target_id)
            .await
        {
            warn!(
                "failed to cache {} of user {} on {}: {}",
                cmd.kind, cmd.user_id, cmd.target_id, e
            );
        }
    }

    async fn remove_membership(&self, cmd: &ToggleCmd) {
        if let Err(e) = self
            .lookup
            .membership()
            .remove(cmd.user_id, cmd.kind, cmd.target_id)
            .await
        {
            // 删除失败会留下脏成员，直接失效整个集合
            warn!(
                "failed to uncache {} of user {} on {}: {}",
                cmd.kind, cmd.user_id, cmd.target_id, e
            );
            let _ = self.lookup.membership().invalidate(cmd.user_id, cmd.kind).await;
        }
    }

    async fn compensate_insert(&self, cmd: &ToggleCmd) {
        if let Err(e) = self
            .interactions
            .delete(cmd.user_id, cmd.kind, cmd.target_id)
            .await
        {
            warn!(
                "failed to roll back {} of user {} on {}: {}",
                cmd.kind, cmd.user_id, cmd.target_id, e
            );
        }
    }

    async fn compensate_delete(&self, cmd: &ToggleCmd) {
        let restored = Interaction::new(cmd.user_id, cmd.kind, cmd.target_id)
            .map_err(AppError::from);
        let result = match restored {
            Ok(row) => self.interactions.insert(&row).await.map_err(AppError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(
                "failed to restore {} of user {} on {}: {}",
                cmd.kind, cmd.user_id, cmd.target_id, e
            );
        }
    }

    fn log(&self, user_id: UserId, video_id: VideoId, behavior: BehaviorType) {
        self.log_sink
            .submit(BehaviorLog::now(user_id, video_id, behavior));
    }

    async fn publish(&self, ctx: &AppContext, event: InteractionEvent) {
        if let Err(e) = self.event_bus.publish(ctx.envelope(event)).await {
            warn!("failed to publish interaction event: {}", e);
        }
    }
}
