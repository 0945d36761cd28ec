use crate::error::AppError;
use crate::store::{CounterStore, RelationLookup, SnapshotLoader};
use domain::counter::{CounterKind, CounterSnapshot, TargetScope, VideoStat};
use domain::interaction::RelationKind;
use domain::value::{CommentId, UserId, VideoId};
use log::warn;
use model::engagement::{CommentEngagement, VideoEngagement};

/// 读路径：优先缓存，缺失时回源并回填
#[derive(Clone)]
pub struct ReadHydration {
    counters: CounterStore,
    loader: SnapshotLoader,
    lookup: RelationLookup,
}

impl ReadHydration {
    pub fn new(counters: CounterStore, loader: SnapshotLoader, lookup: RelationLookup) -> Self {
        Self {
            counters,
            loader,
            lookup,
        }
    }

    pub async fn video(
        &self,
        viewer: Option<UserId>,
        video_id: VideoId,
    ) -> Result<VideoEngagement, AppError> {
        let id = video_id.as_i64();
        let snapshot = self.snapshot(TargetScope::Video, id).await?;
        let (liked, favorited) = match viewer {
            Some(user) => (
                Some(self.lookup.is_member(user, RelationKind::Like, id).await?),
                Some(self.lookup.is_member(user, RelationKind::Favorite, id).await?),
            ),
            None => (None, None),
        };
        Ok(VideoEngagement::new(
            VideoStat::from(&snapshot),
            liked,
            favorited,
        ))
    }

    /// 批量读取，缓存缺失的条目先按 0 返回并在后台回填
    pub async fn videos(
        &self,
        viewer: Option<UserId>,
        video_ids: &[VideoId],
    ) -> Result<Vec<VideoEngagement>, AppError> {
        let ids: Vec<i64> = video_ids.iter().map(|v| v.as_i64()).collect();
        let snapshots = self.snapshots(TargetScope::Video, &ids).await?;
        let (liked, favorited) = match viewer {
            Some(user) => (
                Some(self.lookup.check_many(user, RelationKind::Like, &ids).await?),
                Some(
                    self.lookup
                        .check_many(user, RelationKind::Favorite, &ids)
                        .await?,
                ),
            ),
            None => (None, None),
        };
        Ok(snapshots
            .iter()
            .enumerate()
            .map(|(i, snapshot)| {
                VideoEngagement::new(
                    VideoStat::from(snapshot),
                    liked.as_ref().map(|v| v[i]),
                    favorited.as_ref().map(|v| v[i]),
                )
            })
            .collect())
    }

    pub async fn comments(
        &self,
        viewer: Option<UserId>,
        comment_ids: &[CommentId],
    ) -> Result<Vec<CommentEngagement>, AppError> {
        let ids: Vec<i64> = comment_ids.iter().map(|c| c.as_i64()).collect();
        let snapshots = self.snapshots(TargetScope::Comment, &ids).await?;
        let liked = match viewer {
            Some(user) => Some(
                self.lookup
                    .check_many(user, RelationKind::CommentLike, &ids)
                    .await?,
            ),
            None => None,
        };
        Ok(snapshots
            .iter()
            .enumerate()
            .map(|(i, snapshot)| CommentEngagement {
                comment_id: snapshot.target_id,
                like_count: snapshot.get(CounterKind::CommentLike).max(0),
                liked: liked.as_ref().map(|v| v[i]),
            })
            .collect())
    }

    async fn snapshot(&self, scope: TargetScope, id: i64) -> Result<CounterSnapshot, AppError> {
        match self.counters.read(scope, id).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => self.loader.load(scope, id).await,
            Err(e) => {
                warn!("counter cache read failed, serving {} {} from db: {}", scope, id, e);
                let mut rows = self.loader.durable(scope, &[id]).await?;
                Ok(rows
                    .pop()
                    .unwrap_or_else(|| CounterSnapshot::zeroed(scope, id)))
            }
        }
    }

    async fn snapshots(
        &self,
        scope: TargetScope,
        ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = match self.counters.read_many(scope, ids).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("counter cache batch read failed, serving from db: {}", e);
                return self.loader.durable(scope, ids).await;
            }
        };

        let mut misses = Vec::new();
        let snapshots: Vec<CounterSnapshot> = ids
            .iter()
            .zip(rows)
            .map(|(id, row)| {
                row.unwrap_or_else(|| {
                    misses.push(*id);
                    CounterSnapshot::zeroed(scope, *id)
                })
            })
            .collect();
        if !misses.is_empty() {
            self.backfill(scope, misses);
        }
        Ok(snapshots)
    }

    fn backfill(&self, scope: TargetScope, ids: Vec<i64>) {
        let loader = self.loader.clone();
        tokio::spawn(async move {
            for id in ids {
                if let Err(e) = loader.load(scope, id).await {
                    warn!("failed to backfill {} snapshot {}: {}", scope, id, e);
                }
            }
        });
    }
}
