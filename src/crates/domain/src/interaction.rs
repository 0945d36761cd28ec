use crate::counter::CounterKind;
use crate::event::DomainEvent;
use crate::value::{CommentId, UserId, VideoId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::collections::HashMap;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Unknown relation kind: {0}")]
    UnknownKind(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// 可开关的关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    Like,
    Favorite,
    Follow,
    CommentLike,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Like,
        RelationKind::Favorite,
        RelationKind::Follow,
        RelationKind::CommentLike,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::Like => "like",
            RelationKind::Favorite => "favorite",
            RelationKind::Follow => "follow",
            RelationKind::CommentLike => "comment_like",
        }
    }

    /// 关系变更时联动的计数器，关注不计数
    pub fn counter(&self) -> Option<CounterKind> {
        match self {
            RelationKind::Like => Some(CounterKind::Like),
            RelationKind::Favorite => Some(CounterKind::Favorite),
            RelationKind::CommentLike => Some(CounterKind::CommentLike),
            RelationKind::Follow => None,
        }
    }

    pub fn for_counter(kind: CounterKind) -> Option<RelationKind> {
        RelationKind::ALL
            .iter()
            .copied()
            .find(|r| r.counter() == Some(kind))
    }
}

impl FromStr for RelationKind {
    type Err = InteractionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(RelationKind::Like),
            "favorite" | "collect" => Ok(RelationKind::Favorite),
            "follow" => Ok(RelationKind::Follow),
            "comment_like" => Ok(RelationKind::CommentLike),
            _ => Err(InteractionError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 用户与目标之间的一条关系记录
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub user_id: UserId,
    pub kind: RelationKind,
    pub target_id: i64,
    pub created_at: NaiveDateTime,
}

impl Interaction {
    pub fn new(user_id: UserId, kind: RelationKind, target_id: i64) -> Result<Self, InteractionError> {
        if kind == RelationKind::Follow && user_id.as_i64() == target_id {
            return Err(InteractionError::InvalidOperation(
                "cannot follow yourself".to_string(),
            ));
        }
        Ok(Self {
            user_id,
            kind,
            target_id,
            created_at: Utc::now().naive_utc(),
        })
    }
}

// 行为事件，发布后不回滚计数
#[derive(Debug, Clone)]
pub enum InteractionEvent {
    Played {
        video_id: VideoId,
        user_id: UserId,
    },
    Toggled {
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
        active: bool,
    },
    Commented {
        video_id: VideoId,
        user_id: UserId,
        comment_id: CommentId,
    },
    Shared {
        video_id: VideoId,
        user_id: UserId,
    },
}

impl DomainEvent for InteractionEvent {
    fn aggregate_id(&self) -> i64 {
        match self {
            InteractionEvent::Played { video_id, .. } => video_id.as_i64(),
            InteractionEvent::Toggled { target_id, .. } => *target_id,
            InteractionEvent::Commented { video_id, .. } => video_id.as_i64(),
            InteractionEvent::Shared { video_id, .. } => video_id.as_i64(),
        }
    }

    fn version(&self) -> i64 {
        0
    }

    fn name(&self) -> &'static str {
        match self {
            InteractionEvent::Played { .. } => "played",
            InteractionEvent::Toggled { active: true, .. } => "toggled_on",
            InteractionEvent::Toggled { active: false, .. } => "toggled_off",
            InteractionEvent::Commented { .. } => "commented",
            InteractionEvent::Shared { .. } => "shared",
        }
    }
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// 插入关系，已存在时返回 false
    async fn insert(&self, interaction: &Interaction) -> Result<bool, InteractionError>;
    /// 删除关系，确实删除了一行才返回 true
    async fn delete(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError>;
    async fn exists(
        &self,
        user_id: UserId,
        kind: RelationKind,
        target_id: i64,
    ) -> Result<bool, InteractionError>;
    /// 用户在某关系下的全部目标，按时间倒序
    async fn targets_of(
        &self,
        user_id: UserId,
        kind: RelationKind,
    ) -> Result<Vec<i64>, InteractionError>;
    /// 统计每个目标的关系行数，没有行的目标不出现在结果中
    async fn count_by_targets(
        &self,
        kind: RelationKind,
        target_ids: &[i64],
    ) -> Result<HashMap<i64, i64>, InteractionError>;
}
