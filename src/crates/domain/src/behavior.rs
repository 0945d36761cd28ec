use crate::value::{UserId, VideoId};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BehaviorError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Unknown behavior type: {0}")]
    UnknownType(i16),
}

/// 行为类型，数值与落库编码一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorType {
    Play,
    Like,
    Favorite,
    Comment,
    Share,
}

impl BehaviorType {
    pub fn code(&self) -> i16 {
        match self {
            BehaviorType::Play => 1,
            BehaviorType::Like => 2,
            BehaviorType::Favorite => 3,
            BehaviorType::Comment => 4,
            BehaviorType::Share => 5,
        }
    }

    pub fn from_code(code: i16) -> Result<Self, BehaviorError> {
        match code {
            1 => Ok(BehaviorType::Play),
            2 => Ok(BehaviorType::Like),
            3 => Ok(BehaviorType::Favorite),
            4 => Ok(BehaviorType::Comment),
            5 => Ok(BehaviorType::Share),
            _ => Err(BehaviorError::UnknownType(code)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BehaviorType::Play => "play",
            BehaviorType::Like => "like",
            BehaviorType::Favorite => "favorite",
            BehaviorType::Comment => "comment",
            BehaviorType::Share => "share",
        }
    }
}

impl fmt::Display for BehaviorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 只追加的行为日志
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorLog {
    pub user_id: UserId,
    pub video_id: VideoId,
    pub behavior: BehaviorType,
    pub created_at: NaiveDateTime,
}

impl BehaviorLog {
    pub fn now(user_id: UserId, video_id: VideoId, behavior: BehaviorType) -> Self {
        Self {
            user_id,
            video_id,
            behavior,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[async_trait]
pub trait BehaviorLogRepository: Send + Sync {
    async fn append_batch(&self, entries: &[BehaviorLog]) -> Result<(), BehaviorError>;
}
