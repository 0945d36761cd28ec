use crate::value::VideoId;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Database error: {0}")]
    DbErr(String),
    #[error("Unknown counter kind: {0}")]
    UnknownKind(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// 计数挂载的目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetScope {
    Video,
    Comment,
}

impl TargetScope {
    pub fn name(&self) -> &'static str {
        match self {
            TargetScope::Video => "video",
            TargetScope::Comment => "comment",
        }
    }

    /// 该目标类型下的全部计数器
    pub fn kinds(&self) -> &'static [CounterKind] {
        match self {
            TargetScope::Video => &CounterKind::VIDEO,
            TargetScope::Comment => &[CounterKind::CommentLike],
        }
    }
}

impl fmt::Display for TargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CounterKind {
    Play,
    Like,
    Comment,
    Share,
    Favorite,
    CommentLike,
}

impl CounterKind {
    pub const ALL: [CounterKind; 6] = [
        CounterKind::Play,
        CounterKind::Like,
        CounterKind::Comment,
        CounterKind::Share,
        CounterKind::Favorite,
        CounterKind::CommentLike,
    ];

    pub const VIDEO: [CounterKind; 5] = [
        CounterKind::Play,
        CounterKind::Like,
        CounterKind::Comment,
        CounterKind::Share,
        CounterKind::Favorite,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CounterKind::Play => "play",
            CounterKind::Like => "like",
            CounterKind::Comment => "comment",
            CounterKind::Share => "share",
            CounterKind::Favorite => "favorite",
            CounterKind::CommentLike => "comment_like",
        }
    }

    /// 缓存快照中的字段名
    pub fn field(&self) -> &'static str {
        match self {
            CounterKind::Play => "playCount",
            CounterKind::Like | CounterKind::CommentLike => "likeCount",
            CounterKind::Comment => "commentCount",
            CounterKind::Share => "shareCount",
            CounterKind::Favorite => "favoriteCount",
        }
    }

    pub fn scope(&self) -> TargetScope {
        match self {
            CounterKind::CommentLike => TargetScope::Comment,
            _ => TargetScope::Video,
        }
    }

    pub fn from_field(scope: TargetScope, field: &str) -> Option<CounterKind> {
        scope.kinds().iter().copied().find(|k| k.field() == field)
    }
}

impl FromStr for CounterKind {
    type Err = CounterError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(CounterKind::Play),
            "like" => Ok(CounterKind::Like),
            "comment" => Ok(CounterKind::Comment),
            "share" => Ok(CounterKind::Share),
            "favorite" | "collect" => Ok(CounterKind::Favorite),
            "comment_like" => Ok(CounterKind::CommentLike),
            _ => Err(CounterError::UnknownKind(s.to_string())),
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 单个目标的计数快照，缺失的计数器按 0 处理
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub scope: TargetScope,
    pub target_id: i64,
    counts: BTreeMap<CounterKind, i64>,
}

impl CounterSnapshot {
    pub fn zeroed(scope: TargetScope, target_id: i64) -> Self {
        Self {
            scope,
            target_id,
            counts: scope.kinds().iter().map(|k| (*k, 0)).collect(),
        }
    }

    pub fn get(&self, kind: CounterKind) -> i64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: CounterKind, value: i64) {
        if kind.scope() == self.scope {
            self.counts.insert(kind, value);
        }
    }

    pub fn apply(&mut self, kind: CounterKind, delta: i64) {
        let value = self.get(kind) + delta;
        self.set(kind, value);
    }

    pub fn with(mut self, kind: CounterKind, value: i64) -> Self {
        self.set(kind, value);
        self
    }

    /// 按缓存字段展开
    pub fn fields(&self) -> Vec<(&'static str, i64)> {
        self.scope
            .kinds()
            .iter()
            .map(|k| (k.field(), self.get(*k)))
            .collect()
    }

    /// 从缓存字段还原，未知字段忽略
    pub fn from_fields<'a, I>(scope: TargetScope, target_id: i64, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut snapshot = Self::zeroed(scope, target_id);
        for (field, value) in fields {
            if let Some(kind) = CounterKind::from_field(scope, field) {
                snapshot.set(kind, value);
            }
        }
        snapshot
    }
}

/// 视频计数的对外视图，计数永远非负
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoStat {
    pub video_id: i64,
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub favorite_count: i64,
}

impl VideoStat {
    pub fn zeroed(video_id: VideoId) -> Self {
        Self {
            video_id: video_id.as_i64(),
            ..Default::default()
        }
    }
}

impl From<&CounterSnapshot> for VideoStat {
    fn from(snapshot: &CounterSnapshot) -> Self {
        let read = |kind: CounterKind| snapshot.get(kind).max(0);
        Self {
            video_id: snapshot.target_id,
            play_count: read(CounterKind::Play),
            like_count: read(CounterKind::Like),
            comment_count: read(CounterKind::Comment),
            share_count: read(CounterKind::Share),
            favorite_count: read(CounterKind::Favorite),
        }
    }
}

/// 持久化聚合计数仓储
#[async_trait]
pub trait StatRepository: Send + Sync {
    /// 插入全零行，已存在时忽略
    async fn create(&self, scope: TargetScope, target_id: i64) -> Result<(), CounterError>;
    async fn find(
        &self,
        scope: TargetScope,
        target_id: i64,
    ) -> Result<Option<CounterSnapshot>, CounterError>;
    async fn find_many(
        &self,
        scope: TargetScope,
        target_ids: &[i64],
    ) -> Result<Vec<CounterSnapshot>, CounterError>;
    /// 单行增量，行不存在时先建行
    async fn increment(
        &self,
        kind: CounterKind,
        target_id: i64,
        delta: i64,
    ) -> Result<(), CounterError>;
    /// 批量合并增量：缺失行先补齐，再一次性更新，返回受影响行数
    async fn apply_deltas(
        &self,
        kind: CounterKind,
        deltas: &[(i64, i64)],
    ) -> Result<u64, CounterError>;
    /// 直接覆盖计数，用于对账
    async fn overwrite(
        &self,
        kind: CounterKind,
        target_id: i64,
        value: i64,
    ) -> Result<(), CounterError>;
}
