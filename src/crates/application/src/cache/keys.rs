use domain::counter::{CounterKind, TargetScope};
use domain::interaction::RelationKind;
use domain::value::UserId;

/// 缓存键命名空间，所有键都带统一前缀
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with(':') {
            prefix.push(':');
        }
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn snapshot(&self, scope: TargetScope, target_id: i64) -> String {
        format!("{}{}:stat:{}", self.prefix, scope.name(), target_id)
    }

    pub fn membership(&self, user_id: UserId, kind: RelationKind) -> String {
        format!("{}user:{}:{}", self.prefix, kind.name(), user_id)
    }

    /// 增量缓冲区，用 hash tag 保证与其临时键落在同一槽位
    pub fn buffer(&self, kind: CounterKind) -> String {
        format!("{{{}buffer:{}}}", self.prefix, kind.name())
    }

    pub fn claim(&self, kind: CounterKind, token: &str) -> String {
        format!("{}:flushing:{}", self.buffer(kind), token)
    }

    /// 刷盘栅栏：奇数表示有认领未结束，每次认领与结束各加一
    pub fn fence(&self, kind: CounterKind) -> String {
        format!("{}:fence", self.buffer(kind))
    }
}
