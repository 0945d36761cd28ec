use crate::error::AppError;
use domain::counter::CounterKind;
use std::collections::HashMap;
use std::{fmt, str::FromStr};

/// 计数落库方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 写缓冲区，由定时任务批量合并
    Buffered,
    /// 请求内直接更新持久层
    Synchronous,
}

impl FromStr for WriteMode {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buffered" | "async" => Ok(WriteMode::Buffered),
            "synchronous" | "sync" | "direct" => Ok(WriteMode::Synchronous),
            other => Err(AppError::InvalidInput(format!("unknown write mode: {}", other))),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Buffered => write!(f, "buffered"),
            WriteMode::Synchronous => write!(f, "synchronous"),
        }
    }
}

/// 每种计数器的落库策略，正负增量使用同一策略
#[derive(Debug, Clone)]
pub struct CounterPolicy {
    modes: HashMap<CounterKind, WriteMode>,
    fallback: WriteMode,
}

impl Default for CounterPolicy {
    fn default() -> Self {
        Self {
            modes: HashMap::new(),
            fallback: WriteMode::Buffered,
        }
    }
}

impl CounterPolicy {
    pub fn with(mut self, kind: CounterKind, mode: WriteMode) -> Self {
        self.modes.insert(kind, mode);
        self
    }

    pub fn mode(&self, kind: CounterKind) -> WriteMode {
        self.modes.get(&kind).copied().unwrap_or(self.fallback)
    }

    /// 从配置的 kind -> mode 映射构建
    pub fn from_names(names: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut policy = Self::default();
        for (kind, mode) in names {
            let kind: CounterKind = kind
                .parse()
                .map_err(|e: domain::counter::CounterError| AppError::InvalidInput(e.to_string()))?;
            policy = policy.with(kind, mode.parse()?);
        }
        Ok(policy)
    }
}
