use application::command::shared::IdGenerator;
use application::error::AppError;
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const NODE_ID_BITS: i64 = 10;
const SEQUENCE_BITS: i64 = 12;
const MAX_NODE_ID: i64 = (1 << NODE_ID_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: i64 = NODE_ID_BITS + SEQUENCE_BITS;
const NODE_ID_SHIFT: i64 = SEQUENCE_BITS;
const EPOCH: i64 = 1704067200000; // 2024-01-01 00:00:00 UTC

#[derive(Default)]
struct State {
    last_timestamp: i64,
    sequence: i64,
}

/// 雪花算法 ID 生成器，用于评论 ID
pub struct SnowflakeIdGenerator {
    node_id: i64,
    state: Mutex<State>,
}

impl SnowflakeIdGenerator {
    pub fn new(node_id: i64) -> Result<Self, AppError> {
        if !(0..=MAX_NODE_ID).contains(&node_id) {
            return Err(AppError::InvalidInput(format!(
                "node id must be within 0..={}",
                MAX_NODE_ID
            )));
        }
        Ok(Self {
            node_id,
            state: Mutex::new(State::default()),
        })
    }

    fn now_millis() -> Result<i64, AppError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .map_err(|e| AppError::UnknownError(format!("system clock error: {}", e)))
    }
}

#[async_trait]
impl IdGenerator for SnowflakeIdGenerator {
    async fn next_id(&self) -> Result<i64, AppError> {
        let mut state = self.state.lock().await;
        let mut timestamp = Self::now_millis()?;

        if timestamp < state.last_timestamp {
            return Err(AppError::UnknownError(
                "clock moved backwards, refusing to generate id".to_string(),
            ));
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & MAX_SEQUENCE;
            if state.sequence == 0 {
                // 本毫秒序列号用尽，等到下一毫秒
                while timestamp <= state.last_timestamp {
                    tokio::time::sleep(tokio::time::Duration::from_micros(100)).await;
                    timestamp = Self::now_millis()?;
                }
            }
        } else {
            state.sequence = 0;
        }

        state.last_timestamp = timestamp;
        Ok(((timestamp - EPOCH) << TIMESTAMP_SHIFT)
            | (self.node_id << NODE_ID_SHIFT)
            | state.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let generator = SnowflakeIdGenerator::new(3).unwrap();
        let mut ids = HashSet::new();
        let mut last = 0;
        for _ in 0..5000 {
            let id = generator.next_id().await.unwrap();
            assert!(id > last, "ID 未递增: {} <= {}", id, last);
            assert!(ids.insert(id), "ID 重复: {}", id);
            last = id;
        }
    }

    #[test]
    fn test_node_id_range() {
        assert!(SnowflakeIdGenerator::new(MAX_NODE_ID + 1).is_err());
        assert!(SnowflakeIdGenerator::new(-1).is_err());
        assert!(SnowflakeIdGenerator::new(0).is_ok());
    }
}
