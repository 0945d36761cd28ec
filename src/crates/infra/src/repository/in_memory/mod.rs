pub mod behavior_log;
pub mod comment;
pub mod interaction;
pub mod stat;

pub use behavior_log::InMemoryBehaviorLogRepository;
pub use comment::InMemoryCommentRepository;
pub use interaction::InMemoryInteractionRepository;
pub use stat::InMemoryStatRepository;
