pub mod behavior_log;
pub mod comment;
pub mod db_data;
pub mod interaction;
pub mod stat;

pub use behavior_log::BehaviorLogRepositoryImpl;
pub use comment::CommentRepositoryImpl;
pub use interaction::InteractionRepositoryImpl;
pub use stat::StatRepositoryImpl;
