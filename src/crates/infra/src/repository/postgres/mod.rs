pub mod command;
pub mod query;

pub use command::{
    BehaviorLogRepositoryImpl, CommentRepositoryImpl, InteractionRepositoryImpl,
    StatRepositoryImpl,
};
pub use query::{BehaviorHistoryRepositoryImpl, StatAnalysisRepositoryImpl};
