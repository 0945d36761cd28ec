pub mod behavior_history;
pub mod stat_analysis;

pub use behavior_history::BehaviorHistoryRepositoryImpl;
pub use stat_analysis::StatAnalysisRepositoryImpl;
