pub mod analysis;
pub mod history;
pub mod hydration;
pub mod relation;

pub use analysis::AnalysisQuery;
pub use history::HistoryQuery;
pub use hydration::ReadHydration;
pub use relation::RelationQuery;
