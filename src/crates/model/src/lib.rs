pub mod analysis;
pub mod behavior_history;
pub mod engagement;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Query error: {0}")]
    QueryError(String),
    #[error("Database error: {0}")]
    DbErr(String),
}
