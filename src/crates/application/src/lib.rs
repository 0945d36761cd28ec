pub mod behavior_log;
pub mod cache;
pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod flush;
pub mod query;
pub mod store;
