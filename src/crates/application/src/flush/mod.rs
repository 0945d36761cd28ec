pub mod reconcile;
pub mod scheduler;

pub use reconcile::Reconciler;
pub use scheduler::{BufferFlushScheduler, FlushReport};
