pub mod on_interaction_recorded;
pub mod registry;

pub use registry::register_handlers;
