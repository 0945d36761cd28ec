pub mod behavior;
pub mod counter_writer;
pub mod policy;
pub mod shared;
pub mod video;
