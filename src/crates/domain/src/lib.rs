pub mod behavior;
pub mod comment;
pub mod counter;
pub mod event;
pub mod interaction;
pub mod value;
