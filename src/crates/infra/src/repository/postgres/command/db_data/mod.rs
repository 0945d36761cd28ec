pub mod comment;
pub mod comment_stat;
pub mod interaction;
pub mod user_behavior;
pub mod video_stat;
