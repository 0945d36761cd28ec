use domain::counter::VideoStat;
use serde::Serialize;

/// 视频卡片所需的计数与当前用户状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoEngagement {
    pub video_id: i64,
    pub play_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub favorite_count: i64,
    /// 匿名访问时为 None
    pub liked: Option<bool>,
    pub favorited: Option<bool>,
}

impl VideoEngagement {
    pub fn new(stat: VideoStat, liked: Option<bool>, favorited: Option<bool>) -> Self {
        Self {
            video_id: stat.video_id,
            play_count: stat.play_count,
            like_count: stat.like_count,
            comment_count: stat.comment_count,
            share_count: stat.share_count,
            favorite_count: stat.favorite_count,
            liked,
            favorited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentEngagement {
    pub comment_id: i64,
    pub like_count: i64,
    pub liked: Option<bool>,
}
