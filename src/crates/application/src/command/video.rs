use crate::error::AppError;
use crate::store::SnapshotLoader;
use domain::counter::{StatRepository, TargetScope};
use domain::value::VideoId;
use log::{info, warn};
use std::sync::Arc;

/// 视频发布时建立计数行并预热缓存
pub struct VideoStatService {
    stats: Arc<dyn StatRepository>,
    loader: SnapshotLoader,
}

impl VideoStatService {
    pub fn new(stats: Arc<dyn StatRepository>, loader: SnapshotLoader) -> Self {
        Self { stats, loader }
    }

    pub async fn register_video(&self, video_id: VideoId) -> Result<(), AppError> {
        let id = video_id.as_i64();
        self.stats.create(TargetScope::Video, id).await?;
        // 重复登记时行已存在，按已有计数预热；预热失败不影响发布
        match self.loader.load(TargetScope::Video, id).await {
            Ok(_) => info!("registered video {}", id),
            Err(e) => warn!("registered video {} without cache prewarm: {}", id, e),
        }
        Ok(())
    }
}
