pub trait DomainEvent: Send + Sync {
    fn aggregate_id(&self) -> i64;
    fn version(&self) -> i64;
    /// 事件名，用于日志与路由
    fn name(&self) -> &'static str;
}
