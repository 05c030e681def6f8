//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口：稳定标识、载荷版本、
//! 所属聚合与发生时间。事件一经构造即不可变。
//!
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;

/// 领域事件需要满足的通用能力边界
///
/// 对象安全：总线以 `Arc<dyn DomainEvent>` 承载异构事件，
/// 注册与分发一律以 `event_name` 为键，不依赖类型反射。
pub trait DomainEvent: fmt::Debug + Send + Sync + 'static {
    /// 事件稳定标识（注册与分发的键，不随重构变化）
    fn event_name(&self) -> &str;

    /// 事件载荷版本（正整数，用于 DTO 模式演进）
    fn event_version(&self) -> u32;

    /// 事件所属聚合 ID（作为传输层消息键，支持分区的传输以此保序）
    fn aggregate_id(&self) -> &str;

    /// 事件发生时间
    fn occurred_at(&self) -> DateTime<Utc>;

    /// 以 `Any` 暴露自身，供类型化映射器在编码时向下转型
    fn as_any(&self) -> &dyn Any;
}
