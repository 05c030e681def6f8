//! 事件总线领域抽象（omnibus-domain）
//!
//! 提供应用侧发布/消费领域事件所需的最小抽象：
//! - 领域事件（`domain_event`）：对象安全的事件能力边界
//! - 事件映射器（`mapper`）：领域事件与线上表示之间的纯函数转换对
//! - 事件处理器（`handler`）：消费某类/多类事件的处理逻辑与元信息
//!
//! 本 crate 不涉及任何传输细节；主题解析、代理协议与编排
//! 由 `omnibus-messaging` 提供，以便在不同传输之上复用同一套领域抽象。
//!
pub mod domain_event;
pub mod error;
pub mod handler;
pub mod mapper;

pub use domain_event::DomainEvent;
pub use error::{EventError, EventResult};
pub use handler::{EventHandler, HandledEvents};
pub use mapper::{DomainEventMapper, JsonEventMapper};
