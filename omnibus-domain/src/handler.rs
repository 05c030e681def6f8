//! 事件处理器（EventHandler）
//!
//! 定义消费某类/多类事件的处理逻辑与元信息（名称、声明的事件集合）。
//!
use crate::domain_event::DomainEvent;
use async_trait::async_trait;
use std::sync::Arc;

/// 处理器声明消费的事件类型集合
#[derive(Clone, Debug)]
pub enum HandledEvents {
    One(String),
    Many(Vec<String>),
}

impl HandledEvents {
    /// 展开为事件名列表
    pub fn names(&self) -> Vec<String> {
        match self {
            HandledEvents::One(name) => vec![name.clone()],
            HandledEvents::Many(names) => names.clone(),
        }
    }

    /// 声明集合是否包含某事件名
    pub fn contains(&self, event_name: &str) -> bool {
        match self {
            HandledEvents::One(name) => name == event_name,
            HandledEvents::Many(names) => names.iter().any(|n| n == event_name),
        }
    }
}

/// 事件处理器：处理某一类型的事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于失败日志与审计）
    fn handler_name(&self) -> &str;

    /// 返回该处理器声明支持的事件类型
    fn handled_events(&self) -> HandledEvents;

    /// 处理事件
    async fn handle(&self, event: Arc<dyn DomainEvent>) -> anyhow::Result<()>;
}
