//! 主题解析器（TopicResolver）
//!
//! 维护事件类型与主题名的一一对应关系，双向查找：
//! 发布路径按事件取主题，消费路径按入站主题还原事件类型。
//! 拒绝静默重绑定：变更绑定必须先显式解除（绑定同一对为幂等）。
//!
use crate::error::{MessagingError, MessagingResult};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Bindings {
    topic_by_event: HashMap<String, String>,
    event_by_topic: HashMap<String, String>,
}

/// 事件类型 <-> 主题 双向注册表
///
/// 两个方向在同一把锁下更新，注册表始终保持双射。
#[derive(Default)]
pub struct TopicResolver {
    inner: RwLock<Bindings>,
}

impl TopicResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 绑定事件类型到主题
    pub fn register(&self, topic: &str, event_name: &str) -> MessagingResult<()> {
        let mut inner = self.inner.write().expect("topic bindings lock poisoned");

        if let Some(existing) = inner.topic_by_event.get(event_name) {
            if existing == topic {
                return Ok(());
            }
            return Err(MessagingError::AlreadyBound {
                event_name: event_name.to_string(),
                topic: existing.clone(),
            });
        }
        if let Some(existing_event) = inner.event_by_topic.get(topic) {
            return Err(MessagingError::AlreadyBound {
                event_name: existing_event.clone(),
                topic: topic.to_string(),
            });
        }

        inner
            .topic_by_event
            .insert(event_name.to_string(), topic.to_string());
        inner
            .event_by_topic
            .insert(topic.to_string(), event_name.to_string());
        Ok(())
    }

    /// 解除事件类型的绑定（双向移除）；未绑定时为空操作
    pub fn unregister(&self, event_name: &str) {
        let mut inner = self.inner.write().expect("topic bindings lock poisoned");
        if let Some(topic) = inner.topic_by_event.remove(event_name) {
            inner.event_by_topic.remove(&topic);
        }
    }

    /// 事件类型对应的主题
    pub fn topic_for(&self, event_name: &str) -> MessagingResult<String> {
        self.inner
            .read()
            .expect("topic bindings lock poisoned")
            .topic_by_event
            .get(event_name)
            .cloned()
            .ok_or_else(|| MessagingError::UnregisteredEvent {
                key: event_name.to_string(),
            })
    }

    /// 主题对应的事件类型（入站解码用的反向查找）
    pub fn event_for(&self, topic: &str) -> MessagingResult<String> {
        self.inner
            .read()
            .expect("topic bindings lock poisoned")
            .event_by_topic
            .get(topic)
            .cloned()
            .ok_or_else(|| MessagingError::UnregisteredEvent {
                key: topic.to_string(),
            })
    }
}
