//! 进程内消息代理（InMemoryBroker）
//!
//! 面向测试、示例与单进程部署的轻量传输，满足 `MessageBroker` 协议：
//! - `produce`：按主题查找处理器并就地逐个 await，单主题严格 FIFO；
//! - `setup` 与 `start` 之间生产的消息先入缓冲，`start` 时按序冲刷；
//! - 无订阅者的主题：记录告警后丢弃（至多一次语义）。
//!
use crate::broker::{MessageBroker, RawMessageHandler};
use crate::error::{MessagingError, MessagingResult};
use crate::message::{InboundMessage, Message};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BrokerState {
    Constructed,
    SetUp,
    Started,
    ShutDown,
}

impl BrokerState {
    fn name(self) -> &'static str {
        match self {
            BrokerState::Constructed => "Constructed",
            BrokerState::SetUp => "SetUp",
            BrokerState::Started => "Started",
            BrokerState::ShutDown => "ShutDown",
        }
    }
}

/// 进程内消息代理
pub struct InMemoryBroker {
    state: Mutex<BrokerState>,
    subscriptions: DashMap<String, Vec<RawMessageHandler>>,
    // start 之前生产的消息，按生产顺序缓冲
    pending: Mutex<Vec<(String, Message)>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState::Constructed),
            subscriptions: DashMap::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn state(&self) -> BrokerState {
        *self.state.lock().expect("broker state lock poisoned")
    }

    fn require(&self, operation: &'static str, allowed: &[BrokerState]) -> MessagingResult<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(MessagingError::NotReady {
                operation,
                state: state.name(),
            })
        }
    }

    async fn deliver(&self, topic: &str, message: Message) {
        // 先将处理器列表克隆出临界区，避免跨 await 持有分片锁
        let handlers: Vec<RawMessageHandler> = self
            .subscriptions
            .get(topic)
            .map(|h| h.clone())
            .unwrap_or_default();

        if handlers.is_empty() {
            warn!(topic, "no subscribers for topic; message dropped");
            return;
        }

        for handler in handlers {
            let inbound = InboundMessage {
                topic: topic.to_string(),
                message: message.clone(),
            };
            handler(inbound).await;
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn setup(&self) -> MessagingResult<()> {
        let mut state = self.state.lock().expect("broker state lock poisoned");
        match *state {
            BrokerState::Constructed | BrokerState::SetUp => {
                *state = BrokerState::SetUp;
                Ok(())
            }
            BrokerState::Started => Ok(()),
            BrokerState::ShutDown => Err(MessagingError::NotReady {
                operation: "setup",
                state: BrokerState::ShutDown.name(),
            }),
        }
    }

    async fn start(&self) -> MessagingResult<()> {
        {
            let mut state = self.state.lock().expect("broker state lock poisoned");
            match *state {
                BrokerState::SetUp | BrokerState::Started => *state = BrokerState::Started,
                other => {
                    return Err(MessagingError::NotReady {
                        operation: "start",
                        state: other.name(),
                    });
                }
            }
        }

        // 冲刷 start 之前缓冲的消息，保持生产顺序
        let pending = std::mem::take(&mut *self.pending.lock().expect("pending lock poisoned"));
        for (topic, message) in pending {
            self.deliver(&topic, message).await;
        }
        debug!("in-memory broker started");
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: RawMessageHandler) -> MessagingResult<()> {
        self.require("subscribe", &[BrokerState::SetUp, BrokerState::Started])?;
        self.subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        debug!(topic, "subscription registered");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> MessagingResult<()> {
        self.require("unsubscribe", &[BrokerState::SetUp, BrokerState::Started])?;
        self.subscriptions.remove(topic);
        debug!(topic, "subscription removed");
        Ok(())
    }

    async fn produce(&self, topic: &str, message: Message) -> MessagingResult<()> {
        self.require("produce", &[BrokerState::SetUp, BrokerState::Started])?;

        if self.state() == BrokerState::SetUp {
            self.pending
                .lock()
                .expect("pending lock poisoned")
                .push((topic.to_string(), message));
            return Ok(());
        }

        self.deliver(topic, message).await;
        Ok(())
    }

    async fn shutdown(&self) -> MessagingResult<()> {
        {
            let mut state = self.state.lock().expect("broker state lock poisoned");
            if *state == BrokerState::ShutDown {
                // 二次关闭为空操作
                return Ok(());
            }
            *state = BrokerState::ShutDown;
        }
        self.subscriptions.clear();
        self.pending.lock().expect("pending lock poisoned").clear();
        debug!("in-memory broker shut down");
        Ok(())
    }
}
