//! 事件总线编排器（EventBus）
//!
//! 组合消息代理与三个注册表（主题、映射、处理器），
//! 向应用暴露 publish/subscribe 与生命周期协议。
//!
//! 状态机：`Constructed -> SetUp -> Started -> ShutDown`（终态）。
//! - `publish` 仅在 `SetUp`/`Started` 有效，之外返回 `NotReady`；
//! - `shutdown` 在任何状态均可安全调用，重复调用为空操作；
//! - 同一主题无论注册多少处理器，只向代理接通一次原始订阅，
//!   入站投递经内部适配器完成 解码 -> 分发。
//!
use crate::broker::{MessageBroker, RawMessageHandler};
use crate::broker_factory::BrokerFactory;
use crate::config::MessagingConfig;
use crate::dispatcher::HandlerDispatcher;
use crate::error::{MessagingError, MessagingResult};
use crate::mapper_registry::MapperRegistry;
use crate::message::{
    HEADER_EVENT_NAME, HEADER_EVENT_VERSION, HEADER_OCCURRED_AT, InboundMessage, Message,
};
use crate::topic_resolver::TopicResolver;
use omnibus_domain::domain_event::DomainEvent;
use omnibus_domain::error::EventError;
use omnibus_domain::handler::EventHandler;
use omnibus_domain::mapper::DomainEventMapper;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

/// 总线生命周期状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    SetUp,
    Started,
    ShutDown,
}

impl LifecycleState {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::Constructed => "Constructed",
            LifecycleState::SetUp => "SetUp",
            LifecycleState::Started => "Started",
            LifecycleState::ShutDown => "ShutDown",
        }
    }
}

/// 事件总线：应用侧唯一交互入口
///
/// 协作者经构造器显式注入；总线独占代理实例，
/// 注册表在 setup 阶段单写填充，稳态只读。
pub struct EventBus {
    broker: Arc<dyn MessageBroker>,
    topics: Arc<TopicResolver>,
    mappers: Arc<MapperRegistry>,
    dispatcher: Arc<HandlerDispatcher>,
    state: RwLock<LifecycleState>,
    // 已接通代理订阅的主题（保证每主题至多一次原始订阅）
    subscribed: Mutex<HashSet<String>>,
}

impl EventBus {
    /// 以已构造的协作者组装总线
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        topics: Arc<TopicResolver>,
        mappers: Arc<MapperRegistry>,
        dispatcher: Arc<HandlerDispatcher>,
    ) -> Self {
        Self {
            broker,
            topics,
            mappers,
            dispatcher,
            state: RwLock::new(LifecycleState::Constructed),
            subscribed: Mutex::new(HashSet::new()),
        }
    }

    /// 经工厂按传输标识组装全新总线（注册表为空，待 setup 阶段填充）
    pub fn with_transport(factory: &BrokerFactory, transport: &str) -> MessagingResult<Self> {
        let broker = factory.create(transport)?;
        Ok(Self::new(
            broker,
            Arc::new(TopicResolver::new()),
            Arc::new(MapperRegistry::new()),
            Arc::new(HandlerDispatcher::new()),
        ))
    }

    /// 按配置选择传输并组装总线
    pub fn from_config(config: &MessagingConfig, factory: &BrokerFactory) -> MessagingResult<Self> {
        Self::with_transport(factory, &config.transport)
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().expect("lifecycle state lock poisoned")
    }

    fn require(&self, operation: &'static str, allowed: &[LifecycleState]) -> MessagingResult<()> {
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

    fn set_state(&self, next: LifecycleState) {
        *self.state.write().expect("lifecycle state lock poisoned") = next;
    }

    // ---- setup 阶段的注册入口 ----

    /// 绑定事件类型与主题；拒绝静默重绑定
    pub fn bind_topic(&self, topic: &str, event_name: &str) -> MessagingResult<()> {
        self.topics.register(topic, event_name)
    }

    /// 解除事件类型的主题绑定
    pub fn unbind_topic(&self, event_name: &str) {
        self.topics.unregister(event_name);
    }

    /// 注册事件类型的映射器
    pub fn register_mapper<E, M>(&self, event_name: &str, mapper: Arc<M>)
    where
        E: DomainEvent,
        M: DomainEventMapper<E> + 'static,
    {
        self.mappers.register::<E, M>(event_name, mapper);
    }

    // ---- 生命周期 ----

    /// 建立代理连接；`Constructed -> SetUp`，幂等
    pub async fn setup(&self) -> MessagingResult<()> {
        self.require(
            "setup",
            &[LifecycleState::Constructed, LifecycleState::SetUp],
        )?;
        self.broker.setup().await?;
        self.set_state(LifecycleState::SetUp);
        debug!("event bus set up");
        Ok(())
    }

    /// 开始投递；`SetUp -> Started`，此后入站订阅转为活跃
    pub async fn start(&self) -> MessagingResult<()> {
        self.require("start", &[LifecycleState::SetUp, LifecycleState::Started])?;
        self.broker.start().await?;
        self.set_state(LifecycleState::Started);
        debug!("event bus started");
        Ok(())
    }

    /// 释放资源；任意状态 -> `ShutDown`（终态），重复调用为空操作
    pub async fn shutdown(&self) -> MessagingResult<()> {
        {
            let mut state = self.state.write().expect("lifecycle state lock poisoned");
            if *state == LifecycleState::ShutDown {
                return Ok(());
            }
            *state = LifecycleState::ShutDown;
        }
        self.broker.shutdown().await?;
        debug!("event bus shut down");
        Ok(())
    }

    // ---- 发布 ----

    /// 发布一条领域事件
    pub async fn publish(&self, event: &Arc<dyn DomainEvent>) -> MessagingResult<()> {
        self.require("publish", &[LifecycleState::SetUp, LifecycleState::Started])?;
        self.publish_unchecked(event).await
    }

    /// 依序发布一批事件；各事件独立处理，单条失败即返回，
    /// 已发出的事件不回滚。重试策略由调用方负责
    pub async fn publish_batch(&self, events: &[Arc<dyn DomainEvent>]) -> MessagingResult<()> {
        self.require("publish", &[LifecycleState::SetUp, LifecycleState::Started])?;
        for event in events {
            self.publish_unchecked(event).await?;
        }
        Ok(())
    }

    async fn publish_unchecked(&self, event: &Arc<dyn DomainEvent>) -> MessagingResult<()> {
        let event_name = event.event_name();
        let topic = self.topics.topic_for(event_name)?;
        let Some(mapper) = self.mappers.get(event_name) else {
            return Err(MessagingError::UnmappedEvent {
                event_name: event_name.to_string(),
            });
        };

        let dto = mapper.to_dto(event.as_ref())?;
        let value = serde_json::to_vec(&dto).map_err(EventError::from)?;

        let mut headers = HashMap::new();
        headers.insert(HEADER_EVENT_NAME.to_string(), event_name.to_string());
        headers.insert(
            HEADER_EVENT_VERSION.to_string(),
            event.event_version().to_string(),
        );
        headers.insert(
            HEADER_OCCURRED_AT.to_string(),
            event.occurred_at().to_rfc3339(),
        );

        let message = Message::builder()
            .key(event.aggregate_id().to_string())
            .value(value)
            .headers(headers)
            .build();

        self.broker.produce(&topic, message).await
    }

    // ---- 订阅 ----

    /// 订阅事件：注册处理器并（首次）为其主题接通代理订阅
    pub async fn subscribe(
        &self,
        event_name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> MessagingResult<()> {
        self.require(
            "subscribe",
            &[LifecycleState::SetUp, LifecycleState::Started],
        )?;
        let topic = self.topics.topic_for(event_name)?;
        self.dispatcher.register(event_name, handler);

        let first = {
            let mut subscribed = self.subscribed.lock().expect("subscribed set lock poisoned");
            subscribed.insert(topic.clone())
        };
        if first {
            let raw = self.delivery_adapter();
            if let Err(err) = self.broker.subscribe(&topic, raw).await {
                self.subscribed
                    .lock()
                    .expect("subscribed set lock poisoned")
                    .remove(&topic);
                return Err(err);
            }
        }
        Ok(())
    }

    /// 按处理器自声明的事件集合订阅
    pub async fn subscribe_declared(&self, handler: Arc<dyn EventHandler>) -> MessagingResult<()> {
        for name in handler.handled_events().names() {
            self.subscribe(&name, handler.clone()).await?;
        }
        Ok(())
    }

    /// 入站投递适配器：解码 -> 分发；逐条隔离解码失败
    fn delivery_adapter(&self) -> RawMessageHandler {
        let topics = self.topics.clone();
        let mappers = self.mappers.clone();
        let dispatcher = self.dispatcher.clone();

        Arc::new(move |inbound: InboundMessage| {
            let topics = topics.clone();
            let mappers = mappers.clone();
            let dispatcher = dispatcher.clone();

            Box::pin(async move {
                let InboundMessage { topic, message } = inbound;
                if message.value().is_empty() {
                    warn!(topic = %topic, "empty message value; skipped");
                    return;
                }
                match decode_inbound(&topics, &mappers, &topic, &message) {
                    Ok(event) => dispatcher.dispatch(event).await,
                    Err(err) => {
                        warn!(
                            topic = %topic,
                            error = %err,
                            payload = %String::from_utf8_lossy(message.value()),
                            "failed to decode inbound message; skipped"
                        );
                    }
                }
            })
        })
    }
}

fn decode_inbound(
    topics: &TopicResolver,
    mappers: &MapperRegistry,
    topic: &str,
    message: &Message,
) -> MessagingResult<Arc<dyn DomainEvent>> {
    let event_name = topics.event_for(topic)?;
    let Some(mapper) = mappers.get(&event_name) else {
        return Err(MessagingError::UnmappedEvent { event_name });
    };
    let dto: Value =
        serde_json::from_slice(message.value()).map_err(|e| MessagingError::Decode {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;
    mapper.to_domain(&dto).map_err(|e| MessagingError::Decode {
        topic: topic.to_string(),
        reason: e.to_string(),
    })
}
