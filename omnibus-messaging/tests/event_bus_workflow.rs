use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use omnibus_domain::domain_event::DomainEvent;
use omnibus_domain::handler::{EventHandler, HandledEvents};
use omnibus_domain::mapper::JsonEventMapper;
use omnibus_messaging::{
    BrokerFactory, EventBus, HandlerDispatcher, InMemoryBroker, MapperRegistry, Message,
    MessageBroker, MessagingError, TRANSPORT_INMEMORY, TopicResolver,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct OrderPlaced {
    order_id: String,
    total: u64,
    occurred_at: DateTime<Utc>,
}

impl OrderPlaced {
    const NAME: &'static str = "OrderPlaced";
    const TOPIC: &'static str = "OrderPlaced";

    fn new(order_id: &str, total: u64) -> Arc<dyn DomainEvent> {
        Arc::new(Self {
            order_id: order_id.into(),
            total,
            occurred_at: Utc::now(),
        })
    }
}

impl DomainEvent for OrderPlaced {
    fn event_name(&self) -> &str {
        Self::NAME
    }
    fn event_version(&self) -> u32 {
        1
    }
    fn aggregate_id(&self) -> &str {
        &self.order_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone)]
struct Recorder {
    name: &'static str,
    seen: Arc<Mutex<Vec<(String, u64)>>>,
}

impl Recorder {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn seen(&self) -> Vec<(String, u64)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for Recorder {
    fn handler_name(&self) -> &str {
        self.name
    }

    fn handled_events(&self) -> HandledEvents {
        HandledEvents::One(OrderPlaced::NAME.into())
    }

    async fn handle(&self, event: Arc<dyn DomainEvent>) -> AnyResult<()> {
        let order = event
            .as_any()
            .downcast_ref::<OrderPlaced>()
            .expect("OrderPlaced");
        self.seen
            .lock()
            .unwrap()
            .push((order.order_id.clone(), order.total));
        Ok(())
    }
}

#[derive(Clone)]
struct AlwaysFailing;

#[async_trait]
impl EventHandler for AlwaysFailing {
    fn handler_name(&self) -> &str {
        "always_failing"
    }

    fn handled_events(&self) -> HandledEvents {
        HandledEvents::One(OrderPlaced::NAME.into())
    }

    async fn handle(&self, _event: Arc<dyn DomainEvent>) -> AnyResult<()> {
        anyhow::bail!("boom")
    }
}

fn inmemory_bus() -> AnyResult<EventBus> {
    let factory = BrokerFactory::with_defaults();
    let bus = EventBus::with_transport(&factory, TRANSPORT_INMEMORY)?;
    bus.bind_topic(OrderPlaced::TOPIC, OrderPlaced::NAME)?;
    bus.register_mapper(
        OrderPlaced::NAME,
        Arc::new(JsonEventMapper::<OrderPlaced>::new()),
    );
    Ok(bus)
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_publish_reaches_handler_in_same_dispatch_cycle() -> AnyResult<()> {
    let bus = inmemory_bus()?;
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    bus.subscribe(OrderPlaced::NAME, Arc::new(recorder.clone()))
        .await?;
    bus.start().await?;

    bus.publish(&OrderPlaced::new("o1", 42)).await?;

    // 进程内传输就地投递：publish 返回即已分发完成
    assert_eq!(recorder.seen(), vec![("o1".to_string(), 42)]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn inprocess_delivery_preserves_publish_order() -> AnyResult<()> {
    let bus = inmemory_bus()?;
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    bus.subscribe(OrderPlaced::NAME, Arc::new(recorder.clone()))
        .await?;
    bus.start().await?;

    bus.publish_batch(&[
        OrderPlaced::new("o1", 1),
        OrderPlaced::new("o2", 2),
        OrderPlaced::new("o3", 3),
    ])
    .await?;

    let ids: Vec<String> = recorder.seen().into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["o1", "o2", "o3"]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_handler_does_not_shadow_the_working_one() -> AnyResult<()> {
    let bus = inmemory_bus()?;
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    // 故障处理器先注册，验证后续处理器仍被调用
    bus.subscribe(OrderPlaced::NAME, Arc::new(AlwaysFailing))
        .await?;
    bus.subscribe(OrderPlaced::NAME, Arc::new(recorder.clone()))
        .await?;
    bus.start().await?;

    bus.publish(&OrderPlaced::new("o1", 42)).await?;

    assert_eq!(recorder.seen(), vec![("o1".to_string(), 42)]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn publish_in_setup_state_is_delivered_on_start() -> AnyResult<()> {
    let bus = inmemory_bus()?;
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    bus.subscribe(OrderPlaced::NAME, Arc::new(recorder.clone()))
        .await?;

    // SetUp 阶段允许发布；进程内传输缓冲到 start 时冲刷
    bus.publish(&OrderPlaced::new("o1", 42)).await?;
    assert!(recorder.seen().is_empty());

    bus.start().await?;
    assert_eq!(recorder.seen(), vec![("o1".to_string(), 42)]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn subscribe_via_declared_events() -> AnyResult<()> {
    let bus = inmemory_bus()?;
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    bus.subscribe_declared(Arc::new(recorder.clone())).await?;
    bus.start().await?;

    bus.publish(&OrderPlaced::new("o9", 7)).await?;

    assert_eq!(recorder.seen(), vec![("o9".to_string(), 7)]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_inbound_payload_does_not_stop_the_topic() -> AnyResult<()> {
    let broker = Arc::new(InMemoryBroker::new());
    let bus = EventBus::new(
        broker.clone(),
        Arc::new(TopicResolver::new()),
        Arc::new(MapperRegistry::new()),
        Arc::new(HandlerDispatcher::new()),
    );
    bus.bind_topic(OrderPlaced::TOPIC, OrderPlaced::NAME)?;
    bus.register_mapper(
        OrderPlaced::NAME,
        Arc::new(JsonEventMapper::<OrderPlaced>::new()),
    );
    let recorder = Recorder::new("recorder");
    bus.setup().await?;
    bus.subscribe(OrderPlaced::NAME, Arc::new(recorder.clone()))
        .await?;
    bus.start().await?;

    // 直接经代理注入坏负载，模拟入站脏数据
    let bad = Message::builder()
        .maybe_key(None)
        .value(b"not json".to_vec())
        .build();
    broker.produce(OrderPlaced::TOPIC, bad).await?;

    // 坏消息被逐条隔离，后续消息照常投递
    bus.publish(&OrderPlaced::new("o1", 42)).await?;
    assert_eq!(recorder.seen(), vec![("o1".to_string(), 42)]);

    bus.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn lifecycle_errors_surface_to_the_caller() -> AnyResult<()> {
    let factory = BrokerFactory::with_defaults();

    assert!(matches!(
        EventBus::with_transport(&factory, "nosuch"),
        Err(MessagingError::UnsupportedTransport { .. })
    ));

    let bus = inmemory_bus()?;
    assert!(matches!(
        bus.publish(&OrderPlaced::new("o1", 42)).await,
        Err(MessagingError::NotReady { .. })
    ));

    // 未曾 setup/start 也可安全关闭，二次关闭为空操作
    bus.shutdown().await?;
    bus.shutdown().await?;
    Ok(())
}
