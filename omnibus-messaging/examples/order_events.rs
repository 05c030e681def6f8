/// 事件总线（进程内传输）示例
/// 展示 绑定主题 -> 注册映射器 -> 订阅 -> setup/start -> publish 的完整闭环，
/// 以及单个处理器失败时其余处理器不受影响
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use omnibus_domain::domain_event::DomainEvent;
use omnibus_domain::handler::{EventHandler, HandledEvents};
use omnibus_domain::mapper::JsonEventMapper;
use omnibus_messaging::{BrokerFactory, EventBus, MessagingConfig};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

// ============================================================================
// 领域事件
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct OrderPlaced {
    order_id: String,
    total: u64,
    occurred_at: DateTime<Utc>,
}

impl OrderPlaced {
    const NAME: &'static str = "OrderPlaced";

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

// ============================================================================
// 示例处理器
// ============================================================================

struct PrintHandler {
    name: &'static str,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl EventHandler for PrintHandler {
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
        if let Some(bad) = self.fail_on
            && order.order_id == bad
        {
            anyhow::bail!("{} failed on {}", self.name, bad);
        }
        println!(
            "handler={} order={} total={} occurred_at={}",
            self.name, order.order_id, order.total, order.occurred_at
        );
        Ok(())
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt::init();

    println!("=== 事件总线（进程内传输）示例 ===\n");

    // 传输来自配置（默认 inmemory），未知标识在此处立即失败
    let config = MessagingConfig::from_env()?;
    let factory = BrokerFactory::with_defaults();
    let bus = EventBus::from_config(&config, &factory)?;

    // setup 阶段：绑定主题、注册映射器与处理器
    bus.bind_topic("orders.placed", OrderPlaced::NAME)?;
    bus.register_mapper(
        OrderPlaced::NAME,
        Arc::new(JsonEventMapper::<OrderPlaced>::new()),
    );

    bus.setup().await?;
    bus.subscribe(
        OrderPlaced::NAME,
        Arc::new(PrintHandler {
            name: "printer",
            fail_on: None,
        }),
    )
    .await?;
    bus.subscribe(
        OrderPlaced::NAME,
        Arc::new(PrintHandler {
            name: "sometimes_fail",
            fail_on: Some("o2"),
        }),
    )
    .await?;
    bus.start().await?;
    println!("✅ 总线已启动（transport={}）", config.transport);

    // o2 会让 sometimes_fail 失败，printer 不受影响
    bus.publish_batch(&[
        OrderPlaced::new("o1", 42),
        OrderPlaced::new("o2", 7),
        OrderPlaced::new("o3", 99),
    ])
    .await?;

    bus.shutdown().await?;
    println!("\n✅ 优雅关闭完成");
    Ok(())
}
