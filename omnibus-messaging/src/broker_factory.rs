//! 代理工厂（BrokerFactory）
//!
//! 传输标识 -> 零参构造闭包 的注册表，启动期解析承载总线的传输。
//! 未注册的标识在创建时立即失败，而不是等到首次使用；
//! 构造本身不做 I/O，连接建立推迟到代理的 `setup`。
//!
use crate::broker::MessageBroker;
use crate::broker_inmemory::InMemoryBroker;
use crate::error::{MessagingError, MessagingResult};
use dashmap::DashMap;
use std::sync::Arc;

/// 进程内传输的标识
pub const TRANSPORT_INMEMORY: &str = "inmemory";

type BrokerCtor = Arc<dyn Fn() -> Arc<dyn MessageBroker> + Send + Sync>;

/// 传输标识 -> 代理构造器
#[derive(Default)]
pub struct BrokerFactory {
    ctors: DashMap<String, BrokerCtor>,
}

impl BrokerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预注册内置传输（`inmemory`）
    pub fn with_defaults() -> Self {
        let factory = Self::new();
        factory.register(TRANSPORT_INMEMORY, || Arc::new(InMemoryBroker::new()));
        factory
    }

    /// 注册传输构造器；同名注册以后者为准
    pub fn register<F>(&self, transport: impl Into<String>, ctor: F)
    where
        F: Fn() -> Arc<dyn MessageBroker> + Send + Sync + 'static,
    {
        self.ctors.insert(transport.into(), Arc::new(ctor));
    }

    /// 按标识构造代理；未注册的标识立即失败
    pub fn create(&self, transport: &str) -> MessagingResult<Arc<dyn MessageBroker>> {
        let Some(ctor) = self.ctors.get(transport).map(|c| c.clone()) else {
            return Err(MessagingError::UnsupportedTransport {
                transport: transport.to_string(),
            });
        };
        Ok(ctor())
    }
}
