//! 消息代理（MessageBroker）协议
//!
//! 每种传输（进程内、日志型中间件、实时通道）都实现的统一能力边界。
//! 构造本身不做 I/O；连接建立在 `setup` 中进行。
//! `setup` 完成之前，任何主题都不得被生产或订阅。
//!
use crate::error::MessagingResult;
use crate::message::{InboundMessage, Message};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// 入站消息处理的装箱 Future
pub type RawHandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// 原始消息处理器：订阅主题时注册，由传输在其投递任务上调用
pub type RawMessageHandler = Arc<dyn Fn(InboundMessage) -> RawHandlerFuture + Send + Sync>;

/// 消息代理：物理搬运消息的传输组件
///
/// 投递语义（至少一次/至多一次）与单主题保序程度由具体传输决定，
/// 本层不增强也不削弱。
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// 建立连接与资源；幂等。传输不可达时返回 `Connection` 错误
    async fn setup(&self) -> MessagingResult<()>;

    /// 开始向已注册订阅投递消息
    async fn start(&self) -> MessagingResult<()>;

    /// 为主题注册原始处理器；对不同主题可多次调用。
    /// `start` 之后再订阅由实现决定，但不得破坏既有订阅
    async fn subscribe(&self, topic: &str, handler: RawMessageHandler) -> MessagingResult<()>;

    /// 停止向主题投递；在途投递可以完成
    async fn unsubscribe(&self, topic: &str) -> MessagingResult<()>;

    /// 发送消息；传输拒绝时返回 `Publish` 错误，不允许静默丢弃
    async fn produce(&self, topic: &str, message: Message) -> MessagingResult<()>;

    /// 释放全部资源；此后任何其他操作返回 `NotReady`
    async fn shutdown(&self) -> MessagingResult<()>;
}
