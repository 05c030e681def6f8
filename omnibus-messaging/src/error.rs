//! 消息层统一错误定义
//!
//! 生命周期与配置类错误（连接、未注册、状态不符）向调用方传播；
//! 消费路径的逐条错误（解码、处理器失败）在分发边界被捕获并记录，
//! 不得中断投递循环。
//!
use omnibus_domain::error::EventError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum MessagingError {
    #[error("event: {0}")]
    Event(#[from] EventError),

    #[error("connection error: {reason}")]
    Connection { reason: String },

    #[error("unsupported transport: {transport}")]
    UnsupportedTransport { transport: String },

    #[error("no topic binding registered for: {key}")]
    UnregisteredEvent { key: String },

    #[error("no mapper registered for event: {event_name}")]
    UnmappedEvent { event_name: String },

    #[error("topic already bound: topic={topic}, event={event_name}")]
    AlreadyBound { event_name: String, topic: String },

    #[error("decode failed on topic {topic}: {reason}")]
    Decode { topic: String, reason: String },

    #[error("publish failed on topic {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("operation not allowed: {operation} in state {state}")]
    NotReady {
        operation: &'static str,
        state: &'static str,
    },
}

/// 统一 Result 类型别名
pub type MessagingResult<T> = Result<T, MessagingError>;
