//! 领域侧统一错误定义
//!
//! 聚焦事件编解码与处理器执行的最小必要集合，
//! 便于消息层统一包装为自身的错误类型。
//!
use thiserror::Error;

/// 统一错误类型（领域抽象最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
    #[error("mapper error: event={event_name}, reason={reason}")]
    Mapper { event_name: String, reason: String },
    #[error("event handler error: handler={handler}, reason={reason}")]
    Handler { handler: String, reason: String },
}

/// 统一 Result 类型别名
pub type EventResult<T> = Result<T, EventError>;
