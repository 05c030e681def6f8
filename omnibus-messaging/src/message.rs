//! 线级消息信封（Message）
//!
//! 经由任意传输的统一消息形态：消息键、编码后的事件负载与头部。
//! 头部冗余携带事件元信息（名称、版本、发生时间），便于观测与模式演进；
//! 规范负载仍由映射器负责。
//!
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 头部：事件稳定标识
pub const HEADER_EVENT_NAME: &str = "event-name";
/// 头部：事件载荷版本
pub const HEADER_EVENT_VERSION: &str = "event-version";
/// 头部：事件发生时间（RFC 3339）
pub const HEADER_OCCURRED_AT: &str = "occurred-at";

/// 线级消息信封
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct Message {
    /// 消息键（聚合 ID；支持分区的传输以此保序）
    key: Option<String>,
    /// 编码后的事件负载（DTO 字节）
    value: Vec<u8>,
    /// 头部（顺序无关）
    #[builder(default)]
    headers: HashMap<String, String>,
}

impl Message {
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 按名称读取单个头部
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }
}

/// 入站消息：消息本体及其到达的主题
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub message: Message,
}
