//! 运行配置（MessagingConfig）
//!
//! 承载总线的传输选择来自环境（如 `OMNIBUS_TRANSPORT=inmemory`）；
//! 未知标识在启动期经工厂立即报错，而不是等到首次使用。
//!
use crate::broker_factory::TRANSPORT_INMEMORY;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// 消息层配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// 承载总线的传输标识（如 `inmemory`）
    pub transport: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            transport: TRANSPORT_INMEMORY.to_string(),
        }
    }
}

impl MessagingConfig {
    /// 从环境变量构建（前缀 `OMNIBUS`，未设置时回落到进程内传输）
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("transport", TRANSPORT_INMEMORY)?
            .add_source(Environment::with_prefix("OMNIBUS"))
            .build()?;

        s.try_deserialize()
    }
}
