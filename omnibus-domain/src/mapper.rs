//! 事件映射器（DomainEventMapper）
//!
//! 定义领域事件与线上表示（DTO）之间的纯函数转换对：
//! - `to_dto`：领域事件 -> 线上表示；
//! - `to_domain`：线上表示 -> 领域事件；
//! - 往返律：对任意合法事件 `e`，`to_domain(to_dto(e))` 与 `e` 可观测等价。
//!
use crate::domain_event::DomainEvent;
use crate::error::EventResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// 事件映射器：一对无状态纯函数，发布路径编码、消费路径解码
pub trait DomainEventMapper<E>: Send + Sync
where
    E: DomainEvent,
{
    /// 领域事件编码为线上表示
    fn to_dto(&self, event: &E) -> EventResult<Value>;

    /// 线上表示还原为领域事件
    fn to_domain(&self, dto: &Value) -> EventResult<E>;
}

/// 基于 serde_json 的默认映射器：事件自身的序列化形态即 DTO
pub struct JsonEventMapper<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> JsonEventMapper<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for JsonEventMapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> DomainEventMapper<E> for JsonEventMapper<E>
where
    E: DomainEvent + Serialize + DeserializeOwned,
{
    fn to_dto(&self, event: &E) -> EventResult<Value> {
        Ok(serde_json::to_value(event)?)
    }

    fn to_domain(&self, dto: &Value) -> EventResult<E> {
        Ok(serde_json::from_value(dto.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use std::any::Any;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct AccountOpened {
        account_id: String,
        owner: String,
        occurred_at: DateTime<Utc>,
    }

    impl DomainEvent for AccountOpened {
        fn event_name(&self) -> &str {
            "AccountOpened"
        }
        fn event_version(&self) -> u32 {
            1
        }
        fn aggregate_id(&self) -> &str {
            &self.account_id
        }
        fn occurred_at(&self) -> DateTime<Utc> {
            self.occurred_at
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn json_mapper_round_trip_preserves_observable_fields() {
        let mapper = JsonEventMapper::<AccountOpened>::new();
        let event = AccountOpened {
            account_id: "acc-1".into(),
            owner: "alice".into(),
            occurred_at: Utc::now(),
        };

        let dto = mapper.to_dto(&event).expect("encode");
        let back = mapper.to_domain(&dto).expect("decode");

        assert_eq!(back, event);
    }

    #[test]
    fn json_mapper_rejects_malformed_dto() {
        let mapper = JsonEventMapper::<AccountOpened>::new();
        let dto = serde_json::json!({"account_id": 42});

        assert!(mapper.to_domain(&dto).is_err());
    }
}
