//! 事件映射注册表（MapperRegistry）
//!
//! 以事件稳定标识为键，保存类型擦除后的编码/解码函数对。
//! 注册时保留具体事件类型；调用时经 `as_any` 向下转型还原，
//! 键严格使用事件名标签，不依赖类型反射。
//!
use crate::error::MessagingResult;
use dashmap::DashMap;
use omnibus_domain::domain_event::DomainEvent;
use omnibus_domain::error::EventError;
use omnibus_domain::mapper::DomainEventMapper;
use serde_json::Value;
use std::sync::Arc;

type EncodeFn = Arc<dyn Fn(&dyn DomainEvent) -> MessagingResult<Value> + Send + Sync>;
type DecodeFn = Arc<dyn Fn(&Value) -> MessagingResult<Arc<dyn DomainEvent>> + Send + Sync>;

/// 类型擦除后的映射函数对
#[derive(Clone)]
pub struct ErasedMapper {
    encode: EncodeFn,
    decode: DecodeFn,
}

impl ErasedMapper {
    /// 领域事件编码为线上表示
    pub fn to_dto(&self, event: &dyn DomainEvent) -> MessagingResult<Value> {
        (self.encode)(event)
    }

    /// 线上表示还原为领域事件
    pub fn to_domain(&self, dto: &Value) -> MessagingResult<Arc<dyn DomainEvent>> {
        (self.decode)(dto)
    }
}

/// 事件名 -> 映射函数对
#[derive(Default)]
pub struct MapperRegistry {
    mappers: DashMap<String, ErasedMapper>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册事件类型的映射器（以事件名为键）
    pub fn register<E, M>(&self, event_name: impl Into<String>, mapper: Arc<M>)
    where
        E: DomainEvent,
        M: DomainEventMapper<E> + 'static,
    {
        let event_name = event_name.into();

        let encode: EncodeFn = {
            let mapper = mapper.clone();
            let expected = event_name.clone();
            Arc::new(move |event: &dyn DomainEvent| {
                let Some(typed) = event.as_any().downcast_ref::<E>() else {
                    return Err(EventError::TypeMismatch {
                        expected: expected.clone(),
                        found: event.event_name().to_string(),
                    }
                    .into());
                };
                Ok(mapper.to_dto(typed)?)
            })
        };

        let decode: DecodeFn = Arc::new(move |dto: &Value| {
            let event = mapper.to_domain(dto)?;
            Ok(Arc::new(event) as Arc<dyn DomainEvent>)
        });

        self.mappers.insert(event_name, ErasedMapper { encode, decode });
    }

    /// 查询事件名对应的映射函数对
    pub fn get(&self, event_name: &str) -> Option<ErasedMapper> {
        self.mappers.get(event_name).map(|m| m.clone())
    }

    pub fn contains(&self, event_name: &str) -> bool {
        self.mappers.contains_key(event_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MessagingError;
    use chrono::{DateTime, Utc};
    use omnibus_domain::mapper::JsonEventMapper;
    use serde::{Deserialize, Serialize};
    use std::any::Any;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct OrderPlaced {
        order_id: String,
        total: u64,
        occurred_at: DateTime<Utc>,
    }

    impl DomainEvent for OrderPlaced {
        fn event_name(&self) -> &str {
            "OrderPlaced"
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

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct OrderCancelled {
        order_id: String,
        occurred_at: DateTime<Utc>,
    }

    impl DomainEvent for OrderCancelled {
        fn event_name(&self) -> &str {
            "OrderCancelled"
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

    fn placed(id: &str, total: u64) -> OrderPlaced {
        OrderPlaced {
            order_id: id.into(),
            total,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn registered_pair_encodes_and_decodes() {
        let registry = MapperRegistry::new();
        registry.register(
            "OrderPlaced",
            Arc::new(JsonEventMapper::<OrderPlaced>::new()),
        );

        let event = placed("o1", 42);
        let pair = registry.get("OrderPlaced").expect("registered");

        let dto = pair.to_dto(&event).unwrap();
        let back = pair.to_domain(&dto).unwrap();

        let back = back.as_any().downcast_ref::<OrderPlaced>().unwrap();
        assert_eq!(*back, event);
    }

    #[test]
    fn absent_mapper_returns_none() {
        let registry = MapperRegistry::new();
        assert!(registry.get("Nope").is_none());
        assert!(!registry.contains("Nope"));
    }

    #[test]
    fn encoding_with_wrong_runtime_type_is_a_type_mismatch() {
        let registry = MapperRegistry::new();
        registry.register(
            "OrderPlaced",
            Arc::new(JsonEventMapper::<OrderPlaced>::new()),
        );

        let wrong = OrderCancelled {
            order_id: "o1".into(),
            occurred_at: Utc::now(),
        };
        let pair = registry.get("OrderPlaced").unwrap();

        assert!(matches!(
            pair.to_dto(&wrong),
            Err(MessagingError::Event(EventError::TypeMismatch { .. }))
        ));
    }
}
