//! 领域事件（DomainEvent）
//!
//! 以封闭枚举表达全部事件事实，每个变体携带强类型载荷；
//! 与 [`Payload`] 文档之间的转换集中在 `to_payload`/`from_payload` 两处完成。
//!
use super::kind::EventKind;
use super::payload::{Payload, PayloadField, PayloadValue, fields};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};

/// 分类已创建
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCreated {
    pub category_id: String,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

/// 收支记录的可变字段（更新事件整体替换这些字段）
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDetails {
    pub category_id: String,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

/// 收支已记录 / 已更新
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRecorded {
    pub movement_id: String,
    pub details: MovementDetails,
    pub occurred_at: DateTime<Utc>,
}

/// 收支已删除
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRemoved {
    pub movement_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    CategoryCreated(CategoryCreated),
    ExpenseCreated(MovementRecorded),
    ExpenseUpdated(MovementRecorded),
    ExpenseDeleted(MovementRemoved),
    IncomeCreated(MovementRecorded),
    IncomeUpdated(MovementRecorded),
    IncomeDeleted(MovementRemoved),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::CategoryCreated(_) => EventKind::CategoryCreated,
            DomainEvent::ExpenseCreated(_) => EventKind::ExpenseCreated,
            DomainEvent::ExpenseUpdated(_) => EventKind::ExpenseUpdated,
            DomainEvent::ExpenseDeleted(_) => EventKind::ExpenseDeleted,
            DomainEvent::IncomeCreated(_) => EventKind::IncomeCreated,
            DomainEvent::IncomeUpdated(_) => EventKind::IncomeUpdated,
            DomainEvent::IncomeDeleted(_) => EventKind::IncomeDeleted,
        }
    }

    pub fn aggregate_id(&self) -> &str {
        match self {
            DomainEvent::CategoryCreated(e) => &e.category_id,
            DomainEvent::ExpenseCreated(e)
            | DomainEvent::ExpenseUpdated(e)
            | DomainEvent::IncomeCreated(e)
            | DomainEvent::IncomeUpdated(e) => &e.movement_id,
            DomainEvent::ExpenseDeleted(e) | DomainEvent::IncomeDeleted(e) => &e.movement_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::CategoryCreated(e) => e.occurred_at,
            DomainEvent::ExpenseCreated(e)
            | DomainEvent::ExpenseUpdated(e)
            | DomainEvent::IncomeCreated(e)
            | DomainEvent::IncomeUpdated(e) => e.occurred_at,
            DomainEvent::ExpenseDeleted(e) | DomainEvent::IncomeDeleted(e) => e.occurred_at,
        }
    }

    /// 编码为载荷文档；金额非有限值时整批失败
    pub fn to_payload(&self) -> DomainResult<Payload> {
        let mut payload = Payload::new();

        match self {
            DomainEvent::CategoryCreated(e) => {
                payload.insert(fields::CATEGORY_ID, e.category_id.as_str());
                payload.insert(fields::NAME, e.name.as_str());
            }
            DomainEvent::ExpenseCreated(e)
            | DomainEvent::ExpenseUpdated(e)
            | DomainEvent::IncomeCreated(e)
            | DomainEvent::IncomeUpdated(e) => {
                if !e.details.amount.is_finite() {
                    return Err(DomainError::serialization(format!(
                        "{}: amount {} is not representable",
                        self.kind(),
                        e.details.amount
                    )));
                }
                payload.insert(movement_id_field(self.kind()), e.movement_id.as_str());
                payload.insert(fields::CATEGORY_ID, e.details.category_id.as_str());
                payload.insert(fields::AMOUNT, e.details.amount);
                payload.insert(
                    fields::DESCRIPTION,
                    match &e.details.description {
                        Some(text) => PayloadValue::from(text.as_str()),
                        None => PayloadValue::Null,
                    },
                );
                payload.insert(fields::DATE, e.details.date);
            }
            DomainEvent::ExpenseDeleted(e) | DomainEvent::IncomeDeleted(e) => {
                payload.insert(movement_id_field(self.kind()), e.movement_id.as_str());
            }
        }

        Ok(payload)
    }

    /// 从载荷文档解码。
    ///
    /// - 标识缺失时回落到日志记录的聚合 ID；
    /// - 业务日期缺失或无法解析时回落到事件发生时间；
    /// - 其余缺失字段取零值，交由投影层校验。
    pub fn from_payload(
        kind: EventKind,
        aggregate_id: &str,
        payload: &Payload,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let event = match kind {
            EventKind::CategoryCreated => DomainEvent::CategoryCreated(CategoryCreated {
                category_id: text_or(payload, fields::CATEGORY_ID, aggregate_id),
                name: text_or(payload, fields::NAME, ""),
                occurred_at,
            }),
            EventKind::ExpenseCreated => {
                DomainEvent::ExpenseCreated(recorded(kind, aggregate_id, payload, occurred_at))
            }
            EventKind::ExpenseUpdated => {
                DomainEvent::ExpenseUpdated(recorded(kind, aggregate_id, payload, occurred_at))
            }
            EventKind::IncomeCreated => {
                DomainEvent::IncomeCreated(recorded(kind, aggregate_id, payload, occurred_at))
            }
            EventKind::IncomeUpdated => {
                DomainEvent::IncomeUpdated(recorded(kind, aggregate_id, payload, occurred_at))
            }
            EventKind::ExpenseDeleted => {
                DomainEvent::ExpenseDeleted(removed(kind, aggregate_id, payload, occurred_at))
            }
            EventKind::IncomeDeleted => {
                DomainEvent::IncomeDeleted(removed(kind, aggregate_id, payload, occurred_at))
            }
        };

        Ok(event)
    }
}

fn movement_id_field(kind: EventKind) -> PayloadField {
    match kind.movement_type() {
        Some(super::kind::MovementType::Income) => fields::INCOME_ID,
        _ => fields::EXPENSE_ID,
    }
}

fn text_or(payload: &Payload, field: PayloadField, fallback: &str) -> String {
    payload.text(field).unwrap_or(fallback).to_string()
}

fn recorded(
    kind: EventKind,
    aggregate_id: &str,
    payload: &Payload,
    occurred_at: DateTime<Utc>,
) -> MovementRecorded {
    MovementRecorded {
        movement_id: text_or(payload, movement_id_field(kind), aggregate_id),
        details: MovementDetails {
            category_id: text_or(payload, fields::CATEGORY_ID, ""),
            amount: payload.amount(fields::AMOUNT).unwrap_or_default(),
            description: payload.optional_text(fields::DESCRIPTION),
            date: payload.timestamp(fields::DATE).unwrap_or(occurred_at),
        },
        occurred_at,
    }
}

fn removed(
    kind: EventKind,
    aggregate_id: &str,
    payload: &Payload,
    occurred_at: DateTime<Utc>,
) -> MovementRemoved {
    MovementRemoved {
        movement_id: text_or(payload, movement_id_field(kind), aggregate_id),
        occurred_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expense_created(amount: f64) -> DomainEvent {
        DomainEvent::ExpenseCreated(MovementRecorded {
            movement_id: "exp-1".into(),
            details: MovementDetails {
                category_id: "cat-1".into(),
                amount,
                description: Some("groceries".into()),
                date: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
            },
            occurred_at: Utc.with_ymd_and_hms(2025, 7, 2, 9, 0, 0).unwrap(),
        })
    }

    #[test]
    fn movement_payload_uses_kind_specific_id_key() {
        let payload = expense_created(50_000.0).to_payload().unwrap();
        assert_eq!(payload.raw("ExpenseID"), Some(&PayloadValue::from("exp-1")));
        assert_eq!(payload.raw("expense_id"), Some(&PayloadValue::from("exp-1")));
        assert!(payload.raw("IncomeID").is_none());

        let income = DomainEvent::IncomeDeleted(MovementRemoved {
            movement_id: "inc-9".into(),
            occurred_at: Utc::now(),
        });
        let payload = income.to_payload().unwrap();
        assert_eq!(payload.text(fields::INCOME_ID), Some("inc-9"));
    }

    #[test]
    fn payload_roundtrip_preserves_event() {
        let event = expense_created(50_000.0);
        let payload = event.to_payload().unwrap();
        let back = DomainEvent::from_payload(
            event.kind(),
            event.aggregate_id(),
            &payload,
            event.occurred_at(),
        )
        .unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn non_finite_amount_is_a_serialization_error() {
        for amount in [f64::NAN, f64::INFINITY] {
            let err = expense_created(amount).to_payload().unwrap_err();
            assert!(matches!(err, DomainError::Serialization { .. }));
        }
    }

    #[test]
    fn missing_or_bad_date_falls_back_to_occurrence_time() {
        let occurred_at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();

        let mut missing = Payload::new();
        missing.insert_raw("ExpenseID", "exp-2");
        missing.insert_raw("amount", 10_i64);

        let mut garbage = missing.clone();
        garbage.insert_raw("date", "yesterday");

        for (kind, payload) in [
            (EventKind::ExpenseCreated, missing),
            (EventKind::ExpenseUpdated, garbage),
        ] {
            let event = DomainEvent::from_payload(kind, "exp-2", &payload, occurred_at).unwrap();
            match event {
                DomainEvent::ExpenseCreated(e) | DomainEvent::ExpenseUpdated(e) => {
                    assert_eq!(e.details.date, occurred_at);
                    assert_eq!(e.details.amount, 10.0);
                    assert_eq!(e.details.description, None);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn decode_falls_back_to_logged_aggregate_id() {
        let event = DomainEvent::from_payload(
            EventKind::CategoryCreated,
            "cat-7",
            &{
                let mut p = Payload::new();
                p.insert_raw("name", "Rent");
                p
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(event.aggregate_id(), "cat-7");
        match event {
            DomainEvent::CategoryCreated(e) => assert_eq!(e.name, "Rent"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
