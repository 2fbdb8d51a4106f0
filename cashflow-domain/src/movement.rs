//! 收支聚合（Expense / Income）
//!
//! 支出与收入的状态与行为完全一致，仅事件变体与类型标签不同，
//! 因此以 `Movement<K>` 配合类型标记 `ExpenseKind`/`IncomeKind` 实现。
//!
use crate::{
    aggregate::Aggregate,
    domain_event::{
        AggregateType, DomainEvent, MovementDetails, MovementRecorded, MovementRemoved,
        MovementType,
    },
    error::{DomainError, DomainResult},
};
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::marker::PhantomData;

/// 收支类型标记：决定聚合类型标签与事件变体
pub trait MovementKind: Debug + Clone + Send + Sync + 'static {
    const TYPE: AggregateType;
    const LABEL: MovementType;

    fn created(event: MovementRecorded) -> DomainEvent;
    fn updated(event: MovementRecorded) -> DomainEvent;
    fn deleted(event: MovementRemoved) -> DomainEvent;

    /// 若事件为本类型的创建/更新事件，返回其载荷
    fn recorded(event: &DomainEvent) -> Option<&MovementRecorded>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IncomeKind;

impl MovementKind for ExpenseKind {
    const TYPE: AggregateType = AggregateType::Expense;
    const LABEL: MovementType = MovementType::Expense;

    fn created(event: MovementRecorded) -> DomainEvent {
        DomainEvent::ExpenseCreated(event)
    }

    fn updated(event: MovementRecorded) -> DomainEvent {
        DomainEvent::ExpenseUpdated(event)
    }

    fn deleted(event: MovementRemoved) -> DomainEvent {
        DomainEvent::ExpenseDeleted(event)
    }

    fn recorded(event: &DomainEvent) -> Option<&MovementRecorded> {
        match event {
            DomainEvent::ExpenseCreated(e) | DomainEvent::ExpenseUpdated(e) => Some(e),
            _ => None,
        }
    }
}

impl MovementKind for IncomeKind {
    const TYPE: AggregateType = AggregateType::Income;
    const LABEL: MovementType = MovementType::Income;

    fn created(event: MovementRecorded) -> DomainEvent {
        DomainEvent::IncomeCreated(event)
    }

    fn updated(event: MovementRecorded) -> DomainEvent {
        DomainEvent::IncomeUpdated(event)
    }

    fn deleted(event: MovementRemoved) -> DomainEvent {
        DomainEvent::IncomeDeleted(event)
    }

    fn recorded(event: &DomainEvent) -> Option<&MovementRecorded> {
        match event {
            DomainEvent::IncomeCreated(e) | DomainEvent::IncomeUpdated(e) => Some(e),
            _ => None,
        }
    }
}

pub type Expense = Movement<ExpenseKind>;
pub type Income = Movement<IncomeKind>;

#[derive(Debug, Clone, PartialEq)]
pub struct Movement<K: MovementKind> {
    id: String,
    category_id: String,
    amount: f64,
    description: Option<String>,
    date: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    uncommitted: Vec<DomainEvent>,
    _kind: PhantomData<K>,
}

/// 金额必须为有限正数
pub fn validate_details(details: &MovementDetails) -> DomainResult<()> {
    if !details.amount.is_finite() || details.amount <= 0.0 {
        return Err(DomainError::validation(format!(
            "amount must be a positive number, got {}",
            details.amount
        )));
    }
    Ok(())
}

impl<K: MovementKind> Movement<K> {
    /// 记录一笔新的收支并产生创建事件
    pub fn record(id: impl Into<String>, details: MovementDetails) -> DomainResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::validation("movement id must not be empty"));
        }
        validate_details(&details)?;

        let mut movement = Self::empty(&id);
        movement.raise(K::created(MovementRecorded {
            movement_id: id,
            details,
            occurred_at: Utc::now(),
        }));
        Ok(movement)
    }

    /// 整体替换可变字段
    pub fn update(&mut self, details: MovementDetails) -> DomainResult<()> {
        validate_details(&details)?;
        self.raise(K::updated(MovementRecorded {
            movement_id: self.id.clone(),
            details,
            occurred_at: Utc::now(),
        }));
        Ok(())
    }

    /// 产生删除事件；写模型字段保持不变
    pub fn delete(&mut self) {
        self.raise(K::deleted(MovementRemoved {
            movement_id: self.id.clone(),
            occurred_at: Utc::now(),
        }));
    }

    fn raise(&mut self, event: DomainEvent) {
        self.apply(&event);
        self.uncommitted.push(event);
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn movement_type(&self) -> MovementType {
        K::LABEL
    }
}

impl<K: MovementKind> Aggregate for Movement<K> {
    const TYPE: AggregateType = K::TYPE;

    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            category_id: String::new(),
            amount: 0.0,
            description: None,
            date: None,
            created_at: None,
            updated_at: None,
            uncommitted: Vec::new(),
            _kind: PhantomData,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, event: &DomainEvent) {
        let Some(recorded) = K::recorded(event) else {
            return;
        };

        let details = &recorded.details;
        self.category_id = details.category_id.clone();
        self.amount = details.amount;
        self.description = details.description.clone();
        self.date = Some(details.date);
        self.created_at.get_or_insert(recorded.occurred_at);
        self.updated_at = Some(recorded.occurred_at);
    }

    fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted.clear();
    }
}
