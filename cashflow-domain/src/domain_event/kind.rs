use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// 聚合类型标签（写入事件日志的 `aggregate_type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateType {
    Category,
    Expense,
    Income,
}

impl AggregateType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AggregateType::Category => "Category",
            AggregateType::Expense => "Expense",
            AggregateType::Income => "Income",
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Category" => Ok(AggregateType::Category),
            "Expense" => Ok(AggregateType::Expense),
            "Income" => Ok(AggregateType::Income),
            other => Err(DomainError::validation(format!(
                "unknown aggregate type: {other}"
            ))),
        }
    }
}

/// 事件在聚合生命周期中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Updated,
    Deleted,
}

/// 事件类型标签（写入事件日志的 `event_type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CategoryCreated,
    ExpenseCreated,
    ExpenseUpdated,
    ExpenseDeleted,
    IncomeCreated,
    IncomeUpdated,
    IncomeDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::CategoryCreated,
        EventKind::ExpenseCreated,
        EventKind::ExpenseUpdated,
        EventKind::ExpenseDeleted,
        EventKind::IncomeCreated,
        EventKind::IncomeUpdated,
        EventKind::IncomeDeleted,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EventKind::CategoryCreated => "CategoryCreated",
            EventKind::ExpenseCreated => "ExpenseCreated",
            EventKind::ExpenseUpdated => "ExpenseUpdated",
            EventKind::ExpenseDeleted => "ExpenseDeleted",
            EventKind::IncomeCreated => "IncomeCreated",
            EventKind::IncomeUpdated => "IncomeUpdated",
            EventKind::IncomeDeleted => "IncomeDeleted",
        }
    }

    pub const fn aggregate_type(&self) -> AggregateType {
        match self {
            EventKind::CategoryCreated => AggregateType::Category,
            EventKind::ExpenseCreated | EventKind::ExpenseUpdated | EventKind::ExpenseDeleted => {
                AggregateType::Expense
            }
            EventKind::IncomeCreated | EventKind::IncomeUpdated | EventKind::IncomeDeleted => {
                AggregateType::Income
            }
        }
    }

    pub const fn lifecycle(&self) -> Lifecycle {
        match self {
            EventKind::CategoryCreated | EventKind::ExpenseCreated | EventKind::IncomeCreated => {
                Lifecycle::Created
            }
            EventKind::ExpenseUpdated | EventKind::IncomeUpdated => Lifecycle::Updated,
            EventKind::ExpenseDeleted | EventKind::IncomeDeleted => Lifecycle::Deleted,
        }
    }

    /// 若为收支事件，返回对应的收支类型
    pub const fn movement_type(&self) -> Option<MovementType> {
        match self.aggregate_type() {
            AggregateType::Category => None,
            AggregateType::Expense => Some(MovementType::Expense),
            AggregateType::Income => Some(MovementType::Income),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::UnknownEventKind(s.to_string()))
    }
}

/// 收支类型标签（投影中的 `type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Income,
    Expense,
}

impl MovementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::Income => "income",
            MovementType::Expense => "expense",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(MovementType::Income),
            "expense" => Ok(MovementType::Expense),
            other => Err(DomainError::validation(format!(
                "unknown movement type: {other}"
            ))),
        }
    }
}
