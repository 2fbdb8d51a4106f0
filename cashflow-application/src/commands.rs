//! 账本命令
//!
//! 收支三种命令以类型标记 `K` 区分支出与收入。
//!
use crate::{command::Command, error::AppError};
use cashflow_domain::domain_event::{MovementDetails, parse_timestamp};
use cashflow_domain::movement::{ExpenseKind, IncomeKind, MovementKind};
use chrono::{DateTime, Utc};
use std::marker::PhantomData;

/// 新建分类；未指定 ID 时生成 UUID，输出为分类 ID
#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub id: Option<String>,
    pub name: String,
}

impl CreateCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Command for CreateCategory {
    const NAME: &'static str = "CreateCategory";
    type Output = String;
}

/// 收支命令的业务字段
#[derive(Debug, Clone, PartialEq)]
pub struct MovementInput {
    pub category_id: String,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

impl MovementInput {
    /// 由接口层文本构造；金额或日期无法解析时返回校验错误
    pub fn parse(
        category_id: impl Into<String>,
        amount_text: &str,
        description: Option<&str>,
        date_text: &str,
    ) -> Result<Self, AppError> {
        let amount = amount_text
            .trim()
            .parse::<f64>()
            .map_err(|e| AppError::Validation(format!("invalid amount {amount_text:?}: {e}")))?;

        let date = parse_timestamp(date_text)
            .ok_or_else(|| AppError::Validation(format!("invalid date {date_text:?}")))?;

        let input = Self {
            category_id: category_id.into(),
            amount,
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            date,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(AppError::Validation(format!(
                "amount must be a positive number, got {}",
                self.amount
            )));
        }
        Ok(())
    }

    pub(crate) fn into_details(self) -> MovementDetails {
        MovementDetails {
            category_id: self.category_id,
            amount: self.amount,
            description: self.description,
            date: self.date,
        }
    }
}

/// 记录一笔收支；输出为记录 ID
#[derive(Debug, Clone)]
pub struct CreateMovement<K: MovementKind> {
    pub id: Option<String>,
    pub input: MovementInput,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MovementKind> CreateMovement<K> {
    pub fn new(input: MovementInput) -> Self {
        Self {
            id: None,
            input,
            _kind: PhantomData,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 整体替换一笔收支的可变字段
#[derive(Debug, Clone)]
pub struct UpdateMovement<K: MovementKind> {
    pub id: String,
    pub input: MovementInput,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MovementKind> UpdateMovement<K> {
    pub fn new(id: impl Into<String>, input: MovementInput) -> Self {
        Self {
            id: id.into(),
            input,
            _kind: PhantomData,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteMovement<K: MovementKind> {
    pub id: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: MovementKind> DeleteMovement<K> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _kind: PhantomData,
        }
    }
}

pub type CreateExpense = CreateMovement<ExpenseKind>;
pub type CreateIncome = CreateMovement<IncomeKind>;
pub type UpdateExpense = UpdateMovement<ExpenseKind>;
pub type UpdateIncome = UpdateMovement<IncomeKind>;
pub type DeleteExpense = DeleteMovement<ExpenseKind>;
pub type DeleteIncome = DeleteMovement<IncomeKind>;

impl Command for CreateExpense {
    const NAME: &'static str = "CreateExpense";
    type Output = String;
}

impl Command for CreateIncome {
    const NAME: &'static str = "CreateIncome";
    type Output = String;
}

impl Command for UpdateExpense {
    const NAME: &'static str = "UpdateExpense";
    type Output = ();
}

impl Command for UpdateIncome {
    const NAME: &'static str = "UpdateIncome";
    type Output = ();
}

impl Command for DeleteExpense {
    const NAME: &'static str = "DeleteExpense";
    type Output = ();
}

impl Command for DeleteIncome {
    const NAME: &'static str = "DeleteIncome";
    type Output = ();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_accepts_transport_text() {
        let input = MovementInput::parse("food", " 50000 ", Some("  "), "2025-07-01").unwrap();

        assert_eq!(input.amount, 50000.0);
        assert_eq!(input.description, None);
        assert_eq!(input.date, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());

        let input =
            MovementInput::parse("food", "12.5", Some("lunch"), "2025-07-01 12:30:00").unwrap();
        assert_eq!(input.description.as_deref(), Some("lunch"));
        assert_eq!(input.date, Utc.with_ymd_and_hms(2025, 7, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn parse_rejects_bad_amount_and_date() {
        for (amount, date) in [
            ("abc", "2025-07-01"),
            ("-5", "2025-07-01"),
            ("0", "2025-07-01"),
            ("NaN", "2025-07-01"),
            ("10", "01/07/2025"),
        ] {
            let err = MovementInput::parse("food", amount, None, date).unwrap_err();
            assert!(err.is_validation(), "{amount} {date}: {err}");
        }
    }

    #[test]
    fn command_names_follow_movement_kind() {
        assert_eq!(CreateExpense::NAME, "CreateExpense");
        assert_eq!(UpdateIncome::NAME, "UpdateIncome");
        assert_eq!(DeleteIncome::NAME, "DeleteIncome");
        assert_eq!(CreateCategory::NAME, "CreateCategory");
    }
}
