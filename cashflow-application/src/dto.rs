use cashflow_domain::domain_event::MovementType;
use cashflow_domain::projection::{CategoryProjection, MovementProjection};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 数据传输对象（DTO）
///
/// - 作为应用层的输出载体，面向接口/外部系统序列化友好；
/// - 与领域模型解耦，避免将领域对象直接暴露到接口层；
/// - 应保持只读特性与简洁结构，适配不同用例的返回需求。
pub trait Dto: Serialize + Send + Sync + 'static {}

impl<T: Dto> Dto for Vec<T> {}
impl<T: Dto> Dto for Option<T> {}
impl Dto for String {}

/// 收支记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementDto {
    pub id: String,
    pub movement_type: MovementType,
    pub category_id: String,
    pub category_name: String,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dto for MovementDto {}

impl From<MovementProjection> for MovementDto {
    fn from(p: MovementProjection) -> Self {
        Self {
            id: p.id,
            movement_type: p.movement_type,
            category_id: p.category_id,
            category_name: p.category_name,
            amount: p.amount,
            description: p.description,
            date: p.date,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dto for CategoryDto {}

impl From<CategoryProjection> for CategoryDto {
    fn from(p: CategoryProjection) -> Self {
        Self {
            id: p.id,
            name: p.name,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// 区间余额；`period` 形如 `2025-07-01 - 2025-07-31`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceDto {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_balance: f64,
    pub period: String,
}

impl Dto for BalanceDto {}

/// 按分类汇总的支出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryExpenseDto {
    pub category_id: String,
    pub category_name: String,
    pub total: f64,
    pub count: usize,
}

impl Dto for CategoryExpenseDto {}

/// 分页收支列表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedMovementsDto {
    pub movements: Vec<MovementDto>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Dto for PaginatedMovementsDto {}
