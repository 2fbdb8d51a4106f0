//! 账本查询
//!
//! 时间区间均按业务日期过滤，边界包含在内。
//!
use crate::dto::{
    BalanceDto, CategoryDto, CategoryExpenseDto, MovementDto, PaginatedMovementsDto,
};
use crate::query::Query;
use chrono::{DateTime, Utc};

/// 未删除的收支，按业务日期降序
#[derive(Debug, Clone, Default)]
pub struct GetMovements {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Query for GetMovements {
    const NAME: &'static str = "GetMovements";
    type Dto = Vec<MovementDto>;
}

/// `limit == 0` 时返回全部记录
#[derive(Debug, Clone, Default)]
pub struct GetPaginatedMovements {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

impl Query for GetPaginatedMovements {
    const NAME: &'static str = "GetPaginatedMovements";
    type Dto = PaginatedMovementsDto;
}

#[derive(Debug, Clone)]
pub struct GetBalance {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Query for GetBalance {
    const NAME: &'static str = "GetBalance";
    type Dto = BalanceDto;
}

#[derive(Debug, Clone, Default)]
pub struct GetExpensesByCategory {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Query for GetExpensesByCategory {
    const NAME: &'static str = "GetExpensesByCategory";
    type Dto = Vec<CategoryExpenseDto>;
}

#[derive(Debug, Clone, Default)]
pub struct GetCategories;

impl Query for GetCategories {
    const NAME: &'static str = "GetCategories";
    type Dto = Vec<CategoryDto>;
}

#[derive(Debug, Clone)]
pub struct GetMovementById {
    pub id: String,
}

impl Query for GetMovementById {
    const NAME: &'static str = "GetMovementById";
    type Dto = Option<MovementDto>;
}

#[derive(Debug, Clone)]
pub struct GetCategoryById {
    pub id: String,
}

impl Query for GetCategoryById {
    const NAME: &'static str = "GetCategoryById";
    type Dto = Option<CategoryDto>;
}
