use crate::domain_event::MovementType;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 分类缺失或未知时使用的名称
pub const UNCATEGORIZED: &str = "Uncategorized";

/// 收支读模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementProjection {
    pub id: String,
    pub movement_type: MovementType,
    pub category_id: String,
    pub category_name: String,
    pub amount: f64,
    pub description: Option<String>,
    /// 业务日期
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

/// 分类读模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProjection {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

/// 更新事件对既有投影行的局部修改（不触及 `created_at`/`deleted`）
#[derive(Debug, Clone, PartialEq)]
pub struct MovementChanges {
    pub category_id: String,
    pub category_name: String,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MovementProjection {
    pub fn apply_changes(&mut self, changes: &MovementChanges) {
        self.category_id = changes.category_id.clone();
        self.category_name = changes.category_name.clone();
        self.amount = changes.amount;
        self.description = changes.description.clone();
        self.date = changes.date;
        self.updated_at = changes.updated_at;
    }

    /// 列表排序：业务日期降序，其次创建时间降序，最后按 ID 保证稳定
    pub fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// 收支列表查询条件；`limit == 0` 表示不限条数
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct MovementListQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[builder(default)]
    pub limit: usize,
    #[builder(default)]
    pub offset: usize,
}

impl MovementListQuery {
    pub fn matches(&self, movement: &MovementProjection) -> bool {
        !movement.deleted
            && self.start.is_none_or(|start| movement.date >= start)
            && self.end.is_none_or(|end| movement.date <= end)
    }
}
