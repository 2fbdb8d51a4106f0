//! 分类聚合（Category）
//!
use crate::{
    aggregate::Aggregate,
    domain_event::{AggregateType, CategoryCreated, DomainEvent},
    error::{DomainError, DomainResult},
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    id: String,
    name: String,
    created_at: Option<DateTime<Utc>>,
    uncommitted: Vec<DomainEvent>,
}

impl Category {
    /// 创建分类并立即产生 `CategoryCreated`
    pub fn create(id: impl Into<String>, name: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        let name = name.into();

        if id.trim().is_empty() {
            return Err(DomainError::validation("category id must not be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("category name must not be empty"));
        }

        let mut category = Self::empty(&id);
        let event = DomainEvent::CategoryCreated(CategoryCreated {
            category_id: id,
            name,
            occurred_at: Utc::now(),
        });
        category.apply(&event);
        category.uncommitted.push(event);
        Ok(category)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

impl Aggregate for Category {
    const TYPE: AggregateType = AggregateType::Category;

    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            created_at: None,
            uncommitted: Vec::new(),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, event: &DomainEvent) {
        if let DomainEvent::CategoryCreated(e) = event {
            self.name = e.name.clone();
            self.created_at = Some(e.occurred_at);
        }
    }

    fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted.clear();
    }
}
