//! SQLite 投影存储
//!
//! 两张表分别保存收支与分类；创建使用 `INSERT OR REPLACE`，
//! 更新/软删除使用单条 `UPDATE` 并以受影响行数判断是否命中。
//!
use crate::{
    context::CallContext,
    domain_event::MovementType,
    error::DomainResult,
    projection::{
        CategoryProjection, MovementChanges, MovementListQuery, MovementProjection,
        ProjectionStore,
    },
    sqlite::{decode_timestamp, encode_timestamp},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS categories (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS movements (
        id TEXT PRIMARY KEY,
        movement_type TEXT NOT NULL,
        category_id TEXT NOT NULL,
        category_name TEXT NOT NULL,
        amount REAL NOT NULL,
        description TEXT,
        date TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_movements_date ON movements (date)",
];

const MOVEMENT_COLUMNS: &str = "SELECT id, movement_type, category_id, category_name, amount, \
     description, date, created_at, updated_at, deleted FROM movements";

const CATEGORY_COLUMNS: &str = "SELECT id, name, created_at, updated_at, deleted FROM categories";

#[derive(Clone)]
pub struct SqliteProjectionStore {
    pool: SqlitePool,
}

impl SqliteProjectionStore {
    pub async fn new(pool: SqlitePool) -> DomainResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    fn decode_movement(row: &SqliteRow) -> DomainResult<MovementProjection> {
        let movement_type: String = row.try_get("movement_type")?;
        let date: String = row.try_get("date")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(MovementProjection {
            id: row.try_get("id")?,
            movement_type: movement_type.parse::<MovementType>()?,
            category_id: row.try_get("category_id")?,
            category_name: row.try_get("category_name")?,
            amount: row.try_get("amount")?,
            description: row.try_get("description")?,
            date: decode_timestamp(&date)?,
            created_at: decode_timestamp(&created_at)?,
            updated_at: decode_timestamp(&updated_at)?,
            deleted: row.try_get("deleted")?,
        })
    }

    fn decode_category(row: &SqliteRow) -> DomainResult<CategoryProjection> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(CategoryProjection {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: decode_timestamp(&created_at)?,
            updated_at: decode_timestamp(&updated_at)?,
            deleted: row.try_get("deleted")?,
        })
    }

    fn push_movement_filter(builder: &mut QueryBuilder<'_, Sqlite>, query: &MovementListQuery) {
        builder.push(" WHERE deleted = 0");
        if let Some(start) = query.start {
            builder.push(" AND date >= ").push_bind(encode_timestamp(start));
        }
        if let Some(end) = query.end {
            builder.push(" AND date <= ").push_bind(encode_timestamp(end));
        }
    }

    async fn fetch_category(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        id: &str,
        include_deleted: bool,
    ) -> DomainResult<Option<CategoryProjection>> {
        let sql = if include_deleted {
            format!("{CATEGORY_COLUMNS} WHERE id = ?")
        } else {
            format!("{CATEGORY_COLUMNS} WHERE id = ? AND deleted = 0")
        };

        let row = ctx
            .run(operation, async {
                Ok(sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?)
            })
            .await?;

        row.as_ref().map(Self::decode_category).transpose()
    }
}

#[async_trait]
impl ProjectionStore for SqliteProjectionStore {
    async fn upsert_category(
        &self,
        ctx: &CallContext,
        category: CategoryProjection,
    ) -> DomainResult<()> {
        ctx.run("projection.upsert_category", async {
            sqlx::query(
                "INSERT OR REPLACE INTO categories (id, name, created_at, updated_at, deleted)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&category.id)
            .bind(&category.name)
            .bind(encode_timestamp(category.created_at))
            .bind(encode_timestamp(category.updated_at))
            .bind(category.deleted)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn find_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        self.fetch_category(ctx, "projection.find_category", id, true)
            .await
    }

    async fn upsert_movement(
        &self,
        ctx: &CallContext,
        movement: MovementProjection,
    ) -> DomainResult<()> {
        ctx.run("projection.upsert_movement", async {
            sqlx::query(
                "INSERT OR REPLACE INTO movements (id, movement_type, category_id, category_name,
                     amount, description, date, created_at, updated_at, deleted)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&movement.id)
            .bind(movement.movement_type.as_str())
            .bind(&movement.category_id)
            .bind(&movement.category_name)
            .bind(movement.amount)
            .bind(movement.description.as_deref())
            .bind(encode_timestamp(movement.date))
            .bind(encode_timestamp(movement.created_at))
            .bind(encode_timestamp(movement.updated_at))
            .bind(movement.deleted)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn update_movement(
        &self,
        ctx: &CallContext,
        id: &str,
        changes: &MovementChanges,
    ) -> DomainResult<bool> {
        ctx.run("projection.update_movement", async {
            let result = sqlx::query(
                "UPDATE movements
                 SET category_id = ?, category_name = ?, amount = ?, description = ?,
                     date = ?, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&changes.category_id)
            .bind(&changes.category_name)
            .bind(changes.amount)
            .bind(changes.description.as_deref())
            .bind(encode_timestamp(changes.date))
            .bind(encode_timestamp(changes.updated_at))
            .bind(id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn mark_movement_deleted(
        &self,
        ctx: &CallContext,
        id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        ctx.run("projection.mark_movement_deleted", async {
            let result = sqlx::query("UPDATE movements SET deleted = 1, updated_at = ? WHERE id = ?")
                .bind(encode_timestamp(at))
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
        .await
    }

    async fn list_movements(
        &self,
        ctx: &CallContext,
        query: &MovementListQuery,
    ) -> DomainResult<(Vec<MovementProjection>, usize)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM movements");
        Self::push_movement_filter(&mut count, query);

        let mut page = QueryBuilder::<Sqlite>::new(MOVEMENT_COLUMNS);
        Self::push_movement_filter(&mut page, query);
        page.push(" ORDER BY date DESC, created_at DESC, id ASC");
        // SQLite 中 LIMIT -1 表示不限；超出 i64 的值截断为 i64::MAX
        let limit = match query.limit {
            0 => -1,
            n => i64::try_from(n).unwrap_or(i64::MAX),
        };
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        page.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let (total, rows) = ctx
            .run("projection.list_movements", async {
                let total: i64 = count.build().fetch_one(&self.pool).await?.try_get("total")?;
                let rows = page.build().fetch_all(&self.pool).await?;
                Ok((total, rows))
            })
            .await?;

        let movements = rows
            .iter()
            .map(Self::decode_movement)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((movements, usize::try_from(total).unwrap_or_default()))
    }

    async fn list_categories(&self, ctx: &CallContext) -> DomainResult<Vec<CategoryProjection>> {
        let rows = ctx
            .run("projection.list_categories", async {
                Ok(sqlx::query(&format!(
                    "{CATEGORY_COLUMNS} WHERE deleted = 0 ORDER BY name ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?)
            })
            .await?;

        rows.iter().map(Self::decode_category).collect()
    }

    async fn get_movement(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<MovementProjection>> {
        let row = ctx
            .run("projection.get_movement", async {
                Ok(sqlx::query(&format!("{MOVEMENT_COLUMNS} WHERE id = ? AND deleted = 0"))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?)
            })
            .await?;

        row.as_ref().map(Self::decode_movement).transpose()
    }

    async fn get_category(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> DomainResult<Option<CategoryProjection>> {
        self.fetch_category(ctx, "projection.get_category", id, false)
            .await
    }

    async fn clear(&self, ctx: &CallContext) -> DomainResult<()> {
        ctx.run("projection.clear", async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM movements").execute(&mut *tx).await?;
            sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}
