//! SQLite 事件日志
//!
//! - 每次追加在单个事务内完成，插入阶段被取消或超时会丢弃事务（回滚），
//!   提交本身不会被中断；
//! - `load` 按自增序号返回，保证流内追加顺序；
//! - `query_all` 按 (发生时间, 序号) 排序，可能与追加顺序不同。
//!
use crate::{
    context::CallContext,
    domain_event::{AggregateType, DomainEvent, Payload},
    error::DomainResult,
    persist::{EventStore, StoredEvent, serialize_events},
    sqlite::{decode_timestamp, encode_timestamp},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT NOT NULL UNIQUE,
        aggregate_id TEXT NOT NULL,
        aggregate_type TEXT NOT NULL,
        event_type TEXT NOT NULL,
        payload TEXT NOT NULL,
        occurred_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_aggregate_id ON events (aggregate_id)",
    "CREATE INDEX IF NOT EXISTS idx_events_occurred_at ON events (occurred_at)",
];

const SELECT_COLUMNS: &str =
    "SELECT event_id, aggregate_id, aggregate_type, event_type, payload, occurred_at FROM events";

#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// 绑定连接池并确保表结构存在
    pub async fn new(pool: SqlitePool) -> DomainResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    fn decode_row(row: &SqliteRow) -> DomainResult<StoredEvent> {
        let payload: String = row.try_get("payload")?;
        let payload: Payload = serde_json::from_str(&payload)?;
        let occurred_at: String = row.try_get("occurred_at")?;

        Ok(StoredEvent::builder()
            .event_id(row.try_get::<String, _>("event_id")?)
            .aggregate_id(row.try_get("aggregate_id")?)
            .aggregate_type(row.try_get("aggregate_type")?)
            .event_type(row.try_get("event_type")?)
            .payload(payload)
            .occurred_at(decode_timestamp(&occurred_at)?)
            .build())
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append(
        &self,
        ctx: &CallContext,
        aggregate_id: &str,
        aggregate_type: AggregateType,
        events: &[DomainEvent],
    ) -> DomainResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let records = serialize_events(aggregate_id, aggregate_type, events)?
            .into_iter()
            .map(|record| {
                let payload = serde_json::to_string(record.payload())?;
                Ok((record, payload))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        // 只有插入阶段参与取消/超时竞争；被中断时事务随 drop 回滚
        let tx = ctx
            .run("event_store.append", async {
                let mut tx = self.pool.begin().await?;
                for (record, payload) in &records {
                    sqlx::query(
                        "INSERT INTO events (event_id, aggregate_id, aggregate_type, event_type, payload, occurred_at)
                         VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(uuid::Uuid::new_v4().to_string())
                    .bind(record.aggregate_id())
                    .bind(record.aggregate_type())
                    .bind(record.event_type())
                    .bind(payload)
                    .bind(encode_timestamp(record.occurred_at()))
                    .execute(&mut *tx)
                    .await?;
                }
                Ok(tx)
            })
            .await?;

        // 提交不参与竞争：返回值必须与实际写入一致
        ctx.check("event_store.append")?;
        tx.commit().await?;

        tracing::debug!(
            aggregate_id,
            aggregate_type = %aggregate_type,
            count = events.len(),
            "events appended"
        );
        Ok(())
    }

    async fn load(&self, ctx: &CallContext, aggregate_id: &str) -> DomainResult<Vec<StoredEvent>> {
        let rows = ctx
            .run("event_store.load", async {
                let rows = sqlx::query(&format!(
                    "{SELECT_COLUMNS} WHERE aggregate_id = ? ORDER BY seq ASC"
                ))
                .bind(aggregate_id)
                .fetch_all(&self.pool)
                .await?;
                Ok(rows)
            })
            .await?;

        rows.iter().map(Self::decode_row).collect()
    }

    async fn query_all(
        &self,
        ctx: &CallContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<StoredEvent>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");
        if let Some(start) = start {
            builder
                .push(" AND occurred_at >= ")
                .push_bind(encode_timestamp(start));
        }
        if let Some(end) = end {
            builder
                .push(" AND occurred_at <= ")
                .push_bind(encode_timestamp(end));
        }
        builder.push(" ORDER BY occurred_at ASC, seq ASC");

        let rows = ctx
            .run("event_store.query_all", async {
                Ok(builder.build().fetch_all(&self.pool).await?)
            })
            .await?;

        rows.iter().map(Self::decode_row).collect()
    }
}
