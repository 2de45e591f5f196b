use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::repo_types::AnalysisResult;

/// Keyed persistence for analysis results.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn put(&self, result: &AnalysisResult) -> anyhow::Result<()>;
    async fn get(&self, id: &str) -> anyhow::Result<Option<AnalysisResult>>;
    /// Id of the most recently stored result.
    async fn latest_id(&self) -> anyhow::Result<Option<String>>;
}

#[derive(Default)]
struct MemoryInner {
    by_id: HashMap<String, AnalysisResult>,
    latest: Option<String>,
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryAnalysisStore {
    inner: RwLock<MemoryInner>,
}

impl InMemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for InMemoryAnalysisStore {
    async fn put(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        inner.by_id.insert(result.id.clone(), result.clone());
        inner.latest = Some(result.id.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<AnalysisResult>> {
        Ok(self.inner.read().await.by_id.get(id).cloned())
    }

    async fn latest_id(&self) -> anyhow::Result<Option<String>> {
        Ok(self.inner.read().await.latest.clone())
    }
}

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: String,
    body: Json<Map<String, Value>>,
    created_at: OffsetDateTime,
}

impl From<AnalysisRow> for AnalysisResult {
    fn from(r: AnalysisRow) -> Self {
        Self {
            id: r.id,
            timestamp: r.created_at,
            body: r.body.0,
        }
    }
}

#[derive(Clone)]
pub struct PgAnalysisStore {
    db: PgPool,
}

impl PgAnalysisStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn put(&self, result: &AnalysisResult) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analyses (id, body, created_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&result.id)
        .bind(Json(&result.body))
        .bind(result.timestamp)
        .execute(&self.db)
        .await
        .with_context(|| format!("insert analysis {}", result.id))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<AnalysisResult>> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, body, created_at
              FROM analyses
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get analysis by id")?;
        Ok(row.map(AnalysisResult::from))
    }

    async fn latest_id(&self) -> anyhow::Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT id
              FROM analyses
             ORDER BY created_at DESC, id DESC
             LIMIT 1
            "#,
        )
        .fetch_optional(&self.db)
        .await
        .context("get latest analysis id")?;
        Ok(row.map(|(id,)| id))
    }
}
