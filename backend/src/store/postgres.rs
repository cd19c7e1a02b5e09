use std::time::Duration;

use async_trait::async_trait;
use santa_core::AssignmentDocument;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{DocumentStore, StoreError};

const DOCUMENT_ID: i32 = 1;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS santa_game (
    id INT PRIMARY KEY,
    data JSONB
)";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(&self) -> Result<Option<AssignmentDocument>, StoreError> {
        let row = sqlx::query("SELECT data FROM santa_game WHERE id = $1")
            .bind(DOCUMENT_ID)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data: Option<Json<AssignmentDocument>> = row.try_get("data")?;
        Ok(data.map(|Json(document)| document))
    }

    async fn create_if_absent(&self, document: &AssignmentDocument) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO santa_game (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(DOCUMENT_ID)
        .bind(Json(document.clone()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    // Upsert so a missing row is recreated instead of the update matching nothing.
    async fn save(&self, document: &AssignmentDocument) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO santa_game (id, data) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(DOCUMENT_ID)
        .bind(Json(document.clone()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
