//! PostgreSQL + pgvector storage, one table per modality.
//!
//! Raw `sqlx::query` calls, `pgvector::Vector::from` for binding, the
//! `<=>` cosine-distance operator for both ordering and scoring.

use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::{PgPool, Row};

use crate::error::VectorError;
use crate::modality::VectorModality;

#[derive(Debug, Clone)]
pub struct VectorRow {
    pub subject_id: String,
    pub score: f64,
}

pub struct VectorRepository {
    pool: PgPool,
}

impl VectorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert or replace the vector for `(subject_id, modality)`.
    pub async fn upsert(
        &self,
        modality: &VectorModality,
        subject_id: &str,
        vector: Vec<f32>,
        model_version: &str,
    ) -> Result<(), VectorError> {
        let table = modality.table_name();
        let embedding = Vector::from(vector);
        let sql = format!(
            "INSERT INTO {table} (subject_id, embedding, model_version, updated_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (subject_id) DO UPDATE \
             SET embedding = EXCLUDED.embedding, model_version = EXCLUDED.model_version, updated_at = now()"
        );
        sqlx::query(&sql)
            .bind(subject_id)
            .bind(&embedding)
            .bind(model_version)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The raw vector stored for `subject_id`, if any.
    pub async fn get_vector(
        &self,
        modality: &VectorModality,
        subject_id: &str,
    ) -> Result<Option<Vec<f32>>, VectorError> {
        let table = modality.table_name();
        let sql = format!("SELECT embedding FROM {table} WHERE subject_id = $1");
        let row = sqlx::query(&sql).bind(subject_id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| {
            let v: Vector = r.get("embedding");
            v.to_vec()
        }))
    }

    pub async fn has_vector(&self, modality: &VectorModality, subject_id: &str) -> Result<bool, VectorError> {
        Ok(self.get_vector(modality, subject_id).await?.is_some())
    }

    /// Nearest neighbors by cosine similarity, excluding `subject_id`
    /// itself. Defined only when `subject_id` has a vector in this
    /// modality; returns an empty list otherwise.
    pub async fn nearest(
        &self,
        modality: &VectorModality,
        subject_id: &str,
        k: i64,
    ) -> Result<Vec<VectorRow>, VectorError> {
        let Some(query_vector) = self.get_vector(modality, subject_id).await? else {
            return Ok(Vec::new());
        };
        let table = modality.table_name();
        let embedding = Vector::from(query_vector);
        let sql = format!(
            "SELECT subject_id, 1.0 - (embedding <=> $1::vector) as score \
             FROM {table} WHERE subject_id <> $2 \
             ORDER BY embedding <=> $1::vector LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(&embedding)
            .bind(subject_id)
            .bind(k)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| VectorRow { subject_id: r.get("subject_id"), score: r.get("score") })
            .collect())
    }

    /// Uniform sample of subjects that have a vector in this modality,
    /// used as the `discovery` fallback when a query has no vectors at
    /// all in any weighted modality.
    pub async fn discovery_sample(&self, modality: &VectorModality, limit: i64) -> Result<Vec<String>, VectorError> {
        let table = modality.table_name();
        let sql = format!("SELECT subject_id FROM {table} ORDER BY random() LIMIT $1");
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| r.get("subject_id")).collect())
    }

    pub async fn last_updated(&self, modality: &VectorModality, subject_id: &str) -> Result<Option<DateTime<Utc>>, VectorError> {
        let table = modality.table_name();
        let sql = format!("SELECT updated_at FROM {table} WHERE subject_id = $1");
        let row = sqlx::query(&sql).bind(subject_id).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| r.get("updated_at")))
    }
}
