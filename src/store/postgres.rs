//! PostgreSQL document store (JSONB bodies in a single `documents` table)

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, FromRow, Pool, Postgres};
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Fields, Mutation};
use crate::error::AppResult;

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    body: Json<Value>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            body: row.body.0,
        }
    }
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find_by_id(&self, collection: Collection, id: Uuid) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn find_by_field(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> AppResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, body FROM documents
            WHERE collection = $1 AND body -> $2 = $3
            ORDER BY seq
            "#,
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_all(&self, collection: Collection) -> AppResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = $1 ORDER BY seq",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn insert(&self, collection: Collection, body: Value) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO documents (collection, id, body)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(collection.as_str())
        .bind(Uuid::new_v4())
        .bind(Json(body))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        mutation: &Mutation,
    ) -> AppResult<bool> {
        // `@>` on the expected fields: every field in this schema is a scalar
        // or a flat object, where containment is equality.
        let result = match mutation {
            Mutation::Set { fields, expect } => {
                sqlx::query(
                    r#"
                    UPDATE documents SET body = body || $3
                    WHERE collection = $1 AND id = $2 AND body @> $4
                    "#,
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(Json(fields))
                .bind(Json(expect))
                .execute(&self.pool)
                .await?
            }
            Mutation::Push { field, value } => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = jsonb_set(
                        body,
                        ARRAY[$3::text],
                        COALESCE(body -> $3, '[]'::jsonb) || jsonb_build_array($4::jsonb)
                    )
                    WHERE collection = $1 AND id = $2
                    "#,
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(field)
                .bind(Json(value))
                .execute(&self.pool)
                .await?
            }
            Mutation::Pull { field, value } => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET body = body #- ARRAY[$3::text, (
                        SELECT (e.pos - 1)::text
                        FROM jsonb_array_elements(body -> $3) WITH ORDINALITY AS e(elem, pos)
                        WHERE e.elem = $4::jsonb
                        ORDER BY e.pos
                        LIMIT 1
                    )]
                    WHERE collection = $1 AND id = $2
                      AND jsonb_typeof(body -> $3) = 'array'
                      AND EXISTS (
                          SELECT 1 FROM jsonb_array_elements(body -> $3) AS e(elem)
                          WHERE e.elem = $4::jsonb
                      )
                    "#,
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(field)
                .bind(Json(value))
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid, expect: &Fields) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 AND body @> $3",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(Json(expect))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
