use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use whistler_core::models::{
    FinalizeOutcome, LifecycleRecord, LifecycleState, Lookup, Registration, ResourceKind,
};
use whistler_core::AppError;

/// Persisted upload state per resource identifier.
///
/// Storage failures are always reported through `Err`; a missing record is `Lookup::NotFound`.
#[async_trait]
pub trait LifecycleLedger: Send + Sync {
    async fn get(&self, kind: ResourceKind, uid: &str) -> Result<Lookup<LifecycleRecord>, AppError>;

    /// Creates a pending record, or only touches `updated` when one already exists.
    async fn register(&self, registration: &Registration) -> Result<(), AppError>;

    /// Conditional `PENDING -> UPLOADED`. Returns the number of records that changed state.
    async fn transition_to_uploaded(&self, kind: ResourceKind, uid: &str) -> Result<u64, AppError>;

    /// Cheap connectivity check used by the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;

    async fn finalize(&self, kind: ResourceKind, uid: &str) -> Result<FinalizeOutcome, AppError> {
        if self.transition_to_uploaded(kind, uid).await? > 0 {
            return Ok(FinalizeOutcome::Finalized);
        }

        Ok(match self.get(kind, uid).await? {
            Lookup::Found(_) => FinalizeOutcome::AlreadyFinalized,
            Lookup::NotFound => FinalizeOutcome::NotFound,
        })
    }

    /// Advisory: the record exists and still accepts bytes. Finalization may race with it.
    async fn is_uploadable(&self, kind: ResourceKind, uid: &str) -> Result<bool, AppError> {
        Ok(match self.get(kind, uid).await? {
            Lookup::Found(record) => record.is_uploadable(),
            Lookup::NotFound => false,
        })
    }
}

/// Repository for the `evidence_file` and `media_file` ledgers
#[derive(Clone)]
pub struct PgLifecycleLedger {
    pool: PgPool,
}

impl PgLifecycleLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn record_from_row(kind: ResourceKind, row: &PgRow) -> Result<LifecycleRecord, AppError> {
    let code: i16 = row.try_get("state")?;
    let state = LifecycleState::from_code(kind, code).ok_or_else(|| {
        AppError::Internal(format!("unknown {} state code {}", kind.as_str(), code))
    })?;

    Ok(LifecycleRecord {
        uid: row.try_get("uid")?,
        kind,
        state,
        file_ext: row.try_get("file_ext")?,
        metadata: row.try_get("metadata")?,
        created: row.try_get("created")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated")?,
    })
}

#[async_trait]
impl LifecycleLedger for PgLifecycleLedger {
    #[tracing::instrument(skip(self), fields(db.table = kind.as_str(), db.operation = "select", db.record_id = %uid))]
    async fn get(&self, kind: ResourceKind, uid: &str) -> Result<Lookup<LifecycleRecord>, AppError> {
        let query = match kind {
            ResourceKind::Evidence => {
                r#"
                SELECT uid, file_ext, NULL::JSONB AS metadata, state, created, updated
                FROM evidence_file
                WHERE uid = $1
                "#
            }
            ResourceKind::MediaFile => {
                r#"
                SELECT uid, file_ext, metadata, state, created, updated
                FROM media_file
                WHERE uid = $1
                "#
            }
        };

        let row = sqlx::query(query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Lookup::Found(record_from_row(kind, &row)?)),
            None => Ok(Lookup::NotFound),
        }
    }

    #[tracing::instrument(skip(self, registration), fields(db.table = registration.kind.as_str(), db.operation = "upsert", db.record_id = %registration.uid))]
    async fn register(&self, registration: &Registration) -> Result<(), AppError> {
        let pending = LifecycleState::Pending.code(registration.kind);
        let file_ext = registration.file_ext.clone().unwrap_or_default();

        match registration.kind {
            ResourceKind::Evidence => {
                sqlx::query(
                    r#"
                    INSERT INTO evidence_file (uid, file_ext, state)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (uid) DO UPDATE SET updated = NOW()
                    "#,
                )
                .bind(&registration.uid)
                .bind(file_ext)
                .bind(pending)
                .execute(&self.pool)
                .await?;
            }
            ResourceKind::MediaFile => {
                sqlx::query(
                    r#"
                    INSERT INTO media_file (uid, file_name, file_ext, metadata, state, created)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (uid) DO UPDATE SET updated = NOW()
                    "#,
                )
                .bind(&registration.uid)
                .bind(&registration.file_name)
                .bind(file_ext)
                .bind(&registration.metadata)
                .bind(pending)
                .bind(registration.client_created)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = kind.as_str(), db.operation = "update", db.record_id = %uid))]
    async fn transition_to_uploaded(&self, kind: ResourceKind, uid: &str) -> Result<u64, AppError> {
        let uploaded = LifecycleState::Uploaded.code(kind);

        match kind {
            ResourceKind::MediaFile => {
                let result = sqlx::query(
                    r#"
                    UPDATE media_file
                    SET state = $2, updated = NOW()
                    WHERE uid = $1 AND state <> $2
                    "#,
                )
                .bind(uid)
                .bind(uploaded)
                .execute(&self.pool)
                .await?;

                Ok(result.rows_affected())
            }
            ResourceKind::Evidence => {
                // Association snapshots follow the ledger in the same transaction.
                let mut tx = self.pool.begin().await?;

                let result = sqlx::query(
                    r#"
                    UPDATE evidence_file
                    SET state = $2, updated = NOW()
                    WHERE uid = $1 AND state <> $2
                    "#,
                )
                .bind(uid)
                .bind(uploaded)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() > 0 {
                    sqlx::query("UPDATE evidence SET state = $2 WHERE uid = $1")
                        .bind(uid)
                        .bind(uploaded)
                        .execute(&mut *tx)
                        .await?;
                }

                tx.commit().await?;
                Ok(result.rows_affected())
            }
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
