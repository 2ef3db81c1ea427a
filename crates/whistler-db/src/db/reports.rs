use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use whistler_core::models::{
    EvidenceAssociation, LifecycleState, Lookup, Report, ResourceKind, ReviewStatus, StoredReport,
};
use whistler_core::AppError;

/// Report persistence. Writes only happen through a [`ReportTransaction`].
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ReportTransaction>, AppError>;

    /// Reads a committed report with each association's state taken from the ledger.
    async fn get_report(&self, uid: &str) -> Result<Lookup<StoredReport>, AppError>;
}

/// One report ingestion unit of work. Dropping it without `commit` discards every write.
#[async_trait]
pub trait ReportTransaction: Send {
    /// Inserts the report row and returns its database id.
    async fn insert_report(&mut self, report: &Report) -> Result<i64, AppError>;

    /// Ledger state of an evidence identifier, locked against concurrent finalization
    /// until the transaction ends. Read after `ensure_evidence_records` so a record another
    /// report created and finalized in the meantime shows its real state.
    async fn evidence_state(&mut self, uid: &str) -> Result<Lookup<LifecycleState>, AppError>;

    /// Creates a pending evidence ledger record for every identifier that has none.
    ///
    /// Records are created in identifier order, whatever order the report lists them in,
    /// so concurrent reports sharing new identifiers wait on each other instead of deadlocking.
    async fn ensure_evidence_records(
        &mut self,
        associations: &[EvidenceAssociation],
    ) -> Result<(), AppError>;

    /// Returns `false` when the report already lists this identifier.
    async fn insert_association(
        &mut self,
        report_id: i64,
        association: &EvidenceAssociation,
    ) -> Result<bool, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Repository for the `report` and `evidence` tables
#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgReportTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Distinct `(uid, file_ext)` pairs sorted by uid. The first listed extension wins.
pub(crate) fn creation_order(associations: &[EvidenceAssociation]) -> Vec<(&str, &str)> {
    let mut ordered = BTreeMap::new();
    for association in associations {
        ordered
            .entry(association.uid.as_str())
            .or_insert(association.file_ext.as_str());
    }
    ordered.into_iter().collect()
}

fn evidence_state_from_code(code: i16) -> Result<LifecycleState, AppError> {
    LifecycleState::from_code(ResourceKind::Evidence, code)
        .ok_or_else(|| AppError::Internal(format!("unknown evidence state code {}", code)))
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn begin(&self) -> Result<Box<dyn ReportTransaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgReportTransaction { tx }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "report", db.operation = "select", db.record_id = %uid))]
    async fn get_report(&self, uid: &str) -> Result<Lookup<StoredReport>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, uid, created, public, status, json
            FROM report
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(Lookup::NotFound);
        };

        let id: i64 = row.try_get("id")?;
        let status_code: i16 = row.try_get("status")?;
        let status = ReviewStatus::from_code(status_code)
            .ok_or_else(|| AppError::Internal(format!("unknown review status {}", status_code)))?;

        let evidence_rows = sqlx::query(
            r#"
            SELECT e.uid, e.file_ext, COALESCE(f.state, e.state) AS state
            FROM evidence e
            LEFT JOIN evidence_file f ON f.uid = e.uid
            WHERE e.report_id = $1
            ORDER BY e.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let evidences = evidence_rows
            .iter()
            .map(|row| {
                Ok(EvidenceAssociation {
                    uid: row.try_get("uid")?,
                    file_ext: row.try_get("file_ext")?,
                    state: evidence_state_from_code(row.try_get("state")?)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Lookup::Found(StoredReport {
            id,
            uid: row.try_get("uid")?,
            created: row.try_get("created")?,
            public: row.try_get("public")?,
            status,
            raw: row.try_get("json")?,
            evidences,
        }))
    }
}

#[async_trait]
impl ReportTransaction for PgReportTransaction {
    #[tracing::instrument(skip(self, report), fields(db.table = "report", db.operation = "insert", db.record_id = %report.uid))]
    async fn insert_report(&mut self, report: &Report) -> Result<i64, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO report (uid, created, public, status, json)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&report.uid)
        .bind(report.created)
        .bind(report.public)
        .bind(report.status.code())
        .bind(&report.raw)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.try_get("id")?)
    }

    #[tracing::instrument(skip(self), fields(db.table = "evidence_file", db.operation = "select", db.record_id = %uid))]
    async fn evidence_state(&mut self, uid: &str) -> Result<Lookup<LifecycleState>, AppError> {
        let code: Option<i16> =
            sqlx::query_scalar("SELECT state FROM evidence_file WHERE uid = $1 FOR SHARE")
                .bind(uid)
                .fetch_optional(&mut *self.tx)
                .await?;

        match code {
            Some(code) => Ok(Lookup::Found(evidence_state_from_code(code)?)),
            None => Ok(Lookup::NotFound),
        }
    }

    #[tracing::instrument(skip(self, associations), fields(db.table = "evidence_file", db.operation = "insert", db.record_count = associations.len()))]
    async fn ensure_evidence_records(
        &mut self,
        associations: &[EvidenceAssociation],
    ) -> Result<(), AppError> {
        for (uid, file_ext) in creation_order(associations) {
            sqlx::query(
                r#"
                INSERT INTO evidence_file (uid, file_ext, state)
                VALUES ($1, $2, $3)
                ON CONFLICT (uid) DO NOTHING
                "#,
            )
            .bind(uid)
            .bind(file_ext)
            .bind(LifecycleState::Pending.code(ResourceKind::Evidence))
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, association), fields(db.table = "evidence", db.operation = "insert", db.record_id = %association.uid))]
    async fn insert_association(
        &mut self,
        report_id: i64,
        association: &EvidenceAssociation,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO evidence (report_id, uid, file_ext, state)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (report_id, uid) DO NOTHING
            "#,
        )
        .bind(report_id)
        .bind(&association.uid)
        .bind(&association.file_ext)
        .bind(association.state.code(ResourceKind::Evidence))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
