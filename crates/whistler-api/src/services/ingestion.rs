//! Transactional report ingestion
//!
//! decode → validate → normalize → insert report → create evidence records → resolve states → commit.
//! Nothing touches the database before the payload has been validated, and every write
//! after that happens in one transaction.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use whistler_core::models::{EvidenceAssociation, LifecycleState, Lookup, Report, ReportPayload};
use whistler_core::{AppError, PayloadValidator};
use whistler_db::{ReportStore, ReportTransaction};

#[derive(Clone)]
pub struct ReportIngestion {
    reports: Arc<dyn ReportStore>,
    validator: Arc<dyn PayloadValidator>,
}

impl ReportIngestion {
    pub fn new(reports: Arc<dyn ReportStore>, validator: Arc<dyn PayloadValidator>) -> Self {
        Self { reports, validator }
    }

    /// Creates a report and its evidence associations from a raw request body.
    ///
    /// The body is stored verbatim next to the normalized columns.
    pub async fn create_report(&self, body: &[u8]) -> Result<Report, AppError> {
        let payload: ReportPayload = serde_json::from_slice(body)?;
        self.validator.validate_report(&payload)?;

        let mut report = Report::normalize(
            payload,
            body.to_vec(),
            Uuid::new_v4().to_string(),
            Utc::now().timestamp(),
        );

        let mut tx = self.reports.begin().await?;
        let written = write_report(tx.as_mut(), &mut report).await;
        match written {
            Ok(()) => tx.commit().await?,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        report_uid = %report.uid,
                        error = %rollback_err,
                        "Report rollback failed"
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            report_uid = %report.uid,
            evidence_count = report.evidences.len(),
            public = report.public,
            "Report created"
        );

        Ok(report)
    }
}

async fn write_report(tx: &mut dyn ReportTransaction, report: &mut Report) -> Result<(), AppError> {
    let report_id = tx.insert_report(report).await?;
    tx.ensure_evidence_records(&report.evidences).await?;

    let mut recorded = Vec::with_capacity(report.evidences.len());
    for mut association in std::mem::take(&mut report.evidences) {
        association.state = resolve_evidence(tx, &association).await?;
        if tx.insert_association(report_id, &association).await? {
            recorded.push(association);
        }
    }
    report.evidences = recorded;

    Ok(())
}

/// Ledger state for an evidence identifier referenced by a new report.
///
/// Every identifier has a ledger record by now, either one that already existed or the
/// pending record this transaction created.
async fn resolve_evidence(
    tx: &mut dyn ReportTransaction,
    association: &EvidenceAssociation,
) -> Result<LifecycleState, AppError> {
    match tx.evidence_state(&association.uid).await? {
        Lookup::Found(state) => Ok(state),
        Lookup::NotFound => Err(AppError::Internal(format!(
            "evidence record {} missing after creation",
            association.uid
        ))),
    }
}
