//! In-memory ledger and report store
//!
//! Mirrors the PostgreSQL repositories closely enough for handler and service tests:
//! conditional transitions, insert-if-absent registration, staged transactional writes
//! and association state joined from the ledger on read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use whistler_core::models::{
    EvidenceAssociation, LifecycleRecord, LifecycleState, Lookup, Registration, Report,
    ResourceKind, StoredReport,
};
use whistler_core::AppError;

use super::ledger::LifecycleLedger;
use super::reports::{creation_order, ReportStore, ReportTransaction};

#[derive(Default)]
struct MemoryState {
    records: HashMap<(ResourceKind, String), LifecycleRecord>,
    reports: Vec<StoredReport>,
    next_report_id: i64,
    /// 1-based index of the association insert that fails within a transaction.
    fail_association_at: Option<usize>,
}

impl MemoryState {
    fn insert_pending(&mut self, kind: ResourceKind, uid: &str, file_ext: &str) {
        self.records
            .entry((kind, uid.to_string()))
            .or_insert_with(|| LifecycleRecord {
                uid: uid.to_string(),
                kind,
                state: LifecycleState::Pending,
                file_ext: Some(file_ext.to_string()),
                metadata: None,
                created: Some(Utc::now().timestamp()),
                updated_at: None,
            });
    }

    fn ledger_state(&self, kind: ResourceKind, uid: &str) -> Option<LifecycleState> {
        self.records
            .get(&(kind, uid.to_string()))
            .map(|record| record.state)
    }
}

/// Shared in-memory store implementing both [`LifecycleLedger`] and [`ReportStore`].
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes the `n`-th association insert of every subsequent transaction fail.
    pub fn fail_association_insert_at(&self, n: usize) {
        self.lock().fail_association_at = Some(n);
    }

    pub fn report_count(&self) -> usize {
        self.lock().reports.len()
    }

    /// Number of committed associations referencing `uid` across all reports.
    pub fn association_count(&self, uid: &str) -> usize {
        self.lock()
            .reports
            .iter()
            .flat_map(|report| report.evidences.iter())
            .filter(|association| association.uid == uid)
            .count()
    }

    pub fn record_count(&self, kind: ResourceKind) -> usize {
        self.lock()
            .records
            .keys()
            .filter(|(record_kind, _)| *record_kind == kind)
            .count()
    }
}

#[async_trait]
impl LifecycleLedger for InMemoryStore {
    async fn get(&self, kind: ResourceKind, uid: &str) -> Result<Lookup<LifecycleRecord>, AppError> {
        Ok(self.lock().records.get(&(kind, uid.to_string())).cloned().into())
    }

    async fn register(&self, registration: &Registration) -> Result<(), AppError> {
        let mut state = self.lock();
        let key = (registration.kind, registration.uid.clone());

        match state.records.get_mut(&key) {
            Some(existing) => existing.updated_at = Some(Utc::now()),
            None => {
                let created = match registration.kind {
                    ResourceKind::Evidence => Some(Utc::now().timestamp()),
                    ResourceKind::MediaFile => registration.client_created,
                };
                state.records.insert(
                    key,
                    LifecycleRecord {
                        uid: registration.uid.clone(),
                        kind: registration.kind,
                        state: LifecycleState::Pending,
                        file_ext: Some(registration.file_ext.clone().unwrap_or_default()),
                        metadata: registration.metadata.clone(),
                        created,
                        updated_at: None,
                    },
                );
            }
        }

        Ok(())
    }

    async fn transition_to_uploaded(&self, kind: ResourceKind, uid: &str) -> Result<u64, AppError> {
        let mut state = self.lock();

        let Some(record) = state.records.get_mut(&(kind, uid.to_string())) else {
            return Ok(0);
        };
        if record.state.is_terminal() {
            return Ok(0);
        }
        record.state = LifecycleState::Uploaded;
        record.updated_at = Some(Utc::now());

        if kind == ResourceKind::Evidence {
            for association in state
                .reports
                .iter_mut()
                .flat_map(|report| report.evidences.iter_mut())
                .filter(|association| association.uid == uid)
            {
                association.state = LifecycleState::Uploaded;
            }
        }

        Ok(1)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl ReportStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn ReportTransaction>, AppError> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            report: None,
            new_records: Vec::new(),
            association_inserts: 0,
        }))
    }

    async fn get_report(&self, uid: &str) -> Result<Lookup<StoredReport>, AppError> {
        let state = self.lock();
        let report = state.reports.iter().find(|report| report.uid == uid).cloned();

        Ok(report
            .map(|mut report| {
                for association in report.evidences.iter_mut() {
                    if let Some(live) = state.ledger_state(ResourceKind::Evidence, &association.uid)
                    {
                        association.state = live;
                    }
                }
                report
            })
            .into())
    }
}

/// Writes are staged here and only become visible on commit.
struct InMemoryTransaction {
    store: InMemoryStore,
    report: Option<StoredReport>,
    new_records: Vec<(String, String)>,
    association_inserts: usize,
}

#[async_trait]
impl ReportTransaction for InMemoryTransaction {
    async fn insert_report(&mut self, report: &Report) -> Result<i64, AppError> {
        let mut state = self.store.lock();
        if state.reports.iter().any(|existing| existing.uid == report.uid) {
            return Err(AppError::Internal(format!(
                "duplicate report uid {}",
                report.uid
            )));
        }
        state.next_report_id += 1;
        let id = state.next_report_id;

        self.report = Some(StoredReport {
            id,
            uid: report.uid.clone(),
            created: report.created,
            public: report.public,
            status: report.status,
            raw: report.raw.clone(),
            evidences: Vec::new(),
        });

        Ok(id)
    }

    async fn evidence_state(&mut self, uid: &str) -> Result<Lookup<LifecycleState>, AppError> {
        if self.new_records.iter().any(|(staged, _)| staged == uid) {
            return Ok(Lookup::Found(LifecycleState::Pending));
        }
        Ok(self
            .store
            .lock()
            .ledger_state(ResourceKind::Evidence, uid)
            .into())
    }

    async fn ensure_evidence_records(
        &mut self,
        associations: &[EvidenceAssociation],
    ) -> Result<(), AppError> {
        for (uid, file_ext) in creation_order(associations) {
            let exists = self
                .store
                .lock()
                .ledger_state(ResourceKind::Evidence, uid)
                .is_some();
            if !exists && !self.new_records.iter().any(|(staged, _)| staged == uid) {
                self.new_records.push((uid.to_string(), file_ext.to_string()));
            }
        }
        Ok(())
    }

    async fn insert_association(
        &mut self,
        report_id: i64,
        association: &EvidenceAssociation,
    ) -> Result<bool, AppError> {
        self.association_inserts += 1;
        if self.store.lock().fail_association_at == Some(self.association_inserts) {
            return Err(AppError::Internal("injected association failure".to_string()));
        }

        let report = match self.report.as_mut() {
            Some(report) if report.id == report_id => report,
            _ => {
                return Err(AppError::Internal(format!(
                    "report {} is not part of this transaction",
                    report_id
                )))
            }
        };

        if report.evidences.iter().any(|existing| existing.uid == association.uid) {
            return Ok(false);
        }
        report.evidences.push(association.clone());
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let this = *self;
        let mut state = this.store.lock();

        for (uid, file_ext) in &this.new_records {
            state.insert_pending(ResourceKind::Evidence, uid, file_ext);
        }
        if let Some(report) = this.report {
            state.reports.push(report);
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}
