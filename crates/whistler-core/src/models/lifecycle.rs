use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Which ledger a resource identifier lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Evidence,
    MediaFile,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Evidence => "evidence",
            ResourceKind::MediaFile => "media_file",
        }
    }
}

/// Upload lifecycle state. Transitions only ever go `Pending -> Uploaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Pending,
    Uploaded,
}

impl LifecycleState {
    /// Persisted numeric code. Evidence and media files use disjoint code ranges
    /// because clients already depend on them.
    pub fn code(self, kind: ResourceKind) -> i16 {
        match (kind, self) {
            (ResourceKind::Evidence, LifecycleState::Pending) => 0,
            (ResourceKind::Evidence, LifecycleState::Uploaded) => 20,
            (ResourceKind::MediaFile, LifecycleState::Pending) => 10,
            (ResourceKind::MediaFile, LifecycleState::Uploaded) => 30,
        }
    }

    pub fn from_code(kind: ResourceKind, code: i16) -> Option<Self> {
        [LifecycleState::Pending, LifecycleState::Uploaded]
            .into_iter()
            .find(|state| state.code(kind) == code)
    }

    /// Terminal states accept no further bytes.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Uploaded)
    }
}

/// One ledger row: the single source of truth for an identifier's upload state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub uid: String,
    pub kind: ResourceKind,
    pub state: LifecycleState,
    pub file_ext: Option<String>,
    pub metadata: Option<JsonValue>,
    /// Unix seconds. Server time for evidence, client time for media files.
    pub created: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LifecycleRecord {
    pub fn is_uploadable(&self) -> bool {
        !self.state.is_terminal()
    }
}

/// Result of a keyed lookup. Storage failures travel on the `Err` side of the
/// surrounding `Result`, never through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// Outcome of the conditional `PENDING -> UPLOADED` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finalized,
    NotFound,
    AlreadyFinalized,
}

/// Insert-if-absent request for a ledger record.
#[derive(Debug, Clone)]
pub struct Registration {
    pub uid: String,
    pub kind: ResourceKind,
    pub file_name: Option<String>,
    pub file_ext: Option<String>,
    pub metadata: Option<JsonValue>,
    /// Client-side creation timestamp, stored verbatim for media files.
    pub client_created: Option<i64>,
}

impl Registration {
    pub fn evidence(uid: impl Into<String>, file_ext: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            kind: ResourceKind::Evidence,
            file_name: None,
            file_ext: Some(file_ext.into()),
            metadata: None,
            client_created: None,
        }
    }
}
