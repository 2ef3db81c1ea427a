use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use super::identifier::file_extension;
use super::lifecycle::{LifecycleState, ResourceKind};
use super::metadata::Metadata;

/// Moderation status of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn code(self) -> i16 {
        u8::from(self) as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        u8::try_from(code).ok().and_then(|c| Self::try_from(c).ok())
    }
}

impl From<ReviewStatus> for u8 {
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Unreviewed => 0,
            ReviewStatus::Approved => 1,
            ReviewStatus::Rejected => 2,
        }
    }
}

impl TryFrom<u8> for ReviewStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReviewStatus::Unreviewed),
            1 => Ok(ReviewStatus::Approved),
            2 => Ok(ReviewStatus::Rejected),
            other => Err(format!("unknown review status {}", other)),
        }
    }
}

/// Evidence item as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Evidence {
    pub uid: Option<String>,
    /// Identifier of the uploaded file; the bytes arrive separately under this name.
    pub name: Option<String>,
    pub path: Option<String>,
    pub metadata: Option<Metadata>,
}

impl Evidence {
    /// Identifier the evidence bytes are stored under. `name` wins over `uid`.
    pub fn resource_id(&self) -> Option<&str> {
        [self.name.as_deref(), self.uid.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Recipient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Report body as decoded from `POST /rest/v1/reports`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportPayload {
    pub uid: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub contact_information: Option<String>,
    pub date: Option<i64>,
    pub public: Option<bool>,
    #[schema(value_type = Option<u8>)]
    pub status: Option<ReviewStatus>,
    /// Required, may be empty.
    pub evidences: Option<Vec<Evidence>>,
    /// Required, may be empty.
    pub recipients: Option<Vec<Recipient>>,
}

/// Link between a report and one evidence identifier, with the state observed for it.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceAssociation {
    pub uid: String,
    pub file_ext: String,
    #[serde(serialize_with = "serialize_evidence_state")]
    #[schema(value_type = i16)]
    pub state: LifecycleState,
}

impl EvidenceAssociation {
    pub fn pending(uid: impl Into<String>, file_ext: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            file_ext: file_ext.into(),
            state: LifecycleState::Pending,
        }
    }
}

fn serialize_evidence_state<S: Serializer>(
    state: &LifecycleState,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i16(state.code(ResourceKind::Evidence))
}

/// Normalized report, ready to be written and echoed back to the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    pub created: i64,
    pub public: bool,
    #[schema(value_type = u8)]
    pub status: ReviewStatus,
    /// Request body exactly as received.
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub evidences: Vec<EvidenceAssociation>,
    pub recipients: Vec<Recipient>,
}

impl Report {
    /// Applies the server-side defaults to a validated payload.
    ///
    /// Private reports always start unreviewed, whatever status the client sent.
    /// Evidence associations start out pending until resolved against the ledger.
    pub fn normalize(payload: ReportPayload, raw: Vec<u8>, uid: String, created: i64) -> Self {
        let public = payload.public.unwrap_or(true);
        let status = if public {
            payload.status.unwrap_or_default()
        } else {
            ReviewStatus::Unreviewed
        };

        let evidences = payload
            .evidences
            .unwrap_or_default()
            .iter()
            .filter_map(|evidence| {
                let ext = evidence.path.as_deref().map(file_extension).unwrap_or_default();
                evidence
                    .resource_id()
                    .map(|id| EvidenceAssociation::pending(id, ext))
            })
            .collect();

        Self {
            uid,
            title: payload.title,
            location: payload.location,
            contact_information: payload.contact_information,
            date: payload.date,
            created,
            public,
            status,
            raw,
            evidences,
            recipients: payload.recipients.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportResponse {
    pub data: Report,
}

/// A report as read back from storage, with each association's state joined from the ledger.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: i64,
    pub uid: String,
    pub created: i64,
    pub public: bool,
    pub status: ReviewStatus,
    pub raw: Vec<u8>,
    pub evidences: Vec<EvidenceAssociation>,
}
