use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identifier::file_extension;
use super::lifecycle::{Registration, ResourceKind};
use super::metadata::Metadata;

/// Media file attachment as submitted in a bulk registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaFile {
    pub uid: Option<String>,
    pub file_name: Option<String>,
    /// Ignored on registration; recomputed from `file_name`.
    pub file_ext: Option<String>,
    pub metadata: Option<Metadata>,
    pub created: Option<i64>,
}

impl MediaFile {
    /// Builds the ledger registration. The extension is always derived from the file name.
    pub fn to_registration(&self) -> Result<Registration, serde_json::Error> {
        let metadata = self
            .metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        Ok(Registration {
            uid: self.uid.clone().unwrap_or_default(),
            kind: ResourceKind::MediaFile,
            file_name: self.file_name.clone(),
            file_ext: self.file_name.as_deref().map(file_extension),
            metadata,
            client_created: self.created,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct FormMediaFileRegister {
    pub attachments: Vec<MediaFile>,
}

/// `GET /files/{name}/info` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

/// `GET /media/{uid}/info` response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaFileInfo {
    pub uid: String,
    pub size: u64,
}
