//! Payload validation
//!
//! Validation is reached through the [`PayloadValidator`] trait so handlers never depend on
//! concrete rules. [`RuleValidator`] is the implementation used in production: a table of
//! named predicates applied field by field, collecting every failure instead of stopping at
//! the first one.

mod rules;

use std::fmt;

use crate::models::{FormMediaFileRegister, MediaFile, Metadata, ReportPayload};

pub use rules::{Rule, RuleValidator};

/// One field that failed one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the offending field, e.g. `evidences[2].path`.
    pub field: String,
    pub rule: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field-level failure found in one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    /// Appends `other`, prefixing each field path with `prefix`.
    pub fn extend_nested(&mut self, prefix: &str, other: FieldErrors) {
        self.0.extend(other.0.into_iter().map(|mut error| {
            error.field = format!("{}.{}", prefix, error.field);
            error
        }));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Validation capability used by the ingestion and registration paths.
pub trait PayloadValidator: Send + Sync {
    fn validate_report(&self, report: &ReportPayload) -> Result<(), FieldErrors>;

    fn validate_metadata(&self, metadata: &Metadata) -> Result<(), FieldErrors>;

    fn validate_media_file(&self, media_file: &MediaFile) -> Result<(), FieldErrors>;

    fn validate_registration(&self, form: &FormMediaFileRegister) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        for (i, attachment) in form.attachments.iter().enumerate() {
            if let Err(nested) = self.validate_media_file(attachment) {
                errors.extend_nested(&format!("attachments[{}]", i), nested);
            }
        }
        errors.into_result()
    }
}
