use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use validator::ValidateEmail;

use super::{FieldError, FieldErrors, PayloadValidator};
use crate::constants::{CELLS_PATTERN, DEFAULT_ALLOWED_FILE_EXTENSIONS};
use crate::models::{is_uuid, MediaFile, Metadata, ReportPayload};

/// A named predicate over one string field.
pub type Rule = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Rule-table validator.
///
/// Built-in rules: `uuid`, `file` (`<uuid>.<ext>`), `file_ext` (`.<ext>`), `cells` and
/// `email`. Empty values always pass; presence is checked separately.
pub struct RuleValidator {
    rules: HashMap<&'static str, Rule>,
}

impl RuleValidator {
    pub fn new<S: AsRef<str>>(allowed_extensions: &[S]) -> Result<Self, regex::Error> {
        let extensions: Arc<Vec<String>> = Arc::new(
            allowed_extensions
                .iter()
                .map(|ext| ext.as_ref().to_lowercase())
                .collect(),
        );
        let cells = Regex::new(CELLS_PATTERN)?;

        let mut rules: HashMap<&'static str, Rule> = HashMap::new();
        rules.insert("uuid", Box::new(|value: &str| is_uuid(value)));

        let exts = Arc::clone(&extensions);
        rules.insert(
            "file",
            Box::new(move |value: &str| {
                let parts: Vec<&str> = value.split('.').collect();
                parts.len() == 2
                    && is_uuid(parts[0])
                    && is_allowed(&exts, parts[1])
            }),
        );

        let exts = Arc::clone(&extensions);
        rules.insert(
            "file_ext",
            Box::new(move |value: &str| {
                value.len() >= 2 && value.starts_with('.') && is_allowed(&exts, &value[1..])
            }),
        );

        rules.insert("cells", Box::new(move |value: &str| cells.is_match(value)));
        rules.insert("email", Box::new(|value: &str| value.to_string().validate_email()));

        Ok(Self { rules })
    }

    pub fn with_default_extensions() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_ALLOWED_FILE_EXTENSIONS)
    }

    /// Adds or replaces a rule.
    pub fn with_rule(mut self, name: &'static str, rule: Rule) -> Self {
        self.rules.insert(name, rule);
        self
    }

    /// Whether `value` satisfies the named rule. Unknown rules never pass.
    pub fn check(&self, rule: &str, value: &str) -> bool {
        if value.is_empty() {
            return true;
        }
        self.rules.get(rule).is_some_and(|predicate| predicate(value))
    }

    fn apply(&self, errors: &mut FieldErrors, field: &str, rule: &'static str, value: Option<&str>) {
        if let Some(value) = value {
            if !self.check(rule, value) {
                errors.push(FieldError::new(field, rule, rule_message(rule)));
            }
        }
    }
}

fn is_allowed(extensions: &[String], ext: &str) -> bool {
    let ext = ext.to_lowercase();
    extensions.iter().any(|allowed| *allowed == ext)
}

fn rule_message(rule: &str) -> &'static str {
    match rule {
        "uuid" => "must be a UUID",
        "file" => "must be <uuid>.<ext> with an allowed extension",
        "file_ext" => "must be an allowed extension with a leading dot",
        "cells" => "contains characters not allowed in a cell descriptor",
        "email" => "must be an email address",
        _ => "is invalid",
    }
}

fn required(field: &str) -> FieldError {
    FieldError::new(field, "required", "is required")
}

impl PayloadValidator for RuleValidator {
    fn validate_report(&self, report: &ReportPayload) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        self.apply(&mut errors, "uid", "uuid", report.uid.as_deref());

        match &report.evidences {
            None => errors.push(required("evidences")),
            Some(evidences) => {
                for (i, evidence) in evidences.iter().enumerate() {
                    let prefix = format!("evidences[{}]", i);
                    if evidence.resource_id().is_none() {
                        errors.push(required(&format!("{}.name", prefix)));
                    }
                    self.apply(
                        &mut errors,
                        &format!("{}.uid", prefix),
                        "uuid",
                        evidence.uid.as_deref(),
                    );
                    self.apply(
                        &mut errors,
                        &format!("{}.name", prefix),
                        "uuid",
                        evidence.name.as_deref(),
                    );
                    self.apply(
                        &mut errors,
                        &format!("{}.path", prefix),
                        "file",
                        evidence.path.as_deref(),
                    );
                    if let Some(metadata) = &evidence.metadata {
                        if let Err(nested) = self.validate_metadata(metadata) {
                            errors.extend_nested(&format!("{}.metadata", prefix), nested);
                        }
                    }
                }
            }
        }

        match &report.recipients {
            None => errors.push(required("recipients")),
            Some(recipients) => {
                for (i, recipient) in recipients.iter().enumerate() {
                    self.apply(
                        &mut errors,
                        &format!("recipients[{}].email", i),
                        "email",
                        recipient.email.as_deref(),
                    );
                }
            }
        }

        errors.into_result()
    }

    fn validate_metadata(&self, metadata: &Metadata) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        for (i, cell) in metadata.cells.iter().enumerate() {
            self.apply(&mut errors, &format!("cells[{}]", i), "cells", Some(cell));
        }
        errors.into_result()
    }

    fn validate_media_file(&self, media_file: &MediaFile) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        match media_file.uid.as_deref() {
            None | Some("") => errors.push(required("uid")),
            uid => self.apply(&mut errors, "uid", "uuid", uid),
        }
        self.apply(&mut errors, "fileName", "file", media_file.file_name.as_deref());
        self.apply(&mut errors, "fileExt", "file_ext", media_file.file_ext.as_deref());

        if let Some(metadata) = &media_file.metadata {
            if let Err(nested) = self.validate_metadata(metadata) {
                errors.extend_nested("metadata", nested);
            }
        }

        errors.into_result()
    }
}
