//! Bulk media file registration

use std::sync::Arc;

use whistler_core::models::FormMediaFileRegister;
use whistler_core::{AppError, PayloadValidator};
use whistler_db::LifecycleLedger;

#[derive(Clone)]
pub struct MediaRegistration {
    ledger: Arc<dyn LifecycleLedger>,
    validator: Arc<dyn PayloadValidator>,
}

impl MediaRegistration {
    pub fn new(ledger: Arc<dyn LifecycleLedger>, validator: Arc<dyn PayloadValidator>) -> Self {
        Self { ledger, validator }
    }

    /// Registers every attachment as a pending media file.
    ///
    /// The whole form is validated first; re-registering a known identifier only touches its
    /// `updated` timestamp. Returns the number of attachments processed.
    pub async fn register(&self, body: &[u8]) -> Result<usize, AppError> {
        let form: FormMediaFileRegister = serde_json::from_slice(body)?;
        self.validator.validate_registration(&form)?;

        for attachment in &form.attachments {
            let registration = attachment.to_registration()?;
            self.ledger.register(&registration).await?;
        }

        tracing::info!(
            attachment_count = form.attachments.len(),
            "Media files registered"
        );

        Ok(form.attachments.len())
    }
}
