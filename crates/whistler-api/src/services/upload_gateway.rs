//! Append-only upload gateway
//!
//! Shared by the evidence (`/files`) and media (`/media`) endpoints; the two only differ in
//! which ledger they consult. The ledger decides whether bytes are still accepted, the
//! resource store holds them.

use std::fmt::Display;
use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use whistler_core::models::{FinalizeOutcome, ResourceKind};
use whistler_core::{AppError, ResourceId};
use whistler_db::LifecycleLedger;
use whistler_storage::{ResourceStore, StorageError};

use crate::error::storage_error;

#[derive(Clone)]
pub struct UploadGateway {
    ledger: Arc<dyn LifecycleLedger>,
    store: Arc<dyn ResourceStore>,
}

impl UploadGateway {
    pub fn new(ledger: Arc<dyn LifecycleLedger>, store: Arc<dyn ResourceStore>) -> Self {
        Self { ledger, store }
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Appends the whole body to the resource and syncs it. Returns the bytes appended.
    ///
    /// Uploadability is checked once up front and again under the resource lock, so a
    /// concurrent `done` either lands before the append starts or after it is synced.
    /// If the body breaks off midway, whatever was appended stays; a retry appends after it.
    pub async fn upload<S, E>(
        &self,
        kind: ResourceKind,
        raw_id: &str,
        body: S,
        client_ip: &str,
    ) -> Result<u64, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display + Send,
    {
        let id = ResourceId::parse(raw_id)?;
        self.ensure_uploadable(kind, &id, client_ip).await?;

        let guard = self.store.lock(&id).await;
        self.ensure_uploadable(kind, &id, client_ip).await?;

        let mut writer = self.store.create_or_open(&guard).await.map_err(storage_error)?;

        let mut body = pin!(body);
        let mut written = 0u64;
        let mut read_error = None;
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    written += writer.append(&chunk).await.map_err(storage_error)? as u64;
                }
                Err(e) => {
                    read_error = Some(AppError::MalformedInput(format!(
                        "Failed to read upload body: {}",
                        e
                    )));
                    break;
                }
            }
        }

        writer.finalize_sync().await.map_err(storage_error)?;
        drop(guard);

        if let Some(err) = read_error {
            tracing::warn!(
                resource_kind = kind.as_str(),
                resource_id = %id,
                bytes_kept = written,
                "Upload body interrupted"
            );
            return Err(err);
        }

        tracing::debug!(
            resource_kind = kind.as_str(),
            resource_id = %id,
            bytes = written,
            "Upload appended"
        );

        Ok(written)
    }

    /// Current stored size of a registered resource; 0 when no bytes ever arrived.
    pub async fn info(&self, kind: ResourceKind, raw_id: &str) -> Result<(ResourceId, u64), AppError> {
        let id = ResourceId::parse(raw_id)?;

        if !self.ledger.get(kind, id.as_str()).await?.is_found() {
            return Err(AppError::NotFound(format!(
                "{} {} is not registered",
                kind.as_str(),
                id
            )));
        }

        let size = match self.store.stat(&id).await {
            Ok(size) => size,
            Err(StorageError::NotFound(_)) => 0,
            Err(e) => return Err(storage_error(e)),
        };

        Ok((id, size))
    }

    /// Moves a resource to its terminal state. Only the first call succeeds.
    pub async fn done(&self, kind: ResourceKind, raw_id: &str) -> Result<(), AppError> {
        let id = ResourceId::parse(raw_id)?;

        // Held so finalization cannot interleave with an in-flight append.
        let _guard = self.store.lock(&id).await;

        match self.ledger.finalize(kind, id.as_str()).await? {
            FinalizeOutcome::Finalized => {
                tracing::info!(resource_kind = kind.as_str(), resource_id = %id, "Upload finalized");
                Ok(())
            }
            FinalizeOutcome::NotFound => Err(AppError::NotFound(format!(
                "{} {} is not registered",
                kind.as_str(),
                id
            ))),
            FinalizeOutcome::AlreadyFinalized => Err(AppError::AlreadyFinalized(format!(
                "{} {} is already uploaded",
                kind.as_str(),
                id
            ))),
        }
    }

    async fn ensure_uploadable(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        client_ip: &str,
    ) -> Result<(), AppError> {
        if self.ledger.is_uploadable(kind, id.as_str()).await? {
            return Ok(());
        }

        tracing::warn!(
            client_ip = %client_ip,
            resource_kind = kind.as_str(),
            resource_id = %id,
            "Upload rejected: resource is not accepting bytes"
        );
        Err(AppError::UploadClosed(format!(
            "{} {} is not accepting uploads",
            kind.as_str(),
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;
    use whistler_core::models::Registration;
    use whistler_db::InMemoryStore;
    use whistler_storage::LocalResourceStore;

    const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    async fn gateway() -> (UploadGateway, InMemoryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = InMemoryStore::new();
        let store = LocalResourceStore::new(temp_dir.path()).await.unwrap();
        let gateway = UploadGateway::new(Arc::new(ledger.clone()), Arc::new(store));
        (gateway, ledger, temp_dir)
    }

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(parts.iter().map(|part| Ok(Bytes::from_static(*part))).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_upload_to_unregistered_resource_is_closed() {
        let (gateway, _ledger, tmp) = gateway().await;
        let err = gateway
            .upload(ResourceKind::Evidence, ID, chunks(&[b"abc"]), "10.0.0.1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UploadClosed(_)));
        assert!(!tmp.path().join(ID).exists());
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_rejected_before_any_lookup() {
        let (gateway, _ledger, _tmp) = gateway().await;
        for raw in ["../etc/passwd", "0F8FAD5B", ""] {
            let err = gateway.info(ResourceKind::Evidence, raw).await.unwrap_err();
            assert!(matches!(err, AppError::MalformedInput(_)), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn test_retried_upload_appends() {
        let (gateway, ledger, _tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        let first = gateway
            .upload(ResourceKind::Evidence, ID, chunks(&[b"ab", b"cd"]), "unknown")
            .await
            .unwrap();
        let second = gateway
            .upload(ResourceKind::Evidence, ID, chunks(&[b"ef"]), "unknown")
            .await
            .unwrap();

        assert_eq!((first, second), (4, 2));
        let (_, size) = gateway.info(ResourceKind::Evidence, ID).await.unwrap();
        assert_eq!(size, 6);
    }

    #[tokio::test]
    async fn test_interrupted_body_keeps_partial_bytes() {
        let (gateway, ledger, _tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let err = gateway
            .upload(ResourceKind::Evidence, ID, body, "unknown")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MalformedInput(_)));
        let (_, size) = gateway.info(ResourceKind::Evidence, ID).await.unwrap();
        assert_eq!(size, 3);
    }

    #[tokio::test]
    async fn test_info_is_zero_before_first_upload() {
        let (gateway, ledger, _tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();
        let (id, size) = gateway.info(ResourceKind::Evidence, ID).await.unwrap();
        assert_eq!(id.as_str(), ID);
        assert_eq!(size, 0);
    }

    #[tokio::test]
    async fn test_done_closes_uploads() {
        let (gateway, ledger, _tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        gateway.done(ResourceKind::Evidence, ID).await.unwrap();
        assert!(matches!(
            gateway.done(ResourceKind::Evidence, ID).await,
            Err(AppError::AlreadyFinalized(_))
        ));
        assert!(matches!(
            gateway
                .upload(ResourceKind::Evidence, ID, chunks(&[b"x"]), "unknown")
                .await,
            Err(AppError::UploadClosed(_))
        ));
        assert!(matches!(
            gateway.done(ResourceKind::MediaFile, ID).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_done_finalizes_once() {
        let (gateway, ledger, _tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        let (a, b) = tokio::join!(
            gateway.done(ResourceKind::Evidence, ID),
            gateway.done(ResourceKind::Evidence, ID)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    fn slow_body(byte: u8) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send {
        stream::iter(0..200).then(move |_| async move {
            tokio::task::yield_now().await;
            Ok(Bytes::from(vec![byte; 64]))
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_uploads_to_one_resource_do_not_interleave() {
        let (gateway, ledger, tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        let (a, b) = tokio::join!(
            gateway.upload(ResourceKind::Evidence, ID, slow_body(b'a'), "unknown"),
            gateway.upload(ResourceKind::Evidence, ID, slow_body(b'b'), "unknown")
        );
        assert_eq!((a.unwrap(), b.unwrap()), (12_800, 12_800));

        let stored = std::fs::read(tmp.path().join(ID)).unwrap();
        assert_eq!(stored.len(), 25_600);
        let switches = stored.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert_eq!(switches, 1);
    }

    #[tokio::test]
    async fn test_done_waits_for_in_flight_upload() {
        let (gateway, ledger, tmp) = gateway().await;
        ledger.register(&Registration::evidence(ID, ".jpg")).await.unwrap();

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, std::io::Error>>(1);
        let body = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let upload = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.upload(ResourceKind::Evidence, ID, body, "unknown").await }
        });

        // The second send only completes once the upload has taken the first chunk.
        tx.send(Ok(Bytes::from_static(b"abc"))).await.unwrap();
        tx.send(Ok(Bytes::from_static(b"def"))).await.unwrap();

        let done = tokio::spawn({
            let gateway = gateway.clone();
            async move { gateway.done(ResourceKind::Evidence, ID).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!done.is_finished());
        assert!(ledger.is_uploadable(ResourceKind::Evidence, ID).await.unwrap());

        drop(tx);
        assert_eq!(upload.await.unwrap().unwrap(), 6);
        done.await.unwrap().unwrap();

        assert_eq!(std::fs::read(tmp.path().join(ID)).unwrap(), b"abcdef");
        assert!(!ledger.is_uploadable(ResourceKind::Evidence, ID).await.unwrap());
    }
}
