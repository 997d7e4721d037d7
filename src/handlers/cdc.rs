//! Generic CDC entity handler

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error};

use crate::db::repository::EntityRepository;
use crate::error::{Error, Result};
use crate::kafka::{MessageHandler, RawMessage};
use crate::models::envelope::{CdcEnvelope, CdcOp};
use crate::models::error::{ValidationError, ValidationErrorKind};
use crate::models::restructure::CdcEntity;

/// Decodes `CdcEnvelope<E>`, restructures the image and writes it through
/// the entity's repository.
///
/// `c` and `r` save the post-image, `u` updates with it, `d` soft-deletes the
/// row keyed by the pre-image. Only the key is read from a pre-image.
pub struct CdcHandler<E: CdcEntity> {
    repo: Arc<dyn EntityRepository<E::Row>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: CdcEntity> CdcHandler<E> {
    pub fn new(repo: Arc<dyn EntityRepository<E::Row>>) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }
}

fn image<T>(image: Option<T>, which: &'static str, entity: &str) -> Result<T> {
    image.ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::MissingImage, which)
            .add_context(entity.to_string())
            .into()
    })
}

#[async_trait]
impl<E: CdcEntity> MessageHandler for CdcHandler<E> {
    async fn handle(&self, message: &RawMessage) -> Result<()> {
        tracing::Span::current().record("entity", E::NAME);

        let envelope: CdcEnvelope<E> = serde_json::from_slice(&message.value).map_err(|e| {
            error!(
                entity = E::NAME,
                error = %e,
                payload = %message.payload_lossy(),
                "Failed to decode CDC envelope"
            );
            Error::decode(format!("{}: {}", E::NAME, e))
        })?;

        let payload = envelope.payload;
        let op = match CdcOp::parse(&payload.op) {
            Some(op) => op,
            None => {
                debug!(entity = E::NAME, op = %payload.op, "Ignoring unknown CDC op");
                return Ok(());
            },
        };

        let written = match op {
            CdcOp::Create | CdcOp::Read => {
                let row = image(payload.after, "after", E::NAME)?.restructure()?;
                self.repo.save(&row).await
            },
            CdcOp::Update => {
                let row = image(payload.after, "after", E::NAME)?.restructure()?;
                self.repo.update(&row).await
            },
            CdcOp::Delete => {
                let key = image(payload.before, "before", E::NAME)?
                    .key()
                    .ok_or_else(|| ValidationError::required(E::NAME, "id"))?;
                self.repo.soft_delete(&key).await
            },
        };

        written.map_err(|e| {
            error!(entity = E::NAME, op = op.as_str(), error = %e, "Failed to write CDC row");
            Error::from(e)
        })?;

        debug!(entity = E::NAME, op = op.as_str(), "CDC row written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rows::{B2BAccountContact, B2CMerchant};
    use crate::models::shark::{SharkAccountContact, SharkMerchant};
    use crate::test_utils::RecordingRepository;

    fn handler(repo: &Arc<RecordingRepository<B2CMerchant>>) -> CdcHandler<SharkMerchant> {
        CdcHandler::new(repo.clone())
    }

    fn message(value: &str) -> RawMessage {
        RawMessage::new("cdc.merchant", 0, 1, value.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_create_and_snapshot_save() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());
        let handler = handler(&repo);

        handler
            .handle(&message(r#"{"payload":{"after":{"id":"MCH1"},"op":"c"}}"#))
            .await
            .unwrap();
        handler
            .handle(&message(r#"{"payload":{"after":{"id":"MCH2"},"op":"r"}}"#))
            .await
            .unwrap();

        let saved: Vec<String> = repo.saved().into_iter().map(|r| r.id).collect();
        assert_eq!(saved, vec!["MCH1".to_string(), "MCH2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_uses_before_image() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());

        handler(&repo)
            .handle(&message(
                r#"{"payload":{"before":{"id":"MCH1"},"after":null,"op":"d"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(repo.deleted(), vec!["MCH1".to_string()]);
        assert!(repo.saved().is_empty());
    }

    #[tokio::test]
    async fn test_delete_needs_only_the_key() {
        let repo = Arc::new(RecordingRepository::<B2BAccountContact>::new());
        let handler: CdcHandler<SharkAccountContact> = CdcHandler::new(repo.clone());

        handler
            .handle(&message(r#"{"payload":{"before":{"id":31},"after":null,"op":"d"}}"#))
            .await
            .unwrap();

        assert_eq!(repo.deleted(), vec!["31".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_without_key_is_validation_error() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());

        let err = handler(&repo)
            .handle(&message(r#"{"payload":{"before":{"merchantName":"Acme"},"op":"d"}}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(repo.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_missing_image_is_validation_error() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());

        let err = handler(&repo)
            .handle(&message(r#"{"payload":{"before":null,"op":"u"}}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(repo.updated().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_op_is_ignored() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());

        handler(&repo)
            .handle(&message(r#"{"payload":{"after":{"id":"MCH1"},"op":"t"}}"#))
            .await
            .unwrap();

        assert!(repo.saved().is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());
        let err = handler(&repo).handle(&message("{not json")).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[tokio::test]
    async fn test_repository_failure_is_database_error() {
        let repo = Arc::new(RecordingRepository::<B2CMerchant>::new());
        repo.fail_next("connection reset");

        let err = handler(&repo)
            .handle(&message(r#"{"payload":{"after":{"id":"MCH1"},"op":"c"}}"#))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
