use fleet_store::now;
use fleet_types::{Document, DocumentEntityType, DocumentId, IntegrityResult};
use sha2::{Digest, Sha256};

pub use fleet_store::DocumentFilter;

use crate::access::Caller;
use crate::errors::ApiError;
use crate::input::NewDocument;
use crate::{Ack, Fleet};

const NOT_FOUND: &str = "Document not found";

fn missing_entity(entity_type: DocumentEntityType) -> ApiError {
    let label = match entity_type {
        DocumentEntityType::Trip => "Trip",
        DocumentEntityType::Vehicle => "Vehicle",
        DocumentEntityType::Driver => "Driver",
    };
    ApiError::bad_request("VALIDATION", format!("{label} not found"))
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl Fleet {
    /// Newest first.
    pub fn list_documents(
        &self,
        caller: &Caller,
        filter: DocumentFilter,
    ) -> Result<Vec<Document>, ApiError> {
        match caller.org_id {
            Some(org_id) => Ok(self.store.list_documents(org_id, filter)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_document(&self, caller: &Caller, id: DocumentId) -> Result<Document, ApiError> {
        let org_id = caller.org_for_record(NOT_FOUND)?;
        self.store
            .get_document(org_id, id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    /// The caller is recorded as the uploader.
    pub fn create_document(&self, caller: &Caller, input: NewDocument) -> Result<Document, ApiError> {
        let org_id = caller.org_for_create()?;
        if !self
            .store
            .document_entity_exists(org_id, input.entity_type, input.entity_id)?
        {
            return Err(missing_entity(input.entity_type));
        }

        let document = Document {
            id: DocumentId::new_v4(),
            org_id,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            file_name: input.file_name,
            file_url: input.file_url,
            content_hash: input.content_hash,
            mime_type: input.mime_type,
            uploaded_by: Some(caller.id),
            created_at: now(),
            user: None,
        };
        self.store.insert_document(&document)?;
        tracing::info!(
            document_id = %document.id,
            entity_type = %document.entity_type,
            entity_id = %document.entity_id,
            "Created document"
        );
        self.store
            .get_document(org_id, document.id)?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub fn delete_document(&self, caller: &Caller, id: DocumentId) -> Result<Ack, ApiError> {
        let org_id = caller.org_for_change(NOT_FOUND)?;
        if !self.store.delete_document(org_id, id)? {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        tracing::info!(document_id = %id, "Deleted document");
        Ok(Ack::OK)
    }

    /// Re-download the file and compare its SHA-256 with the stored hash.
    ///
    /// Every outcome, including a failed download, is written to the
    /// document's integrity log. Only a missing document is an error.
    pub async fn verify_document_integrity(
        &self,
        caller: &Caller,
        id: DocumentId,
    ) -> Result<IntegrityResult, ApiError> {
        let document = self.get_document(caller, id)?;
        let log = |passed: bool, message: &str| {
            self.store
                .record_integrity_check(id, passed, message, Some(caller.id))
        };

        let Some(expected) = document.content_hash.as_deref() else {
            log(false, "No hash stored")?;
            return Ok(IntegrityResult {
                ok: false,
                tampered: None,
                message: "No content hash stored for this document. Integrity cannot be verified."
                    .to_string(),
            });
        };
        let Some(url) = document.file_url.as_deref() else {
            log(false, "No file URL")?;
            return Ok(IntegrityResult {
                ok: false,
                tampered: None,
                message: "No file URL. Cannot fetch file to verify.".to_string(),
            });
        };

        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(document_id = %id, error = %reason, "Integrity check download failed");
                log(false, &reason)?;
                return Ok(IntegrityResult {
                    ok: false,
                    tampered: None,
                    message: format!("Could not verify: {reason}"),
                });
            }
        };

        let passed = sha256_hex(&body).eq_ignore_ascii_case(expected);
        if passed {
            log(true, "Hash matches")?;
            Ok(IntegrityResult {
                ok: true,
                tampered: Some(false),
                message: "File integrity verified. Hash matches.".to_string(),
            })
        } else {
            tracing::warn!(document_id = %id, "Document hash mismatch");
            log(false, "Hash mismatch - file may have been modified")?;
            Ok(IntegrityResult {
                ok: true,
                tampered: Some(true),
                message: "Integrity check failed. File may have been modified (tampering detected)."
                    .to_string(),
            })
        }
    }
}
