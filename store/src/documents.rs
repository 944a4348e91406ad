use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fleet_types::{
    Document, DocumentEntityType, DocumentId, IntegrityLogId, OrgId, UserId, UserSummary,
};
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use crate::sqlite_util::{opt_uuid_col, text_col, ts, ts_col, uuid_col};
use crate::{Store, now};

const DOCUMENT_SELECT: &str = "SELECT doc.id, doc.org_id, doc.entity_type, doc.entity_id,
            doc.file_name, doc.file_url, doc.content_hash, doc.mime_type, doc.uploaded_by,
            doc.created_at, u.email, u.name
     FROM documents doc
     LEFT JOIN users u ON u.id = doc.uploaded_by";

/// Optional narrowing for a document listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub entity_type: Option<DocumentEntityType>,
    pub entity_id: Option<Uuid>,
}

/// One integrity verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityLog {
    pub id: IntegrityLogId,
    pub document_id: DocumentId,
    pub passed: bool,
    pub message: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let uploaded_by = opt_uuid_col(row, 8)?.map(UserId::from_uuid);
    let email: Option<String> = row.get(10)?;
    let name: Option<String> = row.get(11)?;
    let user = match (uploaded_by, email, name) {
        (Some(id), Some(email), Some(name)) => Some(UserSummary { id, email, name }),
        _ => None,
    };
    Ok(Document {
        id: DocumentId::from_uuid(uuid_col(row, 0)?),
        org_id: OrgId::from_uuid(uuid_col(row, 1)?),
        entity_type: text_col(row, 2, DocumentEntityType::parse)?,
        entity_id: uuid_col(row, 3)?,
        file_name: row.get(4)?,
        file_url: row.get(5)?,
        content_hash: row.get(6)?,
        mime_type: row.get(7)?,
        uploaded_by,
        created_at: ts_col(row, 9)?,
        user,
    })
}

impl Store {
    /// Newest first.
    pub fn list_documents(&self, org_id: OrgId, filter: DocumentFilter) -> Result<Vec<Document>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "{DOCUMENT_SELECT}
                 WHERE doc.org_id = ?1
                   AND (?2 IS NULL OR doc.entity_type = ?2)
                   AND (?3 IS NULL OR doc.entity_id = ?3)
                 ORDER BY doc.created_at DESC, doc.id ASC"
            ))
            .context("Failed to prepare document list query")?;
        stmt.query_map(
            params![
                org_id.to_string(),
                filter.entity_type.map(DocumentEntityType::as_str),
                filter.entity_id.map(|id| id.to_string()),
            ],
            document_from_row,
        )
        .context("Failed to query documents")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read document row")
    }

    pub fn get_document(&self, org_id: OrgId, id: DocumentId) -> Result<Option<Document>> {
        self.conn()?
            .query_row(
                &format!("{DOCUMENT_SELECT} WHERE doc.id = ?1 AND doc.org_id = ?2"),
                [id.to_string(), org_id.to_string()],
                document_from_row,
            )
            .optional()
            .context("Failed to load document")
    }

    pub fn insert_document(&self, document: &Document) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO documents (id, org_id, entity_type, entity_id, file_name, file_url,
                                        content_hash, mime_type, uploaded_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    document.id.to_string(),
                    document.org_id.to_string(),
                    document.entity_type.as_str(),
                    document.entity_id.to_string(),
                    &document.file_name,
                    &document.file_url,
                    &document.content_hash,
                    &document.mime_type,
                    document.uploaded_by.map(|id| id.to_string()),
                    ts(document.created_at),
                ],
            )
            .context("Failed to insert document")?;
        Ok(())
    }

    pub fn delete_document(&self, org_id: OrgId, id: DocumentId) -> Result<bool> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM documents WHERE id = ?1 AND org_id = ?2",
                [id.to_string(), org_id.to_string()],
            )
            .context("Failed to delete document")?;
        Ok(deleted > 0)
    }

    /// Whether the trip, vehicle or driver a document points at exists in the org.
    pub fn document_entity_exists(
        &self,
        org_id: OrgId,
        entity_type: DocumentEntityType,
        entity_id: Uuid,
    ) -> Result<bool> {
        let table = match entity_type {
            DocumentEntityType::Trip => "trips",
            DocumentEntityType::Vehicle => "vehicles",
            DocumentEntityType::Driver => "drivers",
        };
        let count: i64 = self
            .conn()?
            .query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1 AND org_id = ?2"),
                [entity_id.to_string(), org_id.to_string()],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to look up {table} row"))?;
        Ok(count > 0)
    }

    pub fn record_integrity_check(
        &self,
        document_id: DocumentId,
        passed: bool,
        message: &str,
        user_id: Option<UserId>,
    ) -> Result<IntegrityLog> {
        let log = IntegrityLog {
            id: IntegrityLogId::new_v4(),
            document_id,
            passed,
            message: message.to_string(),
            user_id,
            created_at: now(),
        };
        self.conn()?
            .execute(
                "INSERT INTO document_integrity_logs
                     (id, document_id, passed, message, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    log.id.to_string(),
                    log.document_id.to_string(),
                    log.passed,
                    &log.message,
                    log.user_id.map(|id| id.to_string()),
                    ts(log.created_at),
                ],
            )
            .context("Failed to insert integrity log")?;
        Ok(log)
    }

    /// Oldest first.
    pub fn integrity_logs(&self, document_id: DocumentId) -> Result<Vec<IntegrityLog>> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(
                "SELECT id, document_id, passed, message, user_id, created_at
                 FROM document_integrity_logs WHERE document_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )
            .context("Failed to prepare integrity log query")?;
        stmt.query_map([document_id.to_string()], |row| {
            Ok(IntegrityLog {
                id: IntegrityLogId::from_uuid(uuid_col(row, 0)?),
                document_id: DocumentId::from_uuid(uuid_col(row, 1)?),
                passed: row.get(2)?,
                message: row.get(3)?,
                user_id: opt_uuid_col(row, 4)?.map(UserId::from_uuid),
                created_at: ts_col(row, 5)?,
            })
        })
        .context("Failed to query integrity logs")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read integrity log row")
    }
}
