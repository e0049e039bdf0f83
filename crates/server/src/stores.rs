//! Document storage backends
//!
//! Job attachments live in the field-service platform; drafts live in a
//! shared document store. Both are reached through traits so the HTTP layer
//! can run against in-memory stores in tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of uploading a file to a job
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A file held by the document store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: String,
    pub file_name: String,
    pub folder: String,
    pub size: usize,
    pub modified_at: DateTime<Utc>,
}

/// Attachments on jobs in the field-service platform
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn download(&self, attachment_id: &str) -> Result<Vec<u8>, StoreError>;

    async fn upload(
        &self,
        job_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, StoreError>;
}

/// Shared document storage, organised into folders
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a new file under `parent` and return its metadata
    async fn put(
        &self,
        parent: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StoreError>;

    async fn get(&self, file_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Replace a file's content and name, keeping its id
    async fn update(
        &self,
        file_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StoreError>;

    /// Files directly under `parent`, most recently modified first
    async fn list(&self, parent: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Move a file to another folder
    async fn move_to(&self, file_id: &str, parent: &str) -> Result<StoredDocument, StoreError>;
}

/// A file uploaded to a job
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub id: String,
    pub job_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct MemoryAttachmentStore {
    attachments: Mutex<HashMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<Upload>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, attachment_id: impl Into<String>, bytes: Vec<u8>) {
        self.attachments
            .lock()
            .await
            .insert(attachment_id.into(), bytes);
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn download(&self, attachment_id: &str) -> Result<Vec<u8>, StoreError> {
        self.attachments
            .lock()
            .await
            .get(attachment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("attachment {attachment_id}")))
    }

    async fn upload(
        &self,
        job_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.uploads.lock().await.push(Upload {
            id: id.clone(),
            job_id: job_id.to_string(),
            file_name: file_name.to_string(),
            bytes,
        });
        Ok(UploadReceipt {
            id,
            uploaded_at: Utc::now(),
        })
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    files: Mutex<HashMap<String, (StoredDocument, Vec<u8>)>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a stored file
    pub async fn document(&self, file_id: &str) -> Option<StoredDocument> {
        self.files
            .lock()
            .await
            .get(file_id)
            .map(|(document, _)| document.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(
        &self,
        parent: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StoreError> {
        let document = StoredDocument {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            folder: parent.to_string(),
            size: bytes.len(),
            modified_at: Utc::now(),
        };
        self.files
            .lock()
            .await
            .insert(document.id.clone(), (document.clone(), bytes));
        Ok(document)
    }

    async fn get(&self, file_id: &str) -> Result<Vec<u8>, StoreError> {
        self.files
            .lock()
            .await
            .get(file_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))
    }

    async fn update(
        &self,
        file_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredDocument, StoreError> {
        let mut files = self.files.lock().await;
        let (document, stored) = files
            .get_mut(file_id)
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;
        document.file_name = file_name.to_string();
        document.size = bytes.len();
        document.modified_at = Utc::now();
        *stored = bytes;
        Ok(document.clone())
    }

    async fn list(&self, parent: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let mut documents: Vec<StoredDocument> = self
            .files
            .lock()
            .await
            .values()
            .filter(|(document, _)| document.folder == parent)
            .map(|(document, _)| document.clone())
            .collect();
        documents.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(documents)
    }

    async fn move_to(&self, file_id: &str, parent: &str) -> Result<StoredDocument, StoreError> {
        let mut files = self.files.lock().await;
        let (document, _) = files
            .get_mut(file_id)
            .ok_or_else(|| StoreError::NotFound(format!("file {file_id}")))?;
        document.folder = parent.to_string();
        Ok(document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_attachment_round_trip() {
        let store = MemoryAttachmentStore::new();
        store.insert("42", b"%PDF-1.5".to_vec()).await;

        assert_eq!(store.download("42").await.unwrap(), b"%PDF-1.5".to_vec());
        assert!(matches!(
            store.download("7").await,
            Err(StoreError::NotFound(_))
        ));

        let receipt = store.upload("1001", "Completed - Form.pdf", vec![1, 2]).await.unwrap();
        let uploads = store.uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].id, receipt.id);
        assert_eq!(uploads[0].job_id, "1001");
    }

    #[tokio::test]
    async fn test_document_put_and_update() {
        let store = MemoryDocumentStore::new();
        let saved = store.put("drafts/1001", "Draft.pdf", vec![1]).await.unwrap();
        assert_eq!(saved.folder, "drafts/1001");

        let updated = store.update(&saved.id, "Renamed.pdf", vec![1, 2, 3]).await.unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.size, 3);
        assert_eq!(store.get(&saved.id).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(
            store.document(&saved.id).await.unwrap().file_name,
            "Renamed.pdf"
        );
        assert!(store.update("missing", "x.pdf", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_document_list_and_move() {
        let store = MemoryDocumentStore::new();
        let first = store.put("drafts/1001", "A.pdf", vec![1]).await.unwrap();
        let second = store.put("drafts/1001", "B.pdf", vec![2]).await.unwrap();
        store.put("drafts/2002", "Other.pdf", vec![3]).await.unwrap();

        let mut names: Vec<String> = store
            .list("drafts/1001")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.file_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["A.pdf", "B.pdf"]);

        let moved = store.move_to(&first.id, "completed/1001").await.unwrap();
        assert_eq!(moved.folder, "completed/1001");
        assert_eq!(store.get(&first.id).await.unwrap(), vec![1]);

        let drafts = store.list("drafts/1001").await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, second.id);
        assert_eq!(store.list("completed/1001").await.unwrap()[0].id, first.id);
        assert!(store.list("drafts/9999").await.unwrap().is_empty());
        assert!(matches!(
            store.move_to("missing", "completed/1001").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
