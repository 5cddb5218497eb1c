//! In-memory collaborator implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use docmill_core::{DocumentRecord, StatusUpdate};
use docmill_mapper::MappedFields;

use crate::notify::OcrCompleteEvent;
use crate::store::{
    AnswerSink, DocumentStore, EventPublisher, JobRegistry, ObjectMetadata, ObjectStore,
    PendingJob, StoreError,
};

/// In-memory [`DocumentStore`] enforcing the stale-attempt rule through
/// [`DocumentRecord::apply`].
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    records: RwLock<HashMap<String, DocumentRecord>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, document_id: &str) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.records.read().await.get(document_id).cloned())
    }

    async fn apply(
        &self,
        document_id: &str,
        bucket: &str,
        object_key: &str,
        update: StatusUpdate,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .entry(document_id.to_string())
            .or_insert_with(|| DocumentRecord::new(document_id, bucket, object_key));
        Ok(record.apply(&update))
    }
}

/// In-memory [`ObjectStore`] with size-only stubs for raw uploads.
///
/// Objects without a registered size report missing metadata, exercising
/// the pipeline's unknown-size soft-failure path.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    sizes: RwLock<HashMap<(String, String), u64>>,
    objects: RwLock<HashMap<(String, String), Bytes>>,
    metadata_failing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every metadata lookup return a store error.
    pub fn set_metadata_failing(&self, failing: bool) {
        self.metadata_failing.store(failing, Ordering::SeqCst);
    }

    /// Registers the size reported for an object without storing content.
    pub async fn insert_size(&self, bucket: &str, key: &str, size: u64) {
        self.sizes
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), size);
    }

    /// Content previously written with `put_json`, if any.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys written under the given bucket.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn metadata(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>, StoreError> {
        if self.metadata_failing.load(Ordering::SeqCst) {
            return Err(StoreError::new("metadata", "object store unavailable"));
        }
        let size = self
            .sizes
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .copied();
        Ok(size.map(|size| ObjectMetadata { size }))
    }

    async fn put_json(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}

/// In-memory [`AnswerSink`] recording submissions; can be switched into a
/// failing mode to exercise best-effort forwarding.
#[derive(Debug, Default)]
pub struct MemoryAnswerSink {
    submissions: RwLock<Vec<(String, MappedFields)>>,
    failing: AtomicBool,
}

impl MemoryAnswerSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn submissions(&self) -> Vec<(String, MappedFields)> {
        self.submissions.read().await.clone()
    }
}

#[async_trait]
impl AnswerSink for MemoryAnswerSink {
    async fn submit(&self, document_id: &str, fields: &MappedFields) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::new("submit", "answer sink unavailable"));
        }
        self.submissions
            .write()
            .await
            .push((document_id.to_string(), fields.clone()));
        Ok(())
    }
}

/// In-memory [`EventPublisher`] recording published events.
#[derive(Debug, Default)]
pub struct MemoryEventPublisher {
    events: RwLock<Vec<OcrCompleteEvent>>,
    failing: AtomicBool,
}

impl MemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<OcrCompleteEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventPublisher {
    async fn publish(&self, event: &OcrCompleteEvent) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::new("publish", "notification target unavailable"));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

/// In-memory [`JobRegistry`].
#[derive(Debug, Default)]
pub struct MemoryJobRegistry {
    jobs: RwLock<HashMap<String, PendingJob>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobRegistry for MemoryJobRegistry {
    async fn put(&self, job_id: &str, job: PendingJob) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job_id.to_string(), job);
        Ok(())
    }

    async fn take(&self, job_id: &str) -> Result<Option<PendingJob>, StoreError> {
        Ok(self.jobs.write().await.remove(job_id))
    }
}
