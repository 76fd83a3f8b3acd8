//! Test doubles for providers and the storage sink.
//!
//! Scripted providers replay a fixed outcome and record their invocation in
//! a shared attempt log, so fallback-order tests can assert the exact path
//! taken. MockStorage keeps files in memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use recast_core::models::{ContentType, GenerationOptions, GenerationRequest};
use recast_core::StorageBackend;
use recast_storage::{Storage, StorageError, StorageResult};

use crate::provider::{GeneratedImage, ImageProvider, ProviderError, TextProvider, TextRequest};

/// Shared log of provider names in attempt order.
pub type AttemptLog = Arc<Mutex<Vec<String>>>;

pub fn attempt_log() -> AttemptLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A GenerationRequest with fixed content for tests.
pub fn request_for(content_type: ContentType) -> GenerationRequest {
    GenerationRequest {
        job_id: Uuid::new_v4(),
        title: "Why Rust".to_string(),
        source_text: "Rust is a systems language.".to_string(),
        content_type,
        options: GenerationOptions::default(),
    }
}

enum ScriptedOutcome {
    Text(String),
    Image(Vec<u8>),
    Error(ProviderError),
}

impl ScriptedOutcome {
    // ProviderError isn't Clone; rebuild an equivalent error per call.
    fn replay_error(error: &ProviderError) -> ProviderError {
        match error {
            ProviderError::Timeout => ProviderError::Timeout,
            ProviderError::RateLimited(m) => ProviderError::RateLimited(m.clone()),
            ProviderError::Http { status, message } => ProviderError::Http {
                status: *status,
                message: message.clone(),
            },
            ProviderError::Network(m) => ProviderError::Network(m.clone()),
            ProviderError::InvalidResponse(m) => ProviderError::InvalidResponse(m.clone()),
            ProviderError::Empty => ProviderError::Empty,
        }
    }
}

/// Text provider that always returns the same scripted outcome.
pub struct ScriptedTextProvider {
    name: String,
    outcome: ScriptedOutcome,
    log: AttemptLog,
}

impl ScriptedTextProvider {
    pub fn ok(name: &str, text: &str, log: AttemptLog) -> Self {
        Self {
            name: name.to_string(),
            outcome: ScriptedOutcome::Text(text.to_string()),
            log,
        }
    }

    pub fn failing(name: &str, error: ProviderError, log: AttemptLog) -> Self {
        Self {
            name: name.to_string(),
            outcome: ScriptedOutcome::Error(error),
            log,
        }
    }
}

#[async_trait]
impl TextProvider for ScriptedTextProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_text(&self, _request: &TextRequest) -> Result<String, ProviderError> {
        self.log.lock().unwrap().push(self.name.clone());
        match &self.outcome {
            ScriptedOutcome::Text(text) => Ok(text.clone()),
            ScriptedOutcome::Error(error) => Err(ScriptedOutcome::replay_error(error)),
            ScriptedOutcome::Image(_) => Err(ProviderError::InvalidResponse(
                "scripted text provider holds image outcome".to_string(),
            )),
        }
    }
}

/// Image provider that always returns the same scripted outcome.
pub struct ScriptedImageProvider {
    name: String,
    outcome: ScriptedOutcome,
    log: AttemptLog,
}

impl ScriptedImageProvider {
    pub fn ok(name: &str, data: Vec<u8>, log: AttemptLog) -> Self {
        Self {
            name: name.to_string(),
            outcome: ScriptedOutcome::Image(data),
            log,
        }
    }

    pub fn failing(name: &str, error: ProviderError, log: AttemptLog) -> Self {
        Self {
            name: name.to_string(),
            outcome: ScriptedOutcome::Error(error),
            log,
        }
    }
}

#[async_trait]
impl ImageProvider for ScriptedImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ProviderError> {
        self.log.lock().unwrap().push(self.name.clone());
        match &self.outcome {
            ScriptedOutcome::Image(data) => Ok(GeneratedImage {
                data: data.clone(),
                content_type: "image/png".to_string(),
            }),
            ScriptedOutcome::Error(error) => Err(ScriptedOutcome::replay_error(error)),
            ScriptedOutcome::Text(_) => Err(ProviderError::InvalidResponse(
                "scripted image provider holds text outcome".to_string(),
            )),
        }
    }
}

/// In-memory storage sink for generator and pipeline tests.
pub struct MockStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: bool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_puts: false,
        }
    }

    /// A sink whose puts always fail, simulating an outage.
    pub fn failing() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_puts: true,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn get_file(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn put(
        &self,
        folder: &str,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        if self.fail_puts {
            return Err(StorageError::BackendError("sink unavailable".to_string()));
        }
        let key = format!("{}/{}", folder, filename);
        let mut files = self.files.lock().unwrap();
        if files.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        files.insert(key.clone(), data);
        Ok(format!("mock://{}", key))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
