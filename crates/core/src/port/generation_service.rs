// Generation Service Port (external generative-AI collaborator)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Ephemeral reference to a document registered with the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Provider-side resource name, used for release
    pub name: String,
    /// URI passed back in generation requests
    pub uri: String,
    pub mime_type: String,
}

/// Provider failure, classified at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Service unavailable, internal error, deadline exceeded, timeout
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// One generation request: prompt text plus the documents it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub handles: Vec<DocumentHandle>,
    /// e.g. `application/json` to ask for raw JSON output
    pub response_mime_type: Option<String>,
}

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Register a local file and obtain a reusable handle
    async fn register(&self, path: &Path, mime_type: &str)
        -> Result<DocumentHandle, ProviderError>;

    /// Run one generation call and return the model's free text
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Release a previously registered handle
    async fn release(&self, handle: &DocumentHandle) -> Result<(), ProviderError>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Responder = dyn Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync;

    /// Scripted GenerationService for testing
    ///
    /// - `register` succeeds unless a failure was scripted for the file name
    /// - `generate` delegates to the responder closure
    /// - every call is recorded
    pub struct ScriptedGenerationService {
        responder: Box<Responder>,
        register_failures: Mutex<HashMap<String, ProviderError>>,
        release_failure: Mutex<Option<ProviderError>>,
        registered: Mutex<Vec<String>>,
        released: Mutex<Vec<DocumentHandle>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerationService {
        pub fn new<F>(responder: F) -> Arc<Self>
        where
            F: Fn(&GenerationRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
        {
            Arc::new(Self {
                responder: Box::new(responder),
                register_failures: Mutex::new(HashMap::new()),
                release_failure: Mutex::new(None),
                registered: Mutex::new(Vec::new()),
                released: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
            })
        }

        /// Every `register` of `file_name` fails with `error`
        pub fn fail_register(&self, file_name: impl Into<String>, error: ProviderError) {
            self.register_failures
                .lock()
                .unwrap()
                .insert(file_name.into(), error);
        }

        /// Every `release` fails with `error` (the handle is still recorded)
        pub fn fail_release(&self, error: ProviderError) {
            *self.release_failure.lock().unwrap() = Some(error);
        }

        /// File names passed to `register`, including failed attempts
        pub fn registered(&self) -> Vec<String> {
            self.registered.lock().unwrap().clone()
        }

        pub fn released(&self) -> Vec<DocumentHandle> {
            self.released.lock().unwrap().clone()
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn generate_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedGenerationService {
        async fn register(
            &self,
            path: &Path,
            mime_type: &str,
        ) -> Result<DocumentHandle, ProviderError> {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.registered.lock().unwrap().push(file_name.clone());

            if let Some(err) = self.register_failures.lock().unwrap().get(&file_name) {
                return Err(err.clone());
            }

            Ok(DocumentHandle {
                name: format!("files/{}", file_name),
                uri: format!("mock://files/{}", file_name),
                mime_type: mime_type.to_string(),
            })
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            (self.responder)(request)
        }

        async fn release(&self, handle: &DocumentHandle) -> Result<(), ProviderError> {
            self.released.lock().unwrap().push(handle.clone());
            match self.release_failure.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }
}
