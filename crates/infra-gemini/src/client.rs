// Gemini GenerationService
//
// Every failure is classified for the retry executor: 500/503/504, request
// timeouts and connection failures are transient, everything else is fatal.

use crate::config::GeminiConfig;
use crate::wire::{
    Content, FileData, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    RemoteFile, UploadMetadata, UploadResponse, UploadStart,
};
use async_trait::async_trait;
use lexcompare_core::error::{AppError, Result};
use lexcompare_core::port::{DocumentHandle, GenerationRequest, GenerationService, ProviderError};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Uploaded files are polled until they leave PROCESSING
const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const FILE_POLL_MAX_ATTEMPTS: u32 = 30;

/// Response bodies are truncated to this length inside error messages
const ERROR_BODY_LIMIT: usize = 512;

pub struct GeminiGenerationService {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGenerationService {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::Config("Gemini API key is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build Gemini client: {}", e)))?;

        info!(model = %config.model, base_url = %config.base_url, "Gemini client ready");
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn start_upload(
        &self,
        display_name: &str,
        mime_type: &str,
        length: usize,
    ) -> std::result::Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url("upload/v1beta/files"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", length.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStart {
                file: UploadMetadata { display_name },
            })
            .send()
            .await
            .map_err(classify_transport)?;
        let response = check_status(response).await?;

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Fatal("Upload session URL missing".to_string()))
    }

    async fn delete_file(&self, name: &str) -> std::result::Result<(), ProviderError> {
        let response = self
            .client
            .delete(self.url(&format!("v1beta/{}", name)))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(classify_transport)?;
        check_status(response).await?;
        debug!(handle = %name, "File deleted");
        Ok(())
    }

    async fn wait_until_active(
        &self,
        mut file: RemoteFile,
    ) -> std::result::Result<RemoteFile, ProviderError> {
        let mut attempts = 0;
        while file.state.as_deref() == Some("PROCESSING") {
            attempts += 1;
            if attempts > FILE_POLL_MAX_ATTEMPTS {
                return Err(ProviderError::Transient(format!(
                    "File {} still processing",
                    file.name
                )));
            }
            tokio::time::sleep(FILE_POLL_INTERVAL).await;

            let response = self
                .client
                .get(self.url(&format!("v1beta/{}", file.name)))
                .header(API_KEY_HEADER, &self.config.api_key)
                .send()
                .await
                .map_err(classify_transport)?;
            file = check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| ProviderError::Fatal(format!("Invalid file metadata: {}", e)))?;
        }

        if file.state.as_deref() == Some("FAILED") {
            return Err(ProviderError::Fatal(format!(
                "File {} failed processing",
                file.name
            )));
        }
        Ok(file)
    }
}

#[async_trait]
impl GenerationService for GeminiGenerationService {
    async fn register(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> std::result::Result<DocumentHandle, ProviderError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ProviderError::Fatal(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let upload_url = self
            .start_upload(&display_name, mime_type, bytes.len())
            .await?;

        let response = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(classify_transport)?;
        let uploaded: UploadResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("Invalid upload response: {}", e)))?;

        // The remote file exists from here on; an unusable one is deleted
        // since no handle will ever reach the caller.
        let remote_name = uploaded.file.name.clone();
        let file = match self.wait_until_active(uploaded.file).await {
            Ok(file) => file,
            Err(err) => {
                if let Err(e) = self.delete_file(&remote_name).await {
                    warn!(handle = %remote_name, error = %e, "Could not delete unusable upload");
                }
                return Err(err);
            }
        };
        debug!(file = %display_name, handle = %file.name, "File registered");

        Ok(DocumentHandle {
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, ProviderError> {
        let mut parts = vec![Part::Text {
            text: &request.prompt,
        }];
        parts.extend(request.handles.iter().map(|handle| Part::File {
            file_data: FileData {
                mime_type: &handle.mime_type,
                file_uri: &handle.uri,
            },
        }));

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: request.response_mime_type.as_deref(),
            },
        };

        let response = self
            .client
            .post(self.url(&format!(
                "v1beta/models/{}:generateContent",
                self.config.model
            )))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;
        let generated: GenerateContentResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Fatal(format!("Invalid generation response: {}", e)))?;

        match generated.text() {
            Some(text) => Ok(text),
            None => {
                let reason = generated
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .or_else(|| {
                        generated
                            .candidates
                            .first()
                            .and_then(|c| c.finish_reason.clone())
                    })
                    .unwrap_or_else(|| "no candidates".to_string());
                warn!(model = %self.config.model, reason = %reason, "Empty generation response");
                Err(ProviderError::Fatal(format!(
                    "Model returned no content ({})",
                    reason
                )))
            }
        }
    }

    async fn release(&self, handle: &DocumentHandle) -> std::result::Result<(), ProviderError> {
        self.delete_file(&handle.name).await
    }
}

/// Pass successful responses through; classify the rest.
async fn check_status(response: Response) -> std::result::Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let mut body = body.trim().to_string();
    if body.len() > ERROR_BODY_LIMIT {
        let mut end = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    let message = format!("{}: {}", status, body);

    match status {
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ProviderError::Transient(message),
        _ => ProviderError::Fatal(message),
    }
}

fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() || err.is_connect() {
        ProviderError::Transient(err.to_string())
    } else {
        ProviderError::Fatal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> GeminiGenerationService {
        GeminiGenerationService::new(
            GeminiConfig::new("test-key")
                .with_model("gemini-test")
                .with_base_url(server.uri())
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap()
    }

    fn handle() -> DocumentHandle {
        DocumentHandle {
            name: "files/abc".into(),
            uri: "https://example.test/v1beta/files/abc".into(),
            mime_type: "text/plain".into(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "compare".into(),
            handles: vec![handle()],
            response_mime_type: Some("application/json".into()),
        }
    }

    #[test]
    fn test_empty_api_key_is_config_error() {
        let result = GeminiGenerationService::new(GeminiConfig::new("  "));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_status_classification() {
        for code in [500, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(classify_status(status, "").is_transient(), "{}", code);
        }
        for code in [400, 403, 404, 429] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(!classify_status(status, "").is_transient(), "{}", code);
        }
    }

    #[test]
    fn test_long_error_bodies_are_truncated() {
        let body = "é".repeat(ERROR_BODY_LIMIT);
        match classify_status(StatusCode::BAD_REQUEST, &body) {
            ProviderError::Fatal(msg) => assert!(msg.len() < ERROR_BODY_LIMIT + 32),
            other => panic!("expected fatal, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_uses_resumable_upload() {
        let server = MockServer::start().await;
        let session = format!("{}/upload-session/1", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .and(header("x-goog-api-key", "test-key"))
            .and(header("x-goog-upload-command", "start"))
            .and(header("x-goog-upload-header-content-type", "text/plain"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", session.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session/1"))
            .and(headers("x-goog-upload-command", vec!["upload", "finalize"]))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {
                    "name": "files/abc",
                    "uri": "https://example.test/v1beta/files/abc",
                    "mimeType": "text/plain",
                    "state": "ACTIVE"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("abc_cmp_egypt.json");
        std::fs::write(&artifact, b"[]").unwrap();

        let registered = service(&server)
            .register(&artifact, "text/plain")
            .await
            .unwrap();
        assert_eq!(registered, handle());
    }

    #[tokio::test]
    async fn test_register_deletes_upload_that_fails_processing() {
        let server = MockServer::start().await;
        let session = format!("{}/upload-session/2", server.uri());

        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(ResponseTemplate::new(200).insert_header("x-goog-upload-url", session.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload-session/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": { "name": "files/abc", "uri": "https://example.test/v1beta/files/abc", "state": "PROCESSING" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "files/abc", "uri": "https://example.test/v1beta/files/abc", "state": "FAILED"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1beta/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("abc_cmp1_egypt.json");
        std::fs::write(&artifact, b"[]").unwrap();

        let err = service(&server)
            .register(&artifact, "text/plain")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        // MockServer verifies the DELETE expectation on drop
    }

    #[tokio::test]
    async fn test_register_missing_file_is_fatal() {
        let server = MockServer::start().await;
        let err = service(&server)
            .register(Path::new("/definitely/not/here.json"), "text/plain")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_handles_and_mime_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(body_partial_json(json!({
                "generationConfig": { "temperature": 0.0, "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "[{\"id\": " }, { "text": "\"Art.3\"}]" }] },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = service(&server).generate(&request()).await.unwrap();
        assert_eq!(text, "[{\"id\": \"Art.3\"}]");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "compare");
        assert_eq!(
            body["contents"][0]["parts"][1]["file_data"]["file_uri"],
            "https://example.test/v1beta/files/abc"
        );
    }

    #[tokio::test]
    async fn test_generate_classifies_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let service = service(&server);
        let first = service.generate(&request()).await.unwrap_err();
        assert!(first.is_transient());
        let second = service.generate(&request()).await.unwrap_err();
        assert!(!second.is_transient());
    }

    #[tokio::test]
    async fn test_generate_timeout_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let service = GeminiGenerationService::new(
            GeminiConfig::new("test-key")
                .with_model("gemini-test")
                .with_base_url(server.uri())
                .with_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        let err = service.generate(&request()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        match service(&server).generate(&request()).await.unwrap_err() {
            ProviderError::Fatal(msg) => assert!(msg.contains("SAFETY")),
            other => panic!("expected fatal, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_release_deletes_file() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1beta/files/abc"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        service(&server).release(&handle()).await.unwrap();
    }
}
