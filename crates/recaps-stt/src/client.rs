//! Google Speech-to-Text REST client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use recaps_models::WordTimestamp;

use crate::error::{SttError, SttResult};
use crate::transcriber::Transcriber;
use crate::types::{
    encoding_for_extension, parse_duration, RecognitionAudio, RecognitionConfig, RecognizeRequest,
    RecognizeResponse,
};

pub const DEFAULT_BASE_URL: &str = "https://speech.googleapis.com";
pub const DEFAULT_LANGUAGE: &str = "en-US";
pub const DEFAULT_MODEL: &str = "latest_long";

/// Google STT client configuration.
#[derive(Clone)]
pub struct SttConfig {
    pub api_key: String,
    pub base_url: String,
    pub language_code: String,
    pub model: String,
    pub timeout: Duration,
    /// Only sent for LINEAR16 audio
    pub sample_rate_hertz: Option<u32>,
}

impl std::fmt::Debug for SttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SttConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("language_code", &self.language_code)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("sample_rate_hertz", &self.sample_rate_hertz)
            .finish()
    }
}

impl SttConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language_code: DEFAULT_LANGUAGE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            sample_rate_hertz: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// Fails when `GOOGLE_STT_API_KEY` is unset or empty.
    pub fn from_env() -> SttResult<Self> {
        let api_key = std::env::var("GOOGLE_STT_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SttError::config("GOOGLE_STT_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GOOGLE_STT_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(language) = std::env::var("GOOGLE_STT_LANGUAGE") {
            config.language_code = language;
        }
        if let Ok(model) = std::env::var("GOOGLE_STT_MODEL") {
            config.model = model;
        }
        if let Some(secs) = std::env::var("GOOGLE_STT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Synchronous `speech:recognize` client.
pub struct GoogleSttClient {
    config: SttConfig,
    client: Client,
}

impl GoogleSttClient {
    pub fn new(config: SttConfig) -> SttResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SttConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1p1beta1/speech:recognize",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, encoding: &'static str, audio: &[u8]) -> RecognizeRequest {
        RecognizeRequest {
            config: RecognitionConfig {
                encoding,
                sample_rate_hertz: self.config.sample_rate_hertz.filter(|_| encoding == "LINEAR16"),
                language_code: self.config.language_code.clone(),
                enable_word_time_offsets: true,
                enable_automatic_punctuation: true,
                model: self.config.model.clone(),
                use_enhanced: true,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(audio),
            },
        }
    }
}

#[async_trait]
impl Transcriber for GoogleSttClient {
    fn name(&self) -> &'static str {
        "google_stt"
    }

    async fn transcribe(&self, audio_path: &Path) -> SttResult<Vec<WordTimestamp>> {
        let extension = audio_path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        let encoding = encoding_for_extension(&extension)?;

        let audio = tokio::fs::read(audio_path).await?;
        debug!(
            path = %audio_path.display(),
            bytes = audio.len(),
            encoding,
            "Sending audio for transcription"
        );

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&self.build_request(encoding, &audio))
            .send()
            .await
            .map_err(|e| SttError::Network(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| SttError::Network(e.without_url()))?;
        let parsed: RecognizeResponse = serde_json::from_slice(&body)?;
        let words = collect_words(parsed)?;

        info!(
            words = words.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transcription complete"
        );
        Ok(words)
    }
}

/// Flatten the top alternative of every result into one word stream.
fn collect_words(response: RecognizeResponse) -> SttResult<Vec<WordTimestamp>> {
    let mut words = Vec::new();

    for result in response.results {
        let Some(best) = result.alternatives.into_iter().next() else {
            continue;
        };
        if best.words.is_empty() && !best.transcript.trim().is_empty() {
            warn!("Transcript segment without word offsets ignored");
        }
        for info in best.words {
            let (Some(start), Some(end)) = (info.start_time, info.end_time) else {
                continue;
            };
            let start = parse_duration(&start)?;
            let end = parse_duration(&end)?;
            words.push(WordTimestamp::new(info.word, start, end.max(start)));
        }
    }

    if words.is_empty() {
        return Err(SttError::NoResults);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GoogleSttClient {
        GoogleSttClient::new(SttConfig::new("test-key").with_base_url(server.uri())).unwrap()
    }

    async fn audio_file(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"fake audio").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_transcribe_parses_word_offsets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1p1beta1/speech:recognize"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "config": {
                    "encoding": "MP3",
                    "languageCode": "en-US",
                    "model": "latest_long",
                    "enableWordTimeOffsets": true
                },
                "audio": {"content": STANDARD.encode(b"fake audio")}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"alternatives": [{
                        "transcript": "hello world",
                        "words": [
                            {"word": "hello", "startTime": "0s", "endTime": "0.400s"},
                            {"word": "world", "startTime": "0.400s", "endTime": "1.300s"}
                        ]
                    }]},
                    {"alternatives": [{
                        "transcript": "again",
                        "words": [{"word": "again.", "startTime": "2s", "endTime": "2.500s"}]
                    }]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(&dir, "voice.mp3").await;

        let words = client(&server).transcribe(&audio).await.unwrap();
        assert_eq!(
            words,
            vec![
                WordTimestamp::new("hello", 0.0, 0.4),
                WordTimestamp::new("world", 0.4, 1.3),
                WordTimestamp::new("again.", 2.0, 2.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_results_is_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(&dir, "voice.wav").await;

        let result = client(&server).transcribe(&audio).await;
        assert!(matches!(result, Err(SttError::NoResults)));
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(&dir, "voice.flac").await;

        match client(&server).transcribe(&audio).await {
            Err(SttError::RequestFailed { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("not valid"));
            }
            other => panic!("expected RequestFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_extension_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = audio_file(&dir, "voice.aac").await;

        let result = client(&server).transcribe(&audio).await;
        assert!(matches!(result, Err(SttError::UnsupportedAudio(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", SttConfig::new("secret-key"));
        assert!(!rendered.contains("secret-key"));
    }
}
