use std::time::Duration;

use {
    async_trait::async_trait,
    base64::{Engine as _, engine::general_purpose::STANDARD},
    secrecy::{ExposeSecret, Secret},
    synapse_config::{ModelConfig, SafetySetting},
    tracing::{debug, trace, warn},
};

use crate::model::{Content, GenerativeModel, Part};

/// Information about a Gemini model returned from the API.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelInfo {
    /// Full resource name (e.g., "models/gemini-2.0-flash")
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub input_token_limit: u32,
    #[serde(default)]
    pub output_token_limit: u32,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl GeminiModelInfo {
    /// "models/gemini-2.0-flash" -> "gemini-2.0-flash"
    pub fn model_id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Upper bound on one Gemini HTTP exchange unless overridden with
/// [`GeminiProvider::with_timeout`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// List models that support `generateContent`, sorted by name.
pub async fn list_models(api_key: &str, base_url: &str) -> anyhow::Result<Vec<GeminiModelInfo>> {
    let client = reqwest::Client::new();
    let mut all_models = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut request = client
            .get(format!("{base_url}/v1beta/models"))
            .header("x-goog-api-key", api_key)
            .timeout(DEFAULT_REQUEST_TIMEOUT);
        if let Some(ref token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Failed to list Gemini models: HTTP {status}: {body}");
        }

        let list_resp: ListModelsResponse = resp.json().await?;
        all_models.extend(list_resp.models);

        match list_resp.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    let mut models: Vec<_> = all_models
        .into_iter()
        .filter(GeminiModelInfo::supports_generation)
        .collect();
    models.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(models)
}

/// Gemini `generateContent` client bound to one model and its generation
/// parameters.
pub struct GeminiProvider {
    api_key: Secret<String>,
    model: ModelConfig,
    safety: Vec<SafetySetting>,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: Secret<String>,
        model: ModelConfig,
        safety: Vec<SafetySetting>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key,
            model,
            safety,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, contents: &[Content]) -> serde_json::Value {
        serde_json::json!({
            "contents": to_gemini_contents(contents),
            "generationConfig": {
                "temperature": self.model.temperature,
                "topP": self.model.top_p,
                "topK": self.model.top_k,
                "maxOutputTokens": self.model.max_output_tokens,
            },
            "safetySettings": self.safety,
        })
    }
}

/// Convert typed contents to Gemini's `contents` array.
///
/// Images travel as `inlineData` with base64 payloads.
fn to_gemini_contents(contents: &[Content]) -> Vec<serde_json::Value> {
    contents
        .iter()
        .map(|content| {
            let parts: Vec<serde_json::Value> = content
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => serde_json::json!({ "text": text }),
                    Part::InlineData { mime_type, data } => serde_json::json!({
                        "inlineData": {
                            "mimeType": mime_type,
                            "data": STANDARD.encode(data),
                        }
                    }),
                })
                .collect();
            serde_json::json!({
                "role": content.role.as_str(),
                "parts": parts,
            })
        })
        .collect()
}

/// Extract text content from Gemini response parts.
fn extract_text(parts: &[serde_json::Value]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    }
}

/// Pull the reply text out of a `generateContent` response.
///
/// A response with no text is an error: either the prompt was blocked
/// (`promptFeedback.blockReason`) or the candidate stopped for a non-text
/// reason such as `SAFETY`.
fn response_text(resp: &serde_json::Value) -> anyhow::Result<String> {
    let candidate = &resp["candidates"][0];
    if candidate.is_null() {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            anyhow::bail!("response blocked: {reason}");
        }
        anyhow::bail!("Gemini returned no candidates");
    }

    let parts = candidate["content"]["parts"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    match extract_text(parts) {
        Some(text) => Ok(text),
        None => {
            let reason = candidate["finishReason"].as_str().unwrap_or("UNKNOWN");
            anyhow::bail!("response blocked: finish reason {reason}")
        },
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn id(&self) -> &str {
        &self.model.model
    }

    async fn generate(&self, contents: &[Content]) -> anyhow::Result<String> {
        let body = self.request_body(contents);

        debug!(
            model = %self.model.model,
            contents_count = contents.len(),
            "gemini generate request"
        );
        trace!(body = %body, "gemini request body");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model.model
        );

        let http_resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "gemini API error");
            anyhow::bail!("Gemini API error HTTP {status}: {body_text}");
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "gemini raw response");

        let text = response_text(&resp)?;
        debug!(
            model = %self.model.model,
            output_tokens = resp["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0),
            "gemini generate complete"
        );
        Ok(text)
    }
}
