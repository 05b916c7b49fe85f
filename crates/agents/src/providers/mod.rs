pub mod gemini;

use std::{sync::Arc, time::Duration};

use synapse_config::{GeminiConfig, ModelConfig};

use crate::model::GenerativeModel;

/// The two models a relay turn can use.
#[derive(Clone)]
pub struct RelayModels {
    /// Multi-turn text conversations.
    pub text: Arc<dyn GenerativeModel>,
    /// Single-shot image + text prompts.
    pub image: Arc<dyn GenerativeModel>,
}

/// Build the text and image providers from the Gemini config section.
#[must_use]
pub fn gemini_models(config: &GeminiConfig) -> RelayModels {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let build = |model: &ModelConfig| -> Arc<dyn GenerativeModel> {
        let provider = gemini::GeminiProvider::new(
            config.api_key.clone(),
            model.clone(),
            config.safety.clone(),
            config.base_url.clone(),
        );
        Arc::new(provider.with_timeout(timeout))
    };
    RelayModels {
        text: build(&config.text),
        image: build(&config.image),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_distinct_text_and_image_models() {
        let mut config = GeminiConfig::default();
        config.image.model = "gemini-1.5-pro".into();
        config.request_timeout_secs = 5;

        let models = gemini_models(&config);
        assert_eq!(models.text.name(), "gemini");
        assert_eq!(models.text.id(), "gemini-2.0-flash");
        assert_eq!(models.image.id(), "gemini-1.5-pro");
    }
}
