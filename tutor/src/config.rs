use crate::models::Language;
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Everything the gateway needs to reach the model. Built once and handed
/// to [`crate::GeminiService::new`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Reads `GEMINI_API_KEY`, `GEMINI_BASE_URL`, `GEMINI_MODEL`,
    /// `GEMINI_TEMPERATURE` and `GEMINI_MAX_OUTPUT_TOKENS`. A missing key is
    /// only logged; requests made without one are rejected by the API itself.
    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
            log::warn!("GEMINI_API_KEY environment variable not set");
            String::new()
        });

        let mut config = Self::new(api_key);

        if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(raw) = env::var("GEMINI_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(temperature) => config.temperature = temperature,
                Err(_) => log::warn!("Ignoring invalid GEMINI_TEMPERATURE: {}", raw),
            }
        }
        if let Ok(raw) = env::var("GEMINI_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = parse_max_output_tokens(&raw);
        }

        config
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Positive token limits only; anything else leaves the model default.
fn parse_max_output_tokens(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(limit) if limit > 0 => Some(limit),
        _ => {
            log::warn!("Ignoring invalid GEMINI_MAX_OUTPUT_TOKENS: {}", raw);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub gateway: GatewayConfig,
    pub language: Language,
}

impl TutorConfig {
    /// Reads `TUTOR_LANGUAGE` plus everything [`GatewayConfig::from_env`]
    /// reads.
    pub fn from_env() -> Self {
        let language = match env::var("TUTOR_LANGUAGE") {
            Ok(raw) => Language::parse(&raw).unwrap_or_else(|| {
                log::warn!("Unknown TUTOR_LANGUAGE {:?}, falling back to Arabic", raw);
                Language::Ar
            }),
            Err(_) => Language::Ar,
        };

        Self {
            gateway: GatewayConfig::from_env(),
            language,
        }
    }
}
