//! Static model catalog and model resolution.

use crate::error::Error;
use std::borrow::Cow;
use std::collections::HashMap;

/// Model used when no model id is configured.
pub const DEFAULT_MODEL_ID: &str = "deca-2.5-pro";

/// Endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.genlabs.dev/deca/v1";

/// Temperature used when the configuration does not override it.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Capabilities and pricing of a single model. Prices are USD per token.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    /// Maximum tokens the model may generate in one response.
    pub max_tokens: u32,
    pub context_window: u32,
    pub supports_images: bool,
    pub supports_prompt_cache: bool,
    pub input_price: f64,
    pub output_price: f64,
    /// Price of writing prompt-cache tokens, if the model charges for it.
    pub cache_writes_price: Option<f64>,
    /// Price of reading prompt-cache tokens, if the model charges for it.
    pub cache_reads_price: Option<f64>,
    pub description: Cow<'static, str>,
}

impl ModelDescriptor {
    /// Text-only model without prompt caching.
    pub const fn new(max_tokens: u32, context_window: u32, input: f64, output: f64) -> Self {
        Self {
            max_tokens,
            context_window,
            supports_images: false,
            supports_prompt_cache: false,
            input_price: input,
            output_price: output,
            cache_writes_price: None,
            cache_reads_price: None,
            description: Cow::Borrowed(""),
        }
    }

    pub const fn with_cache(mut self, write: f64, read: f64) -> Self {
        self.supports_prompt_cache = true;
        self.cache_writes_price = Some(write);
        self.cache_reads_price = Some(read);
        self
    }

    pub const fn with_images(mut self) -> Self {
        self.supports_images = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }
}

const DECA_2_5_PRO: ModelDescriptor = ModelDescriptor {
    max_tokens: 64_000,
    context_window: 200_000,
    supports_images: false,
    supports_prompt_cache: false,
    input_price: 0.0,
    output_price: 0.0,
    cache_writes_price: None,
    cache_reads_price: None,
    description: Cow::Borrowed(
        "Agentica's deca-2.5-pro general-purpose reasoning and coding model (OpenAI-compatible).",
    ),
};

/// Models known to the Agentica endpoint.
static BUILTIN_MODELS: &[(&str, ModelDescriptor)] = &[(DEFAULT_MODEL_ID, DECA_2_5_PRO)];

/// Immutable id -> descriptor map with a default entry.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    default_id: String,
    models: HashMap<String, ModelDescriptor>,
}

impl ModelCatalog {
    /// Create an empty catalog whose fallback is `default_id`.
    pub fn new(default_id: impl Into<String>) -> Self {
        Self {
            default_id: default_id.into(),
            models: HashMap::new(),
        }
    }

    /// The catalog of models served by the Agentica endpoint.
    pub fn builtin() -> Self {
        BUILTIN_MODELS
            .iter()
            .fold(Self::new(DEFAULT_MODEL_ID), |catalog, (id, info)| {
                catalog.with_model(*id, info.clone())
            })
    }

    /// Add a model to the catalog.
    pub fn with_model(mut self, id: impl Into<String>, info: ModelDescriptor) -> Self {
        self.models.insert(id.into(), info);
        self
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Resolve a requested model id, falling back to the default id.
    ///
    /// An absent or empty request resolves to the default. An unknown
    /// request also resolves to the default; only a missing default fails.
    pub fn resolve(&self, requested: Option<&str>) -> Result<(&str, &ModelDescriptor), Error> {
        let requested = requested.filter(|id| !id.is_empty());

        if let Some(id) = requested {
            if let Some((key, info)) = self.models.get_key_value(id) {
                return Ok((key.as_str(), info));
            }
            tracing::debug!(
                requested = id,
                default = %self.default_id,
                "unknown model id, falling back to default"
            );
        }

        self.models
            .get_key_value(&self.default_id)
            .map(|(key, info)| (key.as_str(), info))
            .ok_or_else(|| {
                let id = requested.unwrap_or(self.default_id.as_str());
                Error::UnknownModel(id.to_string())
            })
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A model ready for use in a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub id: String,
    pub info: ModelDescriptor,
    /// Output token limit sent with streaming requests.
    pub max_tokens: u32,
    pub temperature: f32,
}
