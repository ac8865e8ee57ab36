//! Streaming completion adapter.

use crate::catalog::{ModelCatalog, ResolvedModel, DEFAULT_TEMPERATURE};
use crate::config::AdapterConfig;
use crate::error::Error;
use crate::protocol;
use crate::stream::EventStream;
use crate::transport::{ByteStream, HttpTransport, Transport};
use crate::types::{Message, MessageMetadata, Usage};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Event stream returned by [`CompletionAdapter::create_message`].
pub type ConversationStream = EventStream<ByteStream>;

/// Lifecycle state of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// No transport yet; network operations fail with `NotReady`.
    Uninitialized,
    /// A transport is installed.
    Ready,
}

/// Turns an OpenAI-compatible chat endpoint into a stream of text and usage events.
///
/// Configuration is read-only after construction and every call owns its
/// own request, so one adapter can be shared across tasks.
pub struct CompletionAdapter {
    config: AdapterConfig,
    catalog: ModelCatalog,
    transport: OnceCell<Arc<dyn Transport>>,
}

impl CompletionAdapter {
    /// Create an adapter over the built-in catalog.
    ///
    /// With an API key the adapter is `Ready`; without one it stays
    /// `Uninitialized` until [`connect`](Self::connect) or
    /// [`install_transport`](Self::install_transport) is called.
    pub fn new(config: AdapterConfig) -> Result<Self, Error> {
        Self::with_catalog(config, ModelCatalog::builtin())
    }

    /// Create an adapter over a custom catalog.
    pub fn with_catalog(config: AdapterConfig, catalog: ModelCatalog) -> Result<Self, Error> {
        let transport = OnceCell::new();
        if let Some(key) = config.api_key() {
            let http = HttpTransport::new(&config.base_url, key, config.timeout)?;
            let _ = transport.set(Arc::new(http) as Arc<dyn Transport>);
        } else {
            tracing::debug!("no API key configured, adapter starts uninitialized");
        }

        Ok(Self {
            config,
            catalog,
            transport,
        })
    }

    /// Create an adapter from `AGENTICA_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(AdapterConfig::from_env()?)
    }

    pub fn state(&self) -> AdapterState {
        if self.transport.initialized() {
            AdapterState::Ready
        } else {
            AdapterState::Uninitialized
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Install an HTTP transport using `api_key`.
    pub fn connect(&self, api_key: &SecretString) -> Result<(), Error> {
        let http = HttpTransport::new(&self.config.base_url, api_key, self.config.timeout)?;
        self.install_transport(Arc::new(http))
    }

    /// Install a transport. Succeeds once; later calls fail with `AlreadyInitialized`.
    pub fn install_transport(&self, transport: Arc<dyn Transport>) -> Result<(), Error> {
        self.transport
            .set(transport)
            .map_err(|_| Error::AlreadyInitialized)
    }

    fn transport(&self) -> Result<&Arc<dyn Transport>, Error> {
        self.transport.get().ok_or(Error::NotReady)
    }

    /// Resolve the configured model with its effective sampling parameters.
    pub fn model(&self) -> Result<ResolvedModel, Error> {
        let (id, info) = self.catalog.resolve(self.config.model_id.as_deref())?;
        Ok(ResolvedModel {
            id: id.to_string(),
            info: info.clone(),
            max_tokens: info.max_tokens,
            temperature: self.config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    /// Complete a single prompt without streaming, using the catalog's default model.
    ///
    /// Returns an empty string when the response carries no content.
    pub async fn complete_prompt(&self, prompt: &str) -> Result<String, Error> {
        let (model_id, _) = self.catalog.resolve(None)?;
        let transport = self.transport()?;

        let body = protocol::build_complete_body(model_id, prompt)?;
        tracing::debug!(model = model_id, "sending completion request");

        let text = transport.complete(body).await?;
        protocol::parse_completion(&text)
    }

    /// Stream one conversation turn.
    ///
    /// The request is `[system] + messages`. Events follow chunk order; a
    /// chunk carrying both content and usage yields the text first.
    pub async fn create_message(
        &self,
        system_prompt: &str,
        messages: &[Message],
        metadata: MessageMetadata,
    ) -> Result<ConversationStream, Error> {
        let model = self.model()?;
        let transport = self.transport()?;

        if !model.info.supports_images && messages.iter().any(Message::has_images) {
            tracing::warn!(model = %model.id, "model does not accept images; sending anyway");
        }

        let body = protocol::build_stream_body(&model, system_prompt, messages)?;
        tracing::debug!(
            model = %model.id,
            messages = messages.len(),
            task_id = metadata.task_id.as_deref().unwrap_or("-"),
            mode = metadata.mode.as_deref().unwrap_or("-"),
            "opening completion stream"
        );

        let inner = match &metadata.cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(Error::Cancelled),
                res = transport.open_stream(body) => res?,
            },
            None => transport.open_stream(body).await?,
        };

        let stream = EventStream::new(inner);
        Ok(match metadata.cancellation {
            Some(token) => stream.with_cancellation(token),
            None => stream,
        })
    }

    /// Cost of `usage` under the configured model's pricing.
    ///
    /// Never fails: any error while resolving the model or computing the
    /// cost is logged and reported as zero.
    pub fn calculate_cost(&self, usage: &Usage) -> f64 {
        let cost = self
            .catalog
            .resolve(self.config.model_id.as_deref())
            .and_then(|(_, info)| info.cost(usage));

        match cost {
            Ok(cost) => cost.total(),
            Err(e) => {
                tracing::warn!(error = %e, "cost calculation failed, reporting zero");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ModelDescriptor, DEFAULT_MODEL_ID};

    #[test]
    fn test_state_follows_api_key() {
        let ready = CompletionAdapter::new(AdapterConfig::builder().api_key("k").build()).unwrap();
        assert_eq!(ready.state(), AdapterState::Ready);

        let pending = CompletionAdapter::new(AdapterConfig::default()).unwrap();
        assert_eq!(pending.state(), AdapterState::Uninitialized);

        pending
            .connect(&SecretString::from("k".to_string()))
            .unwrap();
        assert_eq!(pending.state(), AdapterState::Ready);
        assert!(matches!(
            pending.connect(&SecretString::from("k".to_string())),
            Err(Error::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_model_defaults() {
        let adapter = CompletionAdapter::new(AdapterConfig::default()).unwrap();
        let model = adapter.model().unwrap();
        assert_eq!(model.id, DEFAULT_MODEL_ID);
        assert_eq!(model.max_tokens, 64_000);
        assert!((model.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_model_temperature_override() {
        let config = AdapterConfig::builder().temperature(0.0).build();
        let adapter = CompletionAdapter::new(config).unwrap();
        assert_eq!(adapter.model().unwrap().temperature, 0.0);
    }

    #[test]
    fn test_calculate_cost_never_fails() {
        let catalog = ModelCatalog::new("m1")
            .with_model("m1", ModelDescriptor::new(10, 100, 1.0, 2.0))
            .with_model("broken", ModelDescriptor::new(10, 100, f64::NAN, 2.0));
        let usage = Usage::new(3, 4);

        let ok = CompletionAdapter::with_catalog(
            AdapterConfig::builder().model("m1").build(),
            catalog.clone(),
        )
        .unwrap();
        assert!((ok.calculate_cost(&usage) - 11.0).abs() < 1e-10);
        assert_eq!(ok.calculate_cost(&Usage::default()), 0.0);

        let broken = CompletionAdapter::with_catalog(
            AdapterConfig::builder().model("broken").build(),
            catalog,
        )
        .unwrap();
        assert_eq!(broken.calculate_cost(&usage), 0.0);

        let unknown =
            CompletionAdapter::with_catalog(AdapterConfig::default(), ModelCatalog::new("none"))
                .unwrap();
        assert_eq!(unknown.calculate_cost(&usage), 0.0);
    }
}
