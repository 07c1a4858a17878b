//! Statically validated embedding model configuration.
//!
//! A model is declared as JSON:
//!
//! ```json
//! {
//!   "class": "dev.langchain4j.model.mistralai.MistralAiEmbeddingModel",
//!   "name": "mistral-1",
//!   "params": {
//!     "baseUrl": "https://api.mistral.ai/v1",
//!     "apiKey": "secret",
//!     "modelName": "mistral-embed",
//!     "timeout": 60,
//!     "logRequests": true,
//!     "logResponses": true,
//!     "maxSegmentsPerBatch": 50
//!   }
//! }
//! ```
//!
//! Unknown parameter names are rejected when the configuration is loaded.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, VecQueryError};

/// Options recognized for every embedding model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawParams", into = "RawParams")]
pub struct EmbeddingModelParams {
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Log outgoing requests.
    pub log_requests: Option<bool>,
    /// Log incoming responses.
    pub log_responses: Option<bool>,
    /// Maximum number of text segments embedded per call.
    pub max_segments_per_batch: Option<u32>,
    /// Provider API key.
    pub api_key: Option<String>,
    /// Provider model name.
    pub model_name: Option<String>,
    /// Provider base URL.
    pub base_url: Option<String>,
    /// Provider endpoint.
    pub endpoint: Option<String>,
    /// Provider user name.
    pub user: Option<String>,
}

/// Wire form of [`EmbeddingModelParams`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_requests: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_responses: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_segments_per_batch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

impl TryFrom<RawParams> for EmbeddingModelParams {
    type Error = VecQueryError;

    fn try_from(raw: RawParams) -> Result<Self> {
        if raw.timeout == Some(0) {
            return Err(VecQueryError::invalid_config(
                "timeout must be a positive number of seconds",
            ));
        }
        if raw.max_segments_per_batch == Some(0) {
            return Err(VecQueryError::invalid_config(
                "maxSegmentsPerBatch must be positive",
            ));
        }

        Ok(EmbeddingModelParams {
            timeout: raw.timeout.map(Duration::from_secs),
            log_requests: raw.log_requests,
            log_responses: raw.log_responses,
            max_segments_per_batch: raw.max_segments_per_batch,
            api_key: raw.api_key,
            model_name: raw.model_name,
            base_url: raw.base_url,
            endpoint: raw.endpoint,
            user: raw.user,
        })
    }
}

impl From<EmbeddingModelParams> for RawParams {
    fn from(params: EmbeddingModelParams) -> Self {
        RawParams {
            timeout: params.timeout.map(|timeout| timeout.as_secs()),
            log_requests: params.log_requests,
            log_responses: params.log_responses,
            max_segments_per_batch: params.max_segments_per_batch,
            api_key: params.api_key,
            model_name: params.model_name,
            base_url: params.base_url,
            endpoint: params.endpoint,
            user: params.user,
        }
    }
}

/// Declaration of one embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingModelConfig {
    /// Provider implementation the host instantiates.
    #[serde(rename = "class")]
    pub class_name: String,
    /// Name queries refer to the model by.
    pub name: String,
    /// Provider options.
    #[serde(default)]
    pub params: EmbeddingModelParams,
}

impl EmbeddingModelConfig {
    /// Create a builder.
    pub fn builder<C: Into<String>, N: Into<String>>(
        class_name: C,
        name: N,
    ) -> EmbeddingModelConfigBuilder {
        EmbeddingModelConfigBuilder {
            config: EmbeddingModelConfig {
                class_name: class_name.into(),
                name: name.into(),
                params: EmbeddingModelParams::default(),
            },
        }
    }

    /// Load a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: EmbeddingModelConfig = serde_json::from_str(text).map_err(|e| {
            VecQueryError::invalid_config(format!("invalid embedding model configuration: {e}"))
        })?;
        config.validate()
    }

    /// Load a configuration from a JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let config: EmbeddingModelConfig = serde_json::from_value(value).map_err(|e| {
            VecQueryError::invalid_config(format!("invalid embedding model configuration: {e}"))
        })?;
        config.validate()
    }

    /// Serialize to JSON text.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(self) -> Result<Self> {
        if self.class_name.trim().is_empty() {
            return Err(VecQueryError::invalid_config(
                "embedding model class must not be empty",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(VecQueryError::invalid_config(
                "embedding model name must not be empty",
            ));
        }
        debug!(name = %self.name, class = %self.class_name, "loaded embedding model configuration");
        Ok(self)
    }
}

/// Builder for [`EmbeddingModelConfig`].
#[derive(Debug, Clone)]
pub struct EmbeddingModelConfigBuilder {
    config: EmbeddingModelConfig,
}

impl EmbeddingModelConfigBuilder {
    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.params.timeout = Some(timeout);
        self
    }

    /// Enable or disable request logging.
    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.config.params.log_requests = Some(enabled);
        self
    }

    /// Enable or disable response logging.
    pub fn log_responses(mut self, enabled: bool) -> Self {
        self.config.params.log_responses = Some(enabled);
        self
    }

    /// Set the batch size.
    pub fn max_segments_per_batch(mut self, max: u32) -> Self {
        self.config.params.max_segments_per_batch = Some(max);
        self
    }

    /// Set the API key.
    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.config.params.api_key = Some(api_key.into());
        self
    }

    /// Set the provider model name.
    pub fn model_name<S: Into<String>>(mut self, model_name: S) -> Self {
        self.config.params.model_name = Some(model_name.into());
        self
    }

    /// Set the base URL.
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.params.base_url = Some(base_url.into());
        self
    }

    /// Set the endpoint.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.params.endpoint = Some(endpoint.into());
        self
    }

    /// Set the user.
    pub fn user<S: Into<String>>(mut self, user: S) -> Self {
        self.config.params.user = Some(user.into());
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<EmbeddingModelConfig> {
        let params = &self.config.params;
        if let Some(timeout) = params.timeout {
            if timeout.as_secs() == 0 {
                return Err(VecQueryError::invalid_config(
                    "timeout must be a positive number of seconds",
                ));
            }
            if timeout.subsec_nanos() != 0 {
                return Err(VecQueryError::invalid_config(
                    "timeout must be a whole number of seconds",
                ));
            }
        }
        if params.max_segments_per_batch == Some(0) {
            return Err(VecQueryError::invalid_config(
                "maxSegmentsPerBatch must be positive",
            ));
        }
        self.config.validate()
    }
}
