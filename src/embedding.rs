//! Embedding model configuration.
//!
//! Models that turn text into query vectors are provided by the host. This
//! module only carries their statically validated configuration.

pub mod config;

pub use self::config::{EmbeddingModelConfig, EmbeddingModelConfigBuilder, EmbeddingModelParams};
