//! Pipeline configuration.
//!
//! A single knob matters to the core: the wire separator character. The
//! separator is validated once, up front, by constructing a
//! [`TextEscaper`](crate::fusestream::serialization::text::TextEscaper)
//! against it, so every later escape is infallible.

use crate::fusestream::pipeline::error::PipelineResult;
use crate::fusestream::serialization::text::{TextEscaper, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};

/// Runtime configuration for stage execution and the wire codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Key/value separator on the wire; must not be the newline character.
    #[serde(default = "default_separator")]
    pub separator: char,
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl PipelineConfig {
    /// Build a configuration with an explicit separator, validating it.
    pub fn with_separator(separator: char) -> PipelineResult<Self> {
        let config = PipelineConfig { separator };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from YAML text and validate it.
    pub fn from_yaml(yaml: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml).map_err(|e| {
            crate::fusestream::pipeline::error::PipelineError::invalid_configuration(format!(
                "malformed pipeline configuration: {}",
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configured separator admits a legal escaping scheme.
    pub fn validate(&self) -> PipelineResult<()> {
        TextEscaper::new(self.separator).map(|_| ())
    }

    /// Build the escaper for this configuration.
    pub fn escaper(&self) -> PipelineResult<TextEscaper> {
        TextEscaper::new(self.separator)
    }
}
