//! Pipeline configuration.
//!
//! Mirrors `seqc::config::CompilerConfig`'s shape (a serde-derived struct,
//! optionally loaded from a TOML file) but carries only tracing toggles:
//! none of these fields change pipeline semantics, they only gate extra
//! `tracing` output (and, for `emit_descriptor_table`, whether `picoc`
//! prints the descriptor table alongside the STG dump). Omitting a
//! `--config` file entirely leaves today's fixed behavior unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use pico_compiler::PipelineConfig;
//!
//! let config = PipelineConfig::from_toml_str(&std::fs::read_to_string("pico.toml")?)?;
//! let stg_program = pico_compiler::compile_program_with_config(program, &config)?;
//! ```

use serde::{Deserialize, Serialize};

/// Configuration for the PicoHaskell pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Emit a `debug`-level `tracing` event for every dependency-analysis
    /// SCC group as it is produced (§4.1).
    pub trace_dependency_groups: bool,

    /// Emit a `trace`-level `tracing` event for every unification step that
    /// binds a type or kind variable.
    pub trace_unification: bool,

    /// Have `picoc` print the data-constructor descriptor table alongside
    /// the STG dump, rather than only the lambda-form bindings.
    pub emit_descriptor_table: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            trace_dependency_groups: false,
            trace_unification: false,
            emit_descriptor_table: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        PipelineConfig::default()
    }

    /// Parse a config from TOML text, as loaded from a `--config` file.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_every_toggle_off() {
        let config = PipelineConfig::default();
        assert!(!config.trace_dependency_groups);
        assert!(!config.trace_unification);
        assert!(!config.emit_descriptor_table);
    }

    #[test]
    fn parses_a_partial_toml_document() {
        let config = PipelineConfig::from_toml_str("trace_unification = true\n").unwrap();
        assert!(config.trace_unification);
        assert!(!config.trace_dependency_groups);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(PipelineConfig::from_toml_str("not = [valid").is_err());
    }
}
