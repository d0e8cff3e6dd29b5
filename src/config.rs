//! Compiler configuration: target-level knobs orthogonal to the C-subset
//! semantics itself (comment verbosity, section naming, diagnostic
//! collection limits). Mirrors the corpus's `CompilerConfig` builder
//! pattern, extended with TOML loading for the CLI's `--config` flag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Configuration for the `ttkcc` compiler.
///
/// `frame_pointer_reg`/`stack_pointer_reg` record the intended ABI register
/// choice for tooling and documentation purposes; the code generator's
/// frame layout (`codegen::state`, `codegen::asm::Reg::FP`/`Reg::SP`) is
/// currently fixed to `R6`/`R7` regardless of this setting, matching §4.5 --
/// changing it here does not retarget codegen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Emit `; -- data --`/`; -- bss --` section banners in the rendered
    /// assembly.
    pub comments: bool,
    pub data_section_name: String,
    pub bss_section_name: String,
    pub frame_pointer_reg: String,
    pub stack_pointer_reg: String,
    /// Cap on diagnostics collected by a single compilation before later
    /// analysis stages stop reporting new ones.
    pub diagnostics_cap: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            comments: true,
            data_section_name: "data".to_string(),
            bss_section_name: "bss".to_string(),
            frame_pointer_reg: "R6".to_string(),
            stack_pointer_reg: "R7".to_string(),
            diagnostics_cap: 64,
        }
    }
}

impl CompilerConfig {
    #[must_use]
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    #[must_use]
    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    #[must_use]
    pub fn with_data_section_name(mut self, name: impl Into<String>) -> Self {
        self.data_section_name = name.into();
        self
    }

    #[must_use]
    pub fn with_bss_section_name(mut self, name: impl Into<String>) -> Self {
        self.bss_section_name = name.into();
        self
    }

    #[must_use]
    pub fn with_diagnostics_cap(mut self, cap: usize) -> Self {
        self.diagnostics_cap = cap;
        self
    }

    /// Parses a `CompilerConfig` from TOML text; fields absent from the
    /// document fall back to `Default`.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError)
    }
}

/// Wraps `toml::de::Error` so callers of `from_toml_str` don't need a direct
/// dependency on the `toml` crate's error type.
#[derive(Debug)]
pub struct ConfigError(toml::de::Error);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid compiler configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_target_abi() {
        let config = CompilerConfig::default();
        assert_eq!(config.frame_pointer_reg, "R6");
        assert_eq!(config.stack_pointer_reg, "R7");
        assert_eq!(config.diagnostics_cap, 64);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = CompilerConfig::new().with_comments(false).with_diagnostics_cap(8);
        assert!(!config.comments);
        assert_eq!(config.diagnostics_cap, 8);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = CompilerConfig::from_toml_str("comments = false\n").unwrap();
        assert!(!config.comments);
        assert_eq!(config.bss_section_name, "bss");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(CompilerConfig::from_toml_str("not valid toml [[[").is_err());
    }
}
