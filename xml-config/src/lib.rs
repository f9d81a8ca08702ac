//! Configuration for `xmlfmt` and `xml-lsp`.
//!
//! Three sections: `[format]` mirrors the engine's `xml.format` settings,
//! `[indent]` supplies indentation when no editor does (CLI runs), and
//! `[logging]` sets the default tracing filter.
//!
//! The defaults live in `defaults/xml.default.toml`, compiled into both
//! binaries. A [`Loader`] starts from them and layers a user file and
//! individual flag overrides on top before deserializing an [`XmlConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use xml_format::{FormatSettings, IndentOptions, WrapAttributes};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/xml.default.toml");

/// Top-level configuration consumed by `xmlfmt` and `xml-lsp`.
#[derive(Debug, Clone, Deserialize)]
pub struct XmlConfig {
    pub format: FormatConfig,
    pub indent: IndentConfig,
    pub logging: LoggingConfig,
}

/// Mirrors the `xml.format` settings understood by the engine.
#[derive(Debug, Clone, Deserialize)]
pub struct FormatConfig {
    pub enable: bool,
    pub preserve_new_lines: bool,
    pub max_preserve_new_lines: Option<usize>,
    pub wrap_line_length: Option<usize>,
    pub indent_inner_xml: bool,
    pub wrap_attributes: WrapAttributes,
    pub wrap_attributes_indent_size: Option<usize>,
    pub unformatted_content_delimiter: Option<String>,
}

/// Indentation used when no editor supplies it (CLI runs).
#[derive(Debug, Clone, Deserialize)]
pub struct IndentConfig {
    pub width: usize,
    pub use_spaces: bool,
    pub insert_final_newline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl From<&FormatConfig> for FormatSettings {
    fn from(config: &FormatConfig) -> Self {
        Self {
            enabled: config.enable,
            preserve_new_lines: config.preserve_new_lines,
            max_preserve_new_lines: config.max_preserve_new_lines,
            wrap_line_length: config.wrap_line_length,
            indent_inner_xml: config.indent_inner_xml,
            wrap_attributes: config.wrap_attributes,
            wrap_attributes_indent_size: config.wrap_attributes_indent_size,
            unformatted_content_delimiter: config.unformatted_content_delimiter.clone(),
        }
    }
}

impl From<&IndentConfig> for IndentOptions {
    fn from(config: &IndentConfig) -> Self {
        let options = if config.use_spaces {
            IndentOptions::spaces(config.width)
        } else {
            IndentOptions::tabs()
        };
        options.with_final_newline(config.insert_final_newline)
    }
}

impl XmlConfig {
    pub fn format_settings(&self) -> FormatSettings {
        FormatSettings::from(&self.format)
    }

    pub fn indent_options(&self) -> IndentOptions {
        IndentOptions::from(&self.indent)
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Loader holding only the compiled-in defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file passed with `--config`. `build` fails if it is missing.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a TOML file that may not exist, such as `xmlfmt.toml` in the working directory.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `indent.width` from a CLI flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge all layers and deserialize them.
    pub fn build(self) -> Result<XmlConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = Loader::new().build().expect("defaults to deserialize");
        assert!(config.format.enable);
        assert_eq!(config.format.max_preserve_new_lines, None);
        assert_eq!(config.format.wrap_attributes, WrapAttributes::Auto);
        assert_eq!(config.indent.width, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn defaults_match_engine_defaults() {
        let config = Loader::new().build().expect("defaults to deserialize");
        assert_eq!(config.format_settings(), FormatSettings::default());
        assert_eq!(
            config.indent_options(),
            IndentOptions::default().with_final_newline(true)
        );
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("format.wrap_attributes", "force-aligned")
            .expect("override to apply")
            .set_override("indent.use_spaces", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.format.wrap_attributes, WrapAttributes::ForceAligned);
        assert_eq!(config.indent_options().indent_unit(), "\t");
    }

    #[test]
    fn user_file_layers_over_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            "[format]\nmax_preserve_new_lines = 1\nunformatted_content_delimiter = \"<!-- raw -->\""
        )
        .expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        let settings = config.format_settings();
        assert_eq!(settings.max_preserve_new_lines, Some(1));
        assert_eq!(
            settings.unformatted_content_delimiter.as_deref(),
            Some("<!-- raw -->")
        );
        assert!(settings.preserve_new_lines);
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/xmlfmt.toml")
            .build()
            .expect("config to build");
        assert!(config.format.enable);
    }

    #[test]
    fn missing_required_file_fails() {
        assert!(Loader::new()
            .with_file("/nonexistent/xmlfmt.toml")
            .build()
            .is_err());
    }
}
