//! Process-wide configuration, read once from the environment at startup.
//!
//! The resulting `Settings` value is immutable and lives inside `AppContext`
//! for the lifetime of the process. Every knob has a default except the
//! inference credential and model name, which fail startup when absent.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "docscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address for the HTTP server.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8003";

/// Default OpenAI-compatible API root.
const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default PDF rasterization resolution. 200 DPI balances legibility
/// against inference payload size (minimum recommended is 150).
pub const DEFAULT_RENDER_DPI: u32 = 200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

/// Which text acquisition variant to use for images.
///
/// The two variants are interchangeable behind the `TextAcquirer` trait;
/// vision delegation is the default because it needs no local model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    /// Delegate to a vision-capable inference call.
    Vision,
    /// Local OCR pass after grayscale + Otsu binarization.
    LocalOcr,
}

/// Immutable process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bearer credential for the inference backend.
    pub api_key: String,
    /// OpenAI-compatible API root (override to point at a local gateway).
    pub api_base_url: String,
    /// Model identifier used for classification, extraction and vision calls.
    pub model_name: String,
    /// Sampling temperature. 0 keeps extraction deterministic.
    pub temperature: f32,
    /// ISO 639-1 language code extracted values are translated into.
    pub default_language: String,
    /// When false, the translation clause is omitted from prompts entirely.
    pub enable_translation: bool,
    /// HTTP server bind address.
    pub bind_addr: SocketAddr,
    /// PDF page rasterization resolution.
    pub render_dpi: u32,
    /// Image text acquisition variant.
    pub acquisition: AcquisitionMode,
    /// Directory holding det.onnx / latin_rec.onnx / latin_dict.txt for
    /// the local OCR variant. Only consulted when `acquisition` is LocalOcr.
    pub ocr_model_dir: Option<PathBuf>,
    /// Timeout for individual inference backend calls.
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Read settings from the environment. Called exactly once, in `main`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require("OPENAI_API_KEY")?;
        let model_name = require("MODEL_NAME")?;

        let default_bind: SocketAddr = DEFAULT_BIND_ADDR
            .parse()
            .expect("default bind address is well-formed");

        let acquisition = match std::env::var("TEXT_ACQUISITION").ok().as_deref() {
            None | Some("vision") => AcquisitionMode::Vision,
            Some("local-ocr") => AcquisitionMode::LocalOcr,
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    var: "TEXT_ACQUISITION",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            api_key,
            api_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            model_name,
            temperature: parse_or("MODEL_TEMPERATURE", 0.0)?,
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
            enable_translation: parse_or("ENABLE_TRANSLATION", false)?,
            bind_addr: parse_or("BIND_ADDR", default_bind)?,
            render_dpi: parse_or("PDF_RENDER_DPI", DEFAULT_RENDER_DPI)?,
            acquisition,
            ocr_model_dir: std::env::var("OCR_MODEL_DIR").ok().map(PathBuf::from),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 120)?,
        })
    }

    /// Settings for tests: no network, deterministic defaults.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            api_key: "test-key".into(),
            api_base_url: DEFAULT_API_BASE_URL.into(),
            model_name: "test-model".into(),
            temperature: 0.0,
            default_language: "en".into(),
            enable_translation: false,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            render_dpi: DEFAULT_RENDER_DPI,
            acquisition: AcquisitionMode::Vision,
            ocr_model_dir: None,
            request_timeout_secs: 5,
        }
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

/// Parse an env var with a default when unset. An unparsable value is a
/// startup error, not a silent fallback.
fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            var,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let s = Settings::for_tests();
        assert_eq!(s.temperature, 0.0);
        assert_eq!(s.default_language, "en");
        assert!(!s.enable_translation);
        assert_eq!(s.render_dpi, DEFAULT_RENDER_DPI);
        assert_eq!(s.acquisition, AcquisitionMode::Vision);
    }

    #[test]
    fn render_dpi_default_is_legible() {
        // Minimum recommended rasterization resolution is 150 DPI.
        assert!(DEFAULT_RENDER_DPI >= 150);
    }

    #[test]
    fn app_name() {
        assert_eq!(APP_NAME, "docscan");
        assert_eq!(APP_VERSION, "1.0.0");
    }

    // Env-var names below are unique per test: the test harness runs
    // tests in parallel within one process.

    #[test]
    fn parse_or_falls_back_when_unset() {
        std::env::remove_var("DOCSCAN_TEST_PARSE_UNSET");
        assert_eq!(parse_or("DOCSCAN_TEST_PARSE_UNSET", 42u32).unwrap(), 42);
    }

    #[test]
    fn parse_or_uses_set_value() {
        std::env::set_var("DOCSCAN_TEST_PARSE_SET", "300");
        assert_eq!(parse_or("DOCSCAN_TEST_PARSE_SET", 0u32).unwrap(), 300);
        std::env::remove_var("DOCSCAN_TEST_PARSE_SET");
    }

    #[test]
    fn parse_or_rejects_garbage_instead_of_defaulting() {
        std::env::set_var("DOCSCAN_TEST_PARSE_BAD", "not-a-number");
        match parse_or("DOCSCAN_TEST_PARSE_BAD", 0u32) {
            Err(ConfigError::InvalidVar { var, value }) => {
                assert_eq!(var, "DOCSCAN_TEST_PARSE_BAD");
                assert_eq!(value, "not-a-number");
            }
            other => panic!("expected InvalidVar, got {other:?}"),
        }
        std::env::remove_var("DOCSCAN_TEST_PARSE_BAD");
    }

    #[test]
    fn require_returns_set_value() {
        std::env::set_var("DOCSCAN_TEST_REQ_SET", "secret");
        assert_eq!(require("DOCSCAN_TEST_REQ_SET").unwrap(), "secret");
        std::env::remove_var("DOCSCAN_TEST_REQ_SET");
    }

    #[test]
    fn require_rejects_missing_var() {
        std::env::remove_var("DOCSCAN_TEST_REQ_MISSING");
        assert!(matches!(
            require("DOCSCAN_TEST_REQ_MISSING"),
            Err(ConfigError::MissingVar("DOCSCAN_TEST_REQ_MISSING"))
        ));
    }

    #[test]
    fn require_rejects_blank_var() {
        std::env::set_var("DOCSCAN_TEST_REQ_BLANK", "   ");
        assert!(matches!(
            require("DOCSCAN_TEST_REQ_BLANK"),
            Err(ConfigError::MissingVar("DOCSCAN_TEST_REQ_BLANK"))
        ));
        std::env::remove_var("DOCSCAN_TEST_REQ_BLANK");
    }
}
