use std::path::Path;
use std::time::Duration;

use pki_api::{ClientConfig, DEFAULT_BASE_URL};
use serde::Deserialize;
use tracing::{debug, warn};

/// Environment variable prefix, e.g. `PKI_PORTAL_API_URL`.
pub const ENV_PREFIX: &str = "PKI_PORTAL";

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub toast_duration_ms: u64,
    pub default_page_size: u32,
    /// Published CRL distribution point, shown on the CRL page.
    #[serde(default)]
    pub crl_url: Option<String>,
    pub tick_rate: f64,
    pub frame_rate: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            toast_duration_ms: 4000,
            default_page_size: 10,
            crl_url: None,
            tick_rate: 4.0,
            frame_rate: 30.0,
        }
    }
}

impl Config {
    /// Layers built-in defaults, `config.json5` / `config.toml` from
    /// `config_dir`, `PKI_PORTAL_*` variables and finally `api_url_override`.
    pub fn load(
        config_dir: &Path,
        api_url_override: Option<&str>,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("toast_duration_ms", defaults.toast_duration_ms as i64)?
            .set_default("default_page_size", i64::from(defaults.default_page_size))?
            .set_default("tick_rate", defaults.tick_rate)?
            .set_default("frame_rate", defaults.frame_rate)?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.toml", config::FileFormat::Toml),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            let path = config_dir.join(file);
            builder = builder.add_source(
                config::File::from(path.clone())
                    .format(*format)
                    .required(false),
            );
            if path.exists() {
                debug!(path = %path.display(), "loading configuration file");
                found_config = true;
            }
        }
        if !found_config {
            debug!(dir = %config_dir.display(), "no configuration file, using defaults");
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        );

        if let Some(url) = api_url_override {
            builder = builder.set_override("api_url", url)?;
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.default_page_size == 0 {
            warn!("default_page_size must be positive, falling back to 10");
            cfg.default_page_size = 10;
        }
        Ok(cfg)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.api_url, "http://localhost:8080/api");
        assert_eq!(cfg.toast_duration(), Duration::from_millis(4000));
        assert_eq!(cfg.client_config().timeout, Duration::from_secs(10));
        assert_eq!(cfg.crl_url, None);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "api_url = \"https://pki.example.cm/api\"\ndefault_page_size = 25\ncrl_url = \"https://pki.example.cm/crl/root.crl\"\n",
        )
        .unwrap();

        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.api_url, "https://pki.example.cm/api");
        assert_eq!(cfg.default_page_size, 25);
        assert_eq!(
            cfg.crl_url.as_deref(),
            Some("https://pki.example.cm/crl/root.crl")
        );
    }

    #[test]
    fn json5_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json5"),
            "{ toast_duration_ms: 1500, // shorter toasts\n}",
        )
        .unwrap();

        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.toast_duration_ms, 1500);
    }

    #[test]
    fn cli_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "api_url = \"http://file/api\"\n").unwrap();

        let cfg = Config::load(dir.path(), Some("http://cli/api")).unwrap();
        assert_eq!(cfg.api_url, "http://cli/api");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "default_page_size = 0\n").unwrap();

        let cfg = Config::load(dir.path(), None).unwrap();
        assert_eq!(cfg.default_page_size, 10);
    }
}
