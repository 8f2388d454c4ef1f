//! Path context for runtime environment detection and project-aware paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory name used below the platform data directory in production.
const PRODUCT_DIR: &str = "PKI_Souverain";

/// Identifies the runtime environment where the application is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Running via `cargo run` or in development mode
    Development,
    /// Running as an installed binary in production
    Production,
}

/// Context for managing application paths based on studio/project/app structure.
#[derive(Debug, Clone)]
pub struct PathContext {
    /// The runtime environment (development or production)
    environment: RuntimeEnvironment,
    /// Base path for all application data
    base_path: Arc<Path>,
    /// Studio identifier (e.g., "cm_gov_pki")
    studio: String,
    /// Project identifier (e.g., "pki_souverain")
    project_id: String,
    /// Application identifier (e.g., "portal")
    app_id: &'static str,
}

impl PathContext {
    /// Creates a new PathContext with automatic environment detection.
    pub fn new(
        studio: impl Into<String>,
        project_id: impl Into<String>,
        app_id: &'static str,
    ) -> Self {
        let environment = Self::detect_environment();
        let base_path = Self::determine_base_path(environment);

        Self {
            environment,
            base_path: base_path.into(),
            studio: studio.into(),
            project_id: project_id.into(),
            app_id,
        }
    }

    /// Creates a PathContext with an explicit base path (useful for testing).
    pub fn with_base_path(
        base_path: PathBuf,
        studio: impl Into<String>,
        project_id: impl Into<String>,
        app_id: &'static str,
    ) -> Self {
        let environment = Self::detect_environment();

        Self {
            environment,
            base_path: base_path.into(),
            studio: studio.into(),
            project_id: project_id.into(),
            app_id,
        }
    }

    /// Detects the runtime environment based on executable location.
    fn detect_environment() -> RuntimeEnvironment {
        // target/debug or target/release means we were started by cargo
        if let Ok(exe_path) = std::env::current_exe() {
            if exe_path.components().any(|c| c.as_os_str() == "target") {
                return RuntimeEnvironment::Development;
            }
        }

        if std::env::var("CARGO").is_ok() || std::env::var("CARGO_MANIFEST_DIR").is_ok() {
            return RuntimeEnvironment::Development;
        }

        RuntimeEnvironment::Production
    }

    /// Determines the base path based on the runtime environment.
    fn determine_base_path(environment: RuntimeEnvironment) -> PathBuf {
        match environment {
            RuntimeEnvironment::Development => {
                if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
                    PathBuf::from(manifest_dir)
                } else if let Ok(current_dir) = std::env::current_dir() {
                    current_dir
                } else {
                    PathBuf::from(".")
                }
            }
            // XDG_DATA_HOME, Application Support or LocalAppData
            RuntimeEnvironment::Production => dirs::data_local_dir()
                .map(|dir| dir.join(PRODUCT_DIR))
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// Returns the runtime environment.
    pub fn environment(&self) -> RuntimeEnvironment {
        self.environment
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the studio identifier.
    pub fn studio(&self) -> &str {
        &self.studio
    }

    /// Returns the project identifier.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the app identifier.
    pub fn app_id(&self) -> &str {
        self.app_id
    }

    /// Returns the project root path: `<base>/<studio>/<project_id>`
    pub fn project_root(&self) -> PathBuf {
        self.base_path.join(&self.studio).join(&self.project_id)
    }

    /// Returns the config directory: `<studio>/<project_id>/config/`
    ///
    /// `config.toml` / `config.json5` for the app are looked up here.
    pub fn config_dir(&self) -> PathBuf {
        self.project_root().join("config")
    }

    /// Returns the data directory path: `<studio>/<project_id>/data/`
    pub fn data_dir(&self) -> PathBuf {
        self.project_root().join("data")
    }

    /// Returns the persisted session file: `<studio>/<project_id>/data/<app_id>.session.json`
    ///
    /// Holds the access and refresh tokens of the last login.
    pub fn session_file(&self) -> PathBuf {
        self.data_dir().join(format!("{}.session.json", self.app_id))
    }

    /// Returns the downloads directory: `<studio>/<project_id>/downloads/`
    pub fn downloads_dir(&self) -> PathBuf {
        self.project_root().join("downloads")
    }

    /// Returns a file path inside the downloads directory.
    ///
    /// Path separators in `file_name` are replaced so a backend-supplied name
    /// can never escape the directory.
    pub fn download_file(&self, file_name: &str) -> PathBuf {
        let sanitized: String = file_name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        let sanitized = match sanitized.trim_start_matches('.') {
            "" => "download".to_string(),
            s => s.to_string(),
        };
        self.downloads_dir().join(sanitized)
    }

    /// Returns the logs directory path: `<studio>/<project_id>/logs/`
    pub fn logs_dir(&self) -> PathBuf {
        self.project_root().join("logs")
    }

    /// Returns a log file path with timestamp: `<studio>/<project_id>/logs/<app_id>.<timestamp>.log`
    pub fn log_file(&self, timestamp: &str) -> PathBuf {
        self.logs_dir()
            .join(format!("{}.{}.log", self.app_id, timestamp))
    }

    /// Returns a log file path with current timestamp.
    pub fn log_file_now(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.log_file(&timestamp)
    }

    /// Ensures all necessary directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        let dirs = [
            self.project_root(),
            self.config_dir(),
            self.data_dir(),
            self.downloads_dir(),
            self.logs_dir(),
        ];

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_context_structure() {
        let ctx = PathContext::with_base_path(
            PathBuf::from("/test/base"),
            "cm_gov_pki",
            "pki_souverain",
            "portal",
        );

        assert_eq!(ctx.studio(), "cm_gov_pki");
        assert_eq!(ctx.project_id(), "pki_souverain");
        assert_eq!(ctx.app_id(), "portal");
        assert_eq!(
            ctx.project_root(),
            PathBuf::from("/test/base/cm_gov_pki/pki_souverain")
        );
    }

    #[test]
    fn test_session_and_config_paths() {
        let ctx = PathContext::with_base_path(PathBuf::from("/base"), "studio", "project", "app");

        assert_eq!(
            ctx.session_file(),
            PathBuf::from("/base/studio/project/data/app.session.json")
        );
        assert_eq!(ctx.config_dir(), PathBuf::from("/base/studio/project/config"));
    }

    #[test]
    fn test_download_file_stays_in_downloads_dir() {
        let ctx = PathContext::with_base_path(PathBuf::from("/base"), "studio", "project", "app");

        assert_eq!(
            ctx.download_file("certificate-42.pem"),
            PathBuf::from("/base/studio/project/downloads/certificate-42.pem")
        );
        assert_eq!(
            ctx.download_file("../../etc/passwd"),
            PathBuf::from("/base/studio/project/downloads/_.._etc_passwd")
        );
        assert_eq!(
            ctx.download_file(".."),
            PathBuf::from("/base/studio/project/downloads/download")
        );
    }

    #[test]
    fn test_log_file_path() {
        let ctx = PathContext::with_base_path(PathBuf::from("/base"), "studio", "project", "app");

        let log_path = ctx.log_file("20240315-120000");
        assert_eq!(
            log_path,
            PathBuf::from("/base/studio/project/logs/app.20240315-120000.log")
        );
    }

    #[test]
    fn test_ensure_directories_creates_tree() {
        let base = std::env::temp_dir().join(format!("paths-test-{}", std::process::id()));
        let ctx = PathContext::with_base_path(base.clone(), "studio", "project", "app");

        ctx.ensure_directories().unwrap();
        assert!(ctx.data_dir().is_dir());
        assert!(ctx.downloads_dir().is_dir());
        assert!(ctx.logs_dir().is_dir());

        std::fs::remove_dir_all(base).unwrap();
    }
}
