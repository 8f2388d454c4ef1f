use paths::PathContext;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Application infrastructure context.
///
/// Contains path management, version info, and logging infrastructure.
pub struct AppContext {
    pub path_context: PathContext,
    pub version: &'static str,
    log_file: Option<PathBuf>,
    /// The log guard must be kept alive for the duration of the application
    /// to ensure log messages are properly flushed.
    _log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl AppContext {
    pub fn app_id(&self) -> &str {
        self.path_context.app_id()
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn path_context(&self) -> &PathContext {
        &self.path_context
    }

    /// The file this process is logging into, if logging was installed.
    pub fn log_file(&self) -> Option<&std::path::Path> {
        self.log_file.as_deref()
    }
}

/// Application metadata trait.
///
/// Define your application's identity by implementing this trait.
/// This is a pure marker trait - no logic, just constants.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const STUDIO: &'static str = "cm_gov_pki";
    const PROJECT_ID: &'static str = "pki_souverain";
}

/// Where log records are written besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleLogging {
    /// Also write to stderr. Only useful for line-oriented commands.
    Enabled,
    /// File only. Required while a TUI owns the terminal.
    #[default]
    Disabled,
}

/// Builder for creating applications with proper initialization.
pub struct AppBuilder<A: Application> {
    path_context: PathContext,
    version: &'static str,
    console: ConsoleLogging,
    install_logging: bool,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    /// Create a new application builder.
    ///
    /// Resolves the path context (development builds log below the workspace
    /// `.out/` folder, release builds use the platform data directory).
    pub fn new(version: &'static str) -> Self {
        #[cfg(debug_assertions)]
        let path_context = PathContext::with_base_path(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("..")
                .join("..")
                .join(".out"),
            A::STUDIO,
            A::PROJECT_ID,
            A::APP_ID,
        );
        #[cfg(not(debug_assertions))]
        let path_context = PathContext::new(A::STUDIO, A::PROJECT_ID, A::APP_ID);

        Self::with_path_context(path_context, version)
    }

    /// Use an explicit path context (tests, portable installs).
    pub fn with_path_context(path_context: PathContext, version: &'static str) -> Self {
        Self {
            path_context,
            version,
            console: ConsoleLogging::default(),
            install_logging: true,
            _marker: PhantomData,
        }
    }

    pub fn console(mut self, console: ConsoleLogging) -> Self {
        self.console = console;
        self
    }

    /// Skip installing the global tracing subscriber.
    pub fn without_logging(mut self) -> Self {
        self.install_logging = false;
        self
    }

    /// Ensure directories exist and install logging, returning the context.
    ///
    /// The default level is INFO in debug builds and WARN in release builds;
    /// `RUST_LOG` overrides it.
    pub fn build(self) -> Result<AppContext, BoxError> {
        self.path_context.ensure_directories()?;

        if !self.install_logging {
            return Ok(AppContext {
                path_context: self.path_context,
                version: self.version,
                log_file: None,
                _log_guard: None,
            });
        }

        let log_file_path = self.path_context.log_file_now();
        let log_dir = log_file_path
            .parent()
            .ok_or("log file path should have parent directory")?;
        let log_filename = log_file_path
            .file_name()
            .ok_or("log file path should have filename")?;

        let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        #[cfg(debug_assertions)]
        let level = LevelFilter::INFO;

        #[cfg(not(debug_assertions))]
        let level = LevelFilter::WARN;

        let filter = || {
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy()
        };

        let file_layer = fmt::Layer::default()
            .with_target(false)
            .with_ansi(false)
            .with_writer(non_blocking)
            .with_filter(filter());

        let console_layer = match self.console {
            ConsoleLogging::Enabled => Some(
                fmt::Layer::default()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(filter()),
            ),
            ConsoleLogging::Disabled => None,
        };

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .with(tracing_error::ErrorLayer::default())
            .try_init()?;

        tracing::info!(
            app = A::APP_ID,
            version = self.version,
            log = %log_file_path.display(),
            "logging initialised"
        );

        Ok(AppContext {
            path_context: self.path_context,
            version: self.version,
            log_file: Some(log_file_path),
            _log_guard: Some(guard),
        })
    }
}
