use std::{env, path::PathBuf, time::Duration};

/// AWS client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsConfig {
    /// Custom endpoint URL (for local emulators).
    pub endpoint_url: Option<String>,
    /// AWS region.
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

impl AwsConfig {
    /// Returns a display string for the target environment.
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local endpoint ({})", url),
            None => format!("AWS (region: {})", self.region),
        }
    }
}

/// Bounded polling: how many times to look and how long to sleep between looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl WaitPolicy {
    /// Poll without sleeping, for tests.
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Settings shared by every reconciler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Wait for tables and their indexes to become active (default: 60 x 2s).
    pub table_wait: WaitPolicy,
    /// Wait for function updates to settle (default: 30 x 2s).
    pub function_wait: WaitPolicy,
    /// Directory that relative function source paths are resolved against.
    pub source_root: PathBuf,
    /// Where temporary deployment archives are written.
    pub archive_dir: PathBuf,
    /// Existing REST API to configure instead of looking it up by name.
    pub api_id: Option<String>,
    /// Invoke every function with `{}` during smoke tests.
    pub invoke_functions: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `EXPLORESPEAK_TABLE_WAIT_ATTEMPTS` - Table activation polls (default: 60)
    /// - `EXPLORESPEAK_TABLE_WAIT_DELAY_SECS` - Seconds between table polls (default: 2)
    /// - `EXPLORESPEAK_FUNCTION_WAIT_ATTEMPTS` - Function update polls (default: 30)
    /// - `EXPLORESPEAK_FUNCTION_WAIT_DELAY_SECS` - Seconds between function polls (default: 2)
    /// - `EXPLORESPEAK_SOURCE_ROOT` - Function source root (default: ".")
    /// - `EXPLORESPEAK_ARCHIVE_DIR` - Temporary archive directory (default: system temp dir)
    pub fn from_env() -> Self {
        Self {
            table_wait: WaitPolicy {
                attempts: env_or("EXPLORESPEAK_TABLE_WAIT_ATTEMPTS", 60),
                delay: Duration::from_secs(env_or("EXPLORESPEAK_TABLE_WAIT_DELAY_SECS", 2)),
            },
            function_wait: WaitPolicy {
                attempts: env_or("EXPLORESPEAK_FUNCTION_WAIT_ATTEMPTS", 30),
                delay: Duration::from_secs(env_or("EXPLORESPEAK_FUNCTION_WAIT_DELAY_SECS", 2)),
            },
            source_root: env::var("EXPLORESPEAK_SOURCE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            archive_dir: env::var("EXPLORESPEAK_ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            api_id: None,
            invoke_functions: false,
        }
    }

    /// Sets the source root.
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    /// Sets the temporary archive directory.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    /// Sets the wait policies for tables and functions.
    pub fn with_waits(mut self, table_wait: WaitPolicy, function_wait: WaitPolicy) -> Self {
        self.table_wait = table_wait;
        self.function_wait = function_wait;
        self
    }

    /// Sets the REST API id.
    pub fn with_api_id(mut self, api_id: Option<String>) -> Self {
        self.api_id = api_id;
        self
    }

    /// Enables or disables smoke test invocations.
    pub fn with_invocations(mut self, invoke: bool) -> Self {
        self.invoke_functions = invoke;
        self
    }

    /// Resolves a function's source directory against the source root.
    pub fn source_path(&self, source_dir: &str) -> PathBuf {
        let path = PathBuf::from(source_dir);
        if path.is_absolute() {
            path
        } else {
            self.source_root.join(path)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
