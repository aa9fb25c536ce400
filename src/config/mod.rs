//! Configuration handling for the clipper.
//!
//! Values come from environment variables with development defaults. The
//! binary loads a `.env` file first and then lets command line flags override
//! whatever `Config::from_env` produced.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Environment variable names. Public so tests and the CLI can refer to them.
pub const ENV_VAULT_PATH: &str = "OBSIDIAN_VAULT_PATH";
pub const ENV_HEADLESS: &str = "CLIP_HEADLESS";
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "CLIP_NAVIGATION_TIMEOUT_MS";
pub const ENV_ANALYZER: &str = "CLIP_ANALYZER";
pub const ENV_DEFUDDLE_URL: &str = "CLIP_DEFUDDLE_URL";
pub const ENV_CHROME_PATH: &str = "CLIP_CHROME_PATH";
pub const ENV_OUTPUTS_DIR: &str = "CLIP_OUTPUTS_DIR";

pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_DEFUDDLE_URL: &str = "https://unpkg.com/defuddle@0.6.4/dist/index.js";
const DEFAULT_OUTPUTS_DIR: &str = "outputs";

/// Which readable-content capability runs inside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzerKind {
    /// Inject the Defuddle bundle and parse the live document in-page.
    #[default]
    Defuddle,
    /// Serialize the rendered DOM and run readability in-process.
    Readability,
}

impl FromStr for AnalyzerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "defuddle" => Ok(Self::Defuddle),
            "readability" => Ok(Self::Readability),
            other => Err(ConfigError::InvalidValue {
                field: ENV_ANALYZER,
                reason: format!("unknown analyzer '{other}' (expected defuddle or readability)"),
            }),
        }
    }
}

/// Runtime configuration for a clipping run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub vault_path: Option<PathBuf>,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub analyzer: AnalyzerKind,
    pub defuddle_url: String,
    pub chrome_executable: Option<PathBuf>,
    pub outputs_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: None,
            headless: true,
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            analyzer: AnalyzerKind::default(),
            defuddle_url: DEFAULT_DEFUDDLE_URL.to_string(),
            chrome_executable: None,
            outputs_dir: PathBuf::from(DEFAULT_OUTPUTS_DIR),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults for anything
    /// unset. Present but unparsable values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let headless = match non_empty_var(ENV_HEADLESS) {
            Some(raw) => parse_bool(ENV_HEADLESS, &raw)?,
            None => defaults.headless,
        };

        let navigation_timeout = match non_empty_var(ENV_NAVIGATION_TIMEOUT_MS) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_NAVIGATION_TIMEOUT_MS,
                    reason: format!("'{raw}' is not a whole number of milliseconds"),
                })?;
                if millis == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_NAVIGATION_TIMEOUT_MS,
                        reason: "timeout must be greater than zero".to_string(),
                    });
                }
                Duration::from_millis(millis)
            }
            None => defaults.navigation_timeout,
        };

        let analyzer = match non_empty_var(ENV_ANALYZER) {
            Some(raw) => raw.parse()?,
            None => defaults.analyzer,
        };

        let defuddle_url = non_empty_var(ENV_DEFUDDLE_URL).unwrap_or(defaults.defuddle_url);
        if let Err(err) = url::Url::parse(&defuddle_url) {
            return Err(ConfigError::InvalidValue {
                field: ENV_DEFUDDLE_URL,
                reason: err.to_string(),
            });
        }

        Ok(Self {
            vault_path: non_empty_var(ENV_VAULT_PATH).map(PathBuf::from),
            headless,
            navigation_timeout,
            analyzer,
            defuddle_url,
            chrome_executable: non_empty_var(ENV_CHROME_PATH).map(PathBuf::from),
            outputs_dir: non_empty_var(ENV_OUTPUTS_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.outputs_dir),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Boolean spellings accepted by `--headless` and `CLIP_HEADLESS`.
pub fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_KEYS: [&str; 7] = [
        ENV_VAULT_PATH,
        ENV_HEADLESS,
        ENV_NAVIGATION_TIMEOUT_MS,
        ENV_ANALYZER,
        ENV_DEFUDDLE_URL,
        ENV_CHROME_PATH,
        ENV_OUTPUTS_DIR,
    ];

    fn clear_env() {
        for key in ALL_KEYS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.headless);
        assert_eq!(cfg.navigation_timeout, Duration::from_millis(30_000));
        assert_eq!(cfg.analyzer, AnalyzerKind::Defuddle);
        assert_eq!(cfg.vault_path, None);
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_VAULT_PATH, "/tmp/vault");
            env::set_var(ENV_HEADLESS, "false");
            env::set_var(ENV_NAVIGATION_TIMEOUT_MS, "1500");
            env::set_var(ENV_ANALYZER, "Readability");
            env::set_var(ENV_CHROME_PATH, "/usr/bin/chromium");
            env::set_var(ENV_OUTPUTS_DIR, "/tmp/runs");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.vault_path, Some(PathBuf::from("/tmp/vault")));
        assert!(!cfg.headless);
        assert_eq!(cfg.navigation_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.analyzer, AnalyzerKind::Readability);
        assert_eq!(cfg.chrome_executable, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(cfg.outputs_dir, PathBuf::from("/tmp/runs"));
        clear_env();
    }

    #[test]
    fn rejects_unparsable_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_NAVIGATION_TIMEOUT_MS, "soon");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_NAVIGATION_TIMEOUT_MS));

        clear_env();
        unsafe {
            env::set_var(ENV_HEADLESS, "maybe");
        }
        assert!(Config::from_env().is_err());

        clear_env();
        unsafe {
            env::set_var(ENV_ANALYZER, "mercury");
        }
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("x", "TRUE").unwrap());
        assert!(parse_bool("x", "1").unwrap());
        assert!(!parse_bool("x", "off").unwrap());
        assert!(parse_bool("x", "").is_err());
    }
}
