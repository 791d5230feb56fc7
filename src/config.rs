//! Run configuration: the invocation surface the external CLI must satisfy.
//!
//! Resolution is layered — CLI > environment > defaults — and every resolved
//! value keeps its source attribution, which is echoed into `run.meta.json`
//! so a run is auditable without the original command line.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use url::Url;

use crate::budget::{BudgetOverrides, RunMode};
use crate::error::ConfigError;
use crate::paths::DEFAULT_OUT_DIR;
use crate::types::{ConfigSource, ConfigValue, Framework};

/// Environment variable: force the fixed test budget.
pub const ENV_TEST_MODE: &str = "VERAX_TEST_MODE";
/// Environment variable: ISO override seeding the deterministic run ID.
pub const ENV_TEST_TIME: &str = "VERAX_TEST_TIME";
/// Environment variable: strip wall-clock timestamps from artifacts.
pub const ENV_DETERMINISTIC_MODE: &str = "VERAX_DETERMINISTIC_MODE";

/// Default number of runs kept by retention.
pub const DEFAULT_RETAIN: usize = 10;

/// Default frontier caps.
pub const DEFAULT_MAX_PAGES: usize = 25;
pub const DEFAULT_MAX_DEPTH: usize = 3;
/// Hard cap on queued frontier entries; links beyond it are dropped.
pub const DEFAULT_FRONTIER_CAP: usize = 200;

/// Raw inputs as the caller provided them. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub url: Option<String>,
    pub source_root: Option<Utf8PathBuf>,
    pub out_dir: Option<Utf8PathBuf>,
    pub mode: Option<RunMode>,
    pub json: bool,
    pub explain_expectations: bool,
    pub min_coverage: Option<f64>,
    pub global_timeout_ms: Option<u64>,
    pub interaction_timeout_ms: Option<u64>,
    pub navigation_timeout_ms: Option<u64>,
    pub no_micro_crawl: bool,
    pub retain: Option<usize>,
    pub deterministic: bool,
    pub framework_hint: Option<Framework>,
    pub scan_root_override: Option<Utf8PathBuf>,
    pub allow_empty_learn: bool,
}

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: Url,
    pub source_root: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub mode: RunMode,
    pub json: bool,
    pub explain_expectations: bool,
    pub min_coverage: f64,
    pub budget_overrides: BudgetOverrides,
    pub micro_crawl: bool,
    pub retain: usize,
    pub deterministic: bool,
    pub test_time: Option<String>,
    pub framework_hint: Option<Framework>,
    pub scan_root_override: Option<Utf8PathBuf>,
    pub allow_empty_learn: bool,
    pub max_pages: usize,
    pub max_depth: usize,
    pub frontier_cap: usize,
    sources: BTreeMap<String, ConfigSource>,
}

impl RunConfig {
    /// Resolve inputs against the environment and defaults.
    pub fn resolve(inputs: RunInputs) -> Result<Self, ConfigError> {
        let mut sources = BTreeMap::new();
        let mut track = |key: &str, source: ConfigSource| {
            sources.insert(key.to_string(), source);
        };

        let raw_url = inputs
            .url
            .ok_or_else(|| ConfigError::MissingRequired("url".to_string()))?;
        let url = Url::parse(&raw_url).map_err(|_| ConfigError::MalformedUrl {
            url: raw_url.clone(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::MalformedUrl { url: raw_url });
        }
        track("url", ConfigSource::Cli);

        let source_root = inputs
            .source_root
            .ok_or_else(|| ConfigError::MissingRequired("source-root".to_string()))?;
        if !source_root.is_dir() {
            return Err(ConfigError::SourceRootMissing {
                path: source_root.to_string(),
            });
        }
        track("sourceRoot", ConfigSource::Cli);

        let env_test_mode = env_flag(ENV_TEST_MODE);
        let mode = match (inputs.mode, env_test_mode) {
            (Some(mode), _) => {
                track("mode", ConfigSource::Cli);
                mode
            }
            (None, true) => {
                track("mode", ConfigSource::Env);
                RunMode::Test
            }
            (None, false) => {
                track("mode", ConfigSource::Default);
                RunMode::Default
            }
        };

        let env_deterministic = env_flag(ENV_DETERMINISTIC_MODE);
        let deterministic = if inputs.deterministic {
            track("deterministic", ConfigSource::Cli);
            true
        } else if env_deterministic {
            track("deterministic", ConfigSource::Env);
            true
        } else {
            track("deterministic", ConfigSource::Default);
            false
        };

        let test_time = std::env::var(ENV_TEST_TIME).ok().filter(|v| !v.is_empty());
        if test_time.is_some() {
            track("testTime", ConfigSource::Env);
        }

        let min_coverage = match inputs.min_coverage {
            Some(v) => {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::InvalidValue {
                        key: "min-coverage".to_string(),
                        value: v.to_string(),
                    });
                }
                track("minCoverage", ConfigSource::Cli);
                v
            }
            None => {
                track("minCoverage", ConfigSource::Default);
                0.0
            }
        };

        let retain = match inputs.retain {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    key: "retain".to_string(),
                    value: "0".to_string(),
                });
            }
            Some(v) => {
                track("retain", ConfigSource::Cli);
                v
            }
            None => {
                track("retain", ConfigSource::Default);
                DEFAULT_RETAIN
            }
        };

        for (key, value) in [
            ("globalTimeoutMs", inputs.global_timeout_ms),
            ("interactionTimeoutMs", inputs.interaction_timeout_ms),
            ("navigationTimeoutMs", inputs.navigation_timeout_ms),
        ] {
            if let Some(v) = value {
                if v == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: "0".to_string(),
                    });
                }
                track(key, ConfigSource::Cli);
            }
        }

        let out_dir = match inputs.out_dir {
            Some(dir) => {
                track("outDir", ConfigSource::Cli);
                dir
            }
            None => {
                track("outDir", ConfigSource::Default);
                Utf8PathBuf::from(DEFAULT_OUT_DIR)
            }
        };

        track(
            "microCrawl",
            if inputs.no_micro_crawl {
                ConfigSource::Cli
            } else {
                ConfigSource::Default
            },
        );

        Ok(Self {
            url,
            source_root,
            out_dir,
            mode,
            json: inputs.json,
            explain_expectations: inputs.explain_expectations,
            min_coverage,
            budget_overrides: BudgetOverrides {
                global_timeout_ms: inputs.global_timeout_ms,
                interaction_timeout_ms: inputs.interaction_timeout_ms,
                navigation_timeout_ms: inputs.navigation_timeout_ms,
            },
            micro_crawl: !inputs.no_micro_crawl,
            retain,
            deterministic,
            test_time,
            framework_hint: inputs.framework_hint,
            scan_root_override: inputs.scan_root_override,
            allow_empty_learn: inputs.allow_empty_learn,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            frontier_cap: DEFAULT_FRONTIER_CAP,
            sources,
        })
    }

    /// Seed string for the run-id content hash: the inputs that make two
    /// runs "the same run".
    #[must_use]
    pub fn run_seed(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.url,
            self.source_root,
            self.mode.as_str(),
            self.micro_crawl
        )
    }

    /// The effective-config echo persisted in `run.meta.json`.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, ConfigValue> {
        let mut map = BTreeMap::new();
        let mut put = |key: &str, value: serde_json::Value| {
            let source = self
                .sources
                .get(key)
                .copied()
                .unwrap_or(ConfigSource::Default);
            map.insert(key.to_string(), ConfigValue { value, source });
        };
        put("url", serde_json::json!(self.url.as_str()));
        put("sourceRoot", serde_json::json!(self.source_root.as_str()));
        put("outDir", serde_json::json!(self.out_dir.as_str()));
        put("mode", serde_json::json!(self.mode.as_str()));
        put("minCoverage", serde_json::json!(self.min_coverage));
        put("microCrawl", serde_json::json!(self.micro_crawl));
        put("retain", serde_json::json!(self.retain));
        put("deterministic", serde_json::json!(self.deterministic));
        if let Some(ms) = self.budget_overrides.global_timeout_ms {
            put("globalTimeoutMs", serde_json::json!(ms));
        }
        if let Some(ms) = self.budget_overrides.interaction_timeout_ms {
            put("interactionTimeoutMs", serde_json::json!(ms));
        }
        if let Some(ms) = self.budget_overrides.navigation_timeout_ms {
            put("navigationTimeoutMs", serde_json::json!(ms));
        }
        map
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn valid_inputs(root: &TempDir) -> RunInputs {
        RunInputs {
            url: Some("http://localhost:3000".to_string()),
            source_root: Some(Utf8PathBuf::from_path_buf(root.path().to_path_buf()).unwrap()),
            ..RunInputs::default()
        }
    }

    #[test]
    #[serial]
    fn missing_url_is_usage_error() {
        let temp = TempDir::new().unwrap();
        let mut inputs = valid_inputs(&temp);
        inputs.url = None;
        let err = RunConfig::resolve(inputs).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(_)));
    }

    #[test]
    #[serial]
    fn malformed_url_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let mut inputs = valid_inputs(&temp);
        inputs.url = Some("not a url".to_string());
        let err = RunConfig::resolve(inputs).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedUrl { .. }));

        let mut inputs = valid_inputs(&temp);
        inputs.url = Some("ftp://example.com".to_string());
        assert!(matches!(
            RunConfig::resolve(inputs).unwrap_err(),
            ConfigError::MalformedUrl { .. }
        ));
    }

    #[test]
    #[serial]
    fn missing_source_root_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let mut inputs = valid_inputs(&temp);
        inputs.source_root = Some(Utf8PathBuf::from("/definitely/not/here"));
        let err = RunConfig::resolve(inputs).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRootMissing { .. }));
    }

    #[test]
    #[serial]
    fn defaults_applied_with_attribution() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::remove_var(ENV_TEST_MODE);
            std::env::remove_var(ENV_DETERMINISTIC_MODE);
            std::env::remove_var(ENV_TEST_TIME);
        }
        let config = RunConfig::resolve(valid_inputs(&temp)).unwrap();
        assert_eq!(config.mode, RunMode::Default);
        assert_eq!(config.retain, DEFAULT_RETAIN);
        assert!(config.micro_crawl);
        assert!(!config.deterministic);

        let echo = config.effective_config();
        assert_eq!(echo["mode"].source, ConfigSource::Default);
        assert_eq!(echo["url"].source, ConfigSource::Cli);
    }

    #[test]
    #[serial]
    fn env_test_mode_selects_test_budget() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::set_var(ENV_TEST_MODE, "1");
        }
        let config = RunConfig::resolve(valid_inputs(&temp)).unwrap();
        unsafe {
            std::env::remove_var(ENV_TEST_MODE);
        }
        assert_eq!(config.mode, RunMode::Test);
        assert_eq!(
            config.effective_config()["mode"].source,
            ConfigSource::Env
        );
    }

    #[test]
    #[serial]
    fn env_deterministic_mode_with_test_time() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::set_var(ENV_DETERMINISTIC_MODE, "1");
            std::env::set_var(ENV_TEST_TIME, "2026-01-20T00:00:00Z");
        }
        let config = RunConfig::resolve(valid_inputs(&temp)).unwrap();
        unsafe {
            std::env::remove_var(ENV_DETERMINISTIC_MODE);
            std::env::remove_var(ENV_TEST_TIME);
        }
        assert!(config.deterministic);
        assert_eq!(config.test_time.as_deref(), Some("2026-01-20T00:00:00Z"));
    }

    #[test]
    #[serial]
    fn invalid_numeric_options_rejected() {
        let temp = TempDir::new().unwrap();
        let mut inputs = valid_inputs(&temp);
        inputs.min_coverage = Some(1.5);
        assert!(matches!(
            RunConfig::resolve(inputs).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));

        let mut inputs = valid_inputs(&temp);
        inputs.global_timeout_ms = Some(0);
        assert!(matches!(
            RunConfig::resolve(inputs).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));

        let mut inputs = valid_inputs(&temp);
        inputs.retain = Some(0);
        assert!(matches!(
            RunConfig::resolve(inputs).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    #[serial]
    fn run_seed_is_stable_for_same_inputs() {
        let temp = TempDir::new().unwrap();
        let a = RunConfig::resolve(valid_inputs(&temp)).unwrap();
        let b = RunConfig::resolve(valid_inputs(&temp)).unwrap();
        assert_eq!(a.run_seed(), b.run_seed());
    }
}
