use anyhow::Context;
use selene::ephemeris::oracle::{DEFAULT_ORACLE_URL, ORACLE_URL_ENV};
use selene::search::ingress::INGRESS_CACHE_TTL_DAYS;
use selene::{OracleSettings, SearchConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Relative locations tried when no explicit path is given, matching the
/// layout when run from the workspace root or from an app directory.
pub const CONFIG_PATHS: [&str; 2] = ["configs/selene.toml", "../../configs/selene.toml"];

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHART_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeleneSettings {
    pub oracle: OracleToml,
    pub cache: CacheToml,
    pub search: SearchToml,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleToml {
    pub endpoint: String,
    pub fallback_base: Option<String>,
    pub timeout_secs: u64,
}

impl Default for OracleToml {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ORACLE_URL.to_string(),
            fallback_base: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    /// Shared chart cache; 0 disables it
    pub chart_ttl_secs: i64,
    pub ingress_ttl_days: i64,
}

impl Default for CacheToml {
    fn default() -> Self {
        Self {
            chart_ttl_secs: DEFAULT_CHART_TTL_SECS,
            ingress_ttl_days: INGRESS_CACHE_TTL_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchToml {
    pub lunation: SearchOverrides,
    pub ingress: SearchOverrides,
}

/// Per-search overrides; unset fields keep the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchOverrides {
    pub step_secs: Option<i64>,
    pub max_steps: Option<usize>,
    pub max_iterations: Option<u32>,
    pub tolerance_deg: Option<f64>,
}

impl SearchOverrides {
    pub fn apply(&self, base: SearchConfig) -> SearchConfig {
        SearchConfig {
            step_secs: self.step_secs.unwrap_or(base.step_secs),
            max_steps: self.max_steps.unwrap_or(base.max_steps),
            max_iterations: self.max_iterations.unwrap_or(base.max_iterations),
            tolerance_deg: self.tolerance_deg.unwrap_or(base.tolerance_deg),
        }
    }
}

impl SeleneSettings {
    pub fn oracle_settings(&self) -> OracleSettings {
        OracleSettings {
            endpoint: self.oracle.endpoint.clone(),
            fallback_base: self.oracle.fallback_base.clone(),
            timeout: Duration::from_secs(self.oracle.timeout_secs),
        }
    }

    pub fn lunation_search(&self) -> SearchConfig {
        self.search.lunation.apply(SearchConfig::conjunction())
    }

    pub fn ingress_search(&self) -> SearchConfig {
        self.search.ingress.apply(SearchConfig::ingress())
    }

    /// `None` when the shared chart cache is disabled.
    pub fn chart_ttl(&self) -> Option<chrono::Duration> {
        (self.cache.chart_ttl_secs > 0).then(|| chrono::Duration::seconds(self.cache.chart_ttl_secs))
    }

    pub fn ingress_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache.ingress_ttl_days)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oracle.endpoint.trim().is_empty() {
            anyhow::bail!("oracle.endpoint must not be empty");
        }
        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("oracle.timeout_secs must be positive");
        }
        if self.cache.ingress_ttl_days <= 0 {
            anyhow::bail!("cache.ingress_ttl_days must be positive");
        }
        self.lunation_search()
            .validate()
            .map_err(|e| anyhow::anyhow!("search.lunation: {e}"))?;
        self.ingress_search()
            .validate()
            .map_err(|e| anyhow::anyhow!("search.ingress: {e}"))?;
        Ok(())
    }

    /// Replace the endpoint when `value` is set and non-empty.
    pub fn apply_endpoint_override(&mut self, value: Option<String>) {
        if let Some(endpoint) = value.filter(|v| !v.trim().is_empty()) {
            self.oracle.endpoint = endpoint;
        }
    }
}

pub fn parse_settings(text: &str) -> anyhow::Result<SeleneSettings> {
    toml::from_str(text).map_err(|e| anyhow::anyhow!("Failed to parse selene.toml: {e}"))
}

/// Find the first config file among [`CONFIG_PATHS`].
pub fn find_config_path() -> Option<PathBuf> {
    CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

/// Load settings from `path`, or from the first of [`CONFIG_PATHS`] that
/// exists, or fall back to defaults. `SELENE_ORACLE_URL` overrides the
/// endpoint in every case.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<SeleneSettings> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_path(),
    };
    let mut settings = match path {
        Some(p) => {
            let text = fs::read_to_string(&p)
                .with_context(|| format!("Could not read config {}", p.display()))?;
            parse_settings(&text).with_context(|| format!("in {}", p.display()))?
        }
        None => SeleneSettings::default(),
    };
    settings.apply_endpoint_override(std::env::var(ORACLE_URL_ENV).ok());
    settings.validate()?;
    Ok(settings)
}
