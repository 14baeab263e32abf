use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::app::BuildOptions;
use crate::error::KiraError;
use crate::fetch::{FetchSettings, MAX_FILTER_IDS};
use crate::openalex::OPENALEX_BASE;

pub const CONFIG_FILE_NAME: &str = "kira-cg.json";
pub const MAILTO_ENV: &str = "OPENALEX_MAILTO";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub fetch: FetchSection,
    #[serde(default)]
    pub graph: GraphSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mailto: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FetchSection {
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub citers_batch_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GraphSection {
    #[serde(default)]
    pub n_roots: Option<usize>,
    #[serde(default)]
    pub n_branches: Option<usize>,
    #[serde(default)]
    pub branch_seeds_limit: Option<usize>,
    #[serde(default)]
    pub min_branch_ref_frequency: Option<usize>,
    #[serde(default)]
    pub half_life: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub mailto: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: OPENALEX_BASE.to_string(),
            mailto: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api: ApiConfig,
    pub fetch: FetchSettings,
    pub build: BuildOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config = match path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(KiraError::MissingConfig(path));
                }
                Self::read(&path)?
            }
            None => match Self::discover() {
                Some(path) => Self::read(&path)?,
                None => Config::default(),
            },
        };

        let mut resolved = Self::resolve_config(config)?;
        if resolved.api.mailto.is_none() {
            resolved.api.mailto = std::env::var(MAILTO_ENV)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
        Ok(resolved)
    }

    pub fn read(path: &Path) -> Result<Config, KiraError> {
        let content =
            fs::read_to_string(path).map_err(|_| KiraError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("kira-citegraph").join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let api_defaults = ApiConfig::default();
        let api = ApiConfig {
            base_url: config.api.base_url.unwrap_or(api_defaults.base_url),
            mailto: config
                .api
                .mailto
                .filter(|value| !value.trim().is_empty()),
        };

        let fetch_defaults = FetchSettings::default();
        let fetch = FetchSettings {
            concurrency: config.fetch.concurrency.unwrap_or(fetch_defaults.concurrency),
            batch_size: config.fetch.batch_size.unwrap_or(fetch_defaults.batch_size),
            citers_batch_size: config
                .fetch
                .citers_batch_size
                .unwrap_or(fetch_defaults.citers_batch_size),
        };
        if fetch.concurrency == 0 {
            return Err(KiraError::ConfigValue(
                "fetch.concurrency must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("fetch.batch_size", fetch.batch_size),
            ("fetch.citers_batch_size", fetch.citers_batch_size),
        ] {
            if value == 0 || value > MAX_FILTER_IDS {
                return Err(KiraError::ConfigValue(format!(
                    "{name} must be between 1 and {MAX_FILTER_IDS}, got {value}"
                )));
            }
        }

        let build_defaults = BuildOptions::default();
        let build = BuildOptions {
            n_roots: config.graph.n_roots.unwrap_or(build_defaults.n_roots),
            n_branches: config.graph.n_branches.unwrap_or(build_defaults.n_branches),
            branch_seeds_limit: config
                .graph
                .branch_seeds_limit
                .unwrap_or(build_defaults.branch_seeds_limit),
            min_branch_ref_frequency: config
                .graph
                .min_branch_ref_frequency
                .unwrap_or(build_defaults.min_branch_ref_frequency),
            half_life: config.graph.half_life.unwrap_or(build_defaults.half_life),
            current_year: None,
        };
        if !(build.half_life > 0.0) {
            return Err(KiraError::ConfigValue(
                "graph.half_life must be positive".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            api,
            fetch,
            build,
        })
    }
}
