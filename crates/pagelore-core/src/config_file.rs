use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub paths: Option<PathsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Interval summary every N pages; 0 disables interval summaries.
    pub summary_interval: Option<u32>,
    pub page_limit: Option<usize>,
    pub max_point_words: Option<usize>,
    pub max_points_per_call: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub input_dir: Option<String>,
    pub analysis_dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/pagelore/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pagelore").join("config.toml"))
}

/// Load config by cascading CWD `.pagelore.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".pagelore.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            api_key: overlay
                .api
                .as_ref()
                .and_then(|a| a.api_key.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.api_key.clone())),
            model: overlay
                .api
                .as_ref()
                .and_then(|a| a.model.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.model.clone())),
            base_url: overlay
                .api
                .as_ref()
                .and_then(|a| a.base_url.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.base_url.clone())),
            request_timeout_secs: overlay
                .api
                .as_ref()
                .and_then(|a| a.request_timeout_secs)
                .or_else(|| base.api.as_ref().and_then(|a| a.request_timeout_secs)),
        }),
        analysis: Some(AnalysisConfig {
            summary_interval: overlay
                .analysis
                .as_ref()
                .and_then(|a| a.summary_interval)
                .or_else(|| base.analysis.as_ref().and_then(|a| a.summary_interval)),
            page_limit: overlay
                .analysis
                .as_ref()
                .and_then(|a| a.page_limit)
                .or_else(|| base.analysis.as_ref().and_then(|a| a.page_limit)),
            max_point_words: overlay
                .analysis
                .as_ref()
                .and_then(|a| a.max_point_words)
                .or_else(|| base.analysis.as_ref().and_then(|a| a.max_point_words)),
            max_points_per_call: overlay
                .analysis
                .as_ref()
                .and_then(|a| a.max_points_per_call)
                .or_else(|| base.analysis.as_ref().and_then(|a| a.max_points_per_call)),
        }),
        paths: Some(PathsConfig {
            input_dir: overlay
                .paths
                .as_ref()
                .and_then(|p| p.input_dir.clone())
                .or_else(|| base.paths.as_ref().and_then(|p| p.input_dir.clone())),
            analysis_dir: overlay
                .paths
                .as_ref()
                .and_then(|p| p.analysis_dir.clone())
                .or_else(|| base.paths.as_ref().and_then(|p| p.analysis_dir.clone())),
        }),
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
