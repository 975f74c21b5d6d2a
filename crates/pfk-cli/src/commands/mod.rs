pub mod backtest;
pub mod md;

use anyhow::Result;
use pfk_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, AppSettings, LoadedConfig,
    UnusedKeyPolicy,
};

/// Load `paths` (or the `PFK_CONFIG` default), warn on unused keys, parse settings.
pub(crate) fn load_settings(paths: &[String]) -> Result<(LoadedConfig, AppSettings)> {
    let paths = if paths.is_empty() {
        config_paths_from_env()
    } else {
        paths.to_vec()
    };
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;

    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for key in &unused.unused_leaf_pointers {
        tracing::warn!(key = %key, "config key is not used by any section");
    }

    let settings = AppSettings::from_loaded(&loaded)?;
    Ok((loaded, settings))
}
