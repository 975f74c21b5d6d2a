use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;

pub mod secrets;
mod settings;

pub use secrets::{resolve_secrets, KisSecrets, ResolvedSecrets};
pub use settings::{
    AnalysisSettings, AppSettings, BacktestSettings, DataSettings, GroupSettings, MdSettings,
    RateEntry, ReportSettings, ServerSettings,
};

/// Env var holding comma-separated config paths, applied in order.
pub const CONFIG_PATHS_ENV: &str = "PFK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// If any leaf string in the effective config starts with one of these,
/// loading aborts with CONFIG_SECRET_DETECTED. Config stores env var names only.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "AIza",       // Google API key (Gemini)
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "eyJ",        // JWT (brokerage access tokens)
];

/// JSON-pointer prefixes read by [`AppSettings::from_loaded`].
///
/// A leaf under any of these is consumed; anything else is reported unused.
/// Keep in step with the settings structs.
pub const CONSUMED_POINTERS: &[&str] = &[
    "/backtest/initial_capital",
    "/backtest/start_date",
    "/backtest/end_date",
    "/backtest/rebalance",
    "/backtest/weights",
    "/backtest/groups/equity",
    "/backtest/groups/fixed_income",
    "/data/asset_prices_csv",
    "/data/benchmark_csv",
    "/data/benchmark_column",
    "/data/calendar",
    "/data/base_rate_history",
    "/analysis/benchmark_name",
    "/analysis/crash_periods",
    "/report/model",
    "/report/api_key_env",
    "/report/base_url",
    "/report/chunk_delay_ms",
    "/report/currency",
    "/server/addr",
    "/md/base_url",
    "/md/app_key_env",
    "/md/app_secret_env",
    "/md/access_token_env",
    "/md/page_delay_ms",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Unused-key report against [`CONSUMED_POINTERS`].
/// With `policy == Fail`, unused keys are an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = CONSUMED_POINTERS
        .iter()
        .map(|p| normalize_pointer(p))
        .collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {}",
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix)
        && leaf
            .get(prefix.len()..prefix.len() + 1)
            .map(|c| c == "/")
            .unwrap_or(false)
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    let take = items.iter().take(n).cloned().collect::<Vec<_>>();
    format!("{:?}", take)
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Config paths from `PFK_CONFIG` (comma-separated), or the default path.
pub fn config_paths_from_env() -> Vec<String> {
    match std::env::var(CONFIG_PATHS_ENV) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![DEFAULT_CONFIG_PATH.to_string()],
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML docs in order: earlier docs are base, later docs override.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Compact JSON with object keys sorted at every level.
fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sorted(v)).context("canonical json serialize failed")
}

fn sorted(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sorted(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
