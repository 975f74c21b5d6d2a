//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (`report.api_key_env`,
//! `md.app_key_env`, ...). Callers resolve once at startup and pass the
//! result into constructors. `Debug` output redacts every value and error
//! messages name the variable, never its content.

use anyhow::{bail, Result};

use crate::AppSettings;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Narrative-report generator key. `None` disables report streaming.
    pub report_api_key: Option<String>,
    pub kis_app_key: Option<String>,
    pub kis_app_secret: Option<String>,
    pub kis_access_token: Option<String>,
    names: SecretEnvNames,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "report_api_key",
                &self.report_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .field("kis_app_key", &self.kis_app_key.as_ref().map(|_| "<REDACTED>"))
            .field(
                "kis_app_secret",
                &self.kis_app_secret.as_ref().map(|_| "<REDACTED>"),
            )
            .field(
                "kis_access_token",
                &self.kis_access_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

#[derive(Clone)]
struct SecretEnvNames {
    kis_app_key: String,
    kis_app_secret: String,
    kis_access_token: String,
}

/// Credentials for the brokerage quotation API. Values redacted in `Debug`.
#[derive(Clone)]
pub struct KisSecrets {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
}

impl std::fmt::Debug for KisSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KisSecrets")
            .field("app_key", &"<REDACTED>")
            .field("app_secret", &"<REDACTED>")
            .field("access_token", &"<REDACTED>")
            .finish()
    }
}

impl ResolvedSecrets {
    /// All three brokerage values, or an error naming the first missing variable.
    pub fn require_kis(&self) -> Result<KisSecrets> {
        let need = |v: &Option<String>, name: &str| -> Result<String> {
            match v {
                Some(v) => Ok(v.clone()),
                None => bail!("SECRETS_MISSING: required env var '{}' is not set or empty", name),
            }
        };
        Ok(KisSecrets {
            app_key: need(&self.kis_app_key, &self.names.kis_app_key)?,
            app_secret: need(&self.kis_app_secret, &self.names.kis_app_secret)?,
            access_token: need(&self.kis_access_token, &self.names.kis_access_token)?,
        })
    }
}

/// Unset and blank variables both resolve to `None`.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Read every secret named by `settings` from the process environment.
/// Nothing is required at this point; see [`ResolvedSecrets::require_kis`].
pub fn resolve_secrets(settings: &AppSettings) -> ResolvedSecrets {
    let names = SecretEnvNames {
        kis_app_key: settings.md.app_key_env.clone(),
        kis_app_secret: settings.md.app_secret_env.clone(),
        kis_access_token: settings.md.access_token_env.clone(),
    };
    ResolvedSecrets {
        report_api_key: resolve_env(&settings.report.api_key_env),
        kis_app_key: resolve_env(&names.kis_app_key),
        kis_app_secret: resolve_env(&names.kis_app_secret),
        kis_access_token: resolve_env(&names.kis_access_token),
        names,
    }
}
