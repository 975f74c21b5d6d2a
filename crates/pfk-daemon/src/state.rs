//! Shared runtime state for pfk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum.

use std::sync::Arc;
use std::time::Duration;

use pfk_config::{AppSettings, ResolvedSecrets};
use pfk_report::{GeminiGenerator, RunInputs, TextGenerator};

use crate::cache::ComputeOnce;
use crate::pipeline::RunOutput;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub inputs: RunInputs,
    /// `None` when no report API key is configured.
    pub generator: Option<Arc<dyn TextGenerator>>,
    /// Pause after each relayed report chunk.
    pub chunk_delay: Duration,
    /// First successful run, reused for the life of the process. Its prompt
    /// feeds `/api/analyze_stream`.
    pub run_cache: ComputeOnce<RunOutput>,
}

impl AppState {
    pub fn new(
        inputs: RunInputs,
        generator: Option<Arc<dyn TextGenerator>>,
        chunk_delay: Duration,
    ) -> Self {
        Self {
            build: BuildInfo {
                service: "pfk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            inputs,
            generator,
            chunk_delay,
            run_cache: ComputeOnce::new(),
        }
    }

    pub fn from_settings(settings: &AppSettings, secrets: &ResolvedSecrets) -> Self {
        let generator = secrets.report_api_key.as_ref().map(|key| {
            Arc::new(GeminiGenerator::new_with_base_url(
                key.clone(),
                settings.report.model.clone(),
                settings.report.base_url.clone(),
            )) as Arc<dyn TextGenerator>
        });
        if generator.is_none() {
            tracing::warn!(
                env = %settings.report.api_key_env,
                "report API key not set; analyze_stream will report an error"
            );
        }
        Self::new(
            settings.to_run_inputs(),
            generator,
            Duration::from_millis(settings.report.chunk_delay_ms),
        )
    }

    /// Prompt of the cached run, if any.
    pub fn cached_prompt(&self) -> Option<String> {
        self.run_cache.get().and_then(|out| out.prompt.clone())
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
