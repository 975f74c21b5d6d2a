//! pfk-report
//!
//! Narrative report for a finished backtest:
//! - [`prompt`] renders run results into a text prompt
//! - [`generator`] streams text back from a language model
//! - [`pipeline`] runs load, simulation, summary and prompt in one call
//! - [`relay`] turns (generator, prompt) into a paced event sequence that
//!   always ends with `Done`, whatever fails along the way

pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod relay;

pub use generator::{GeminiGenerator, GenerationError, TextGenerator, TextStream};
pub use pipeline::{compute_run, PipelineError, RunInputs, RunResult};
pub use prompt::{build_prompt, format_amount, format_pct, PromptInput};
pub use relay::{relay, RelayEvent, NO_GENERATOR_MESSAGE, NO_PROMPT_MESSAGE};
