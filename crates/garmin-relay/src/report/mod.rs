//! Reporting side: stored points to prompts to the inference endpoint

pub mod dispatch;
pub mod pivot;
pub mod prompt;

pub use dispatch::{DispatchOutcome, InferenceClient};
pub use pivot::{canonical_timestamp, pivot, Pivot, TimedFieldGroup};
pub use prompt::{build_prompts, format_prompt, PromptRecord};
