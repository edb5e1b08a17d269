//! Context Engine - turns a stored corpus into a grounded answer
//!
//! Provides:
//! - Context assembly from the full corpus
//! - Prompt construction and model invocation
//! - Guard-rail filtering of out-of-context replies

mod assembler;
mod generator;
mod guardrail;

pub use assembler::assemble_context;
pub use generator::{build_prompt, AnswerGenerator, SYSTEM_INSTRUCTION};
pub use guardrail::{apply_guard_rail, is_fallback, NO_ANSWER_PHRASES};
