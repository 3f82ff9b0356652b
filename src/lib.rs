//! CV screening pipeline: PDF text extraction, local-model structured
//! extraction, deterministic scoring, and ranking.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod llm;
