//! Scrapsmith library crate
//!
//! Exposes the pipeline, Gemini client, and plan types so the binary and
//! external tooling share one implementation instead of going through
//! CLI startup.

pub mod app;
pub mod audio;
pub mod config;
pub mod demo;
pub mod events;
pub mod export;
pub mod gemini;
pub mod media;
pub mod pipeline;
pub mod plan;
pub mod prompts;
pub mod scrub;
pub mod session;
pub mod ui;
pub mod util;
