//! songforge: song-pack generation service backed by interchangeable LLM providers.

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod logging;
