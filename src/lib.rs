//! EMQX exhook bridge configuration.
//!
//! This module exports the configuration resolver and its supporting pieces.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
