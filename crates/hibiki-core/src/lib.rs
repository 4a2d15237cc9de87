//! # hibiki-core
//!
//! Core types, traits, configuration, and error handling for the
//! Hibiki live-chat companion.

pub mod chatlog;
pub mod config;
pub mod error;
pub mod message;
pub mod persona;
pub mod prompt;
pub mod traits;
