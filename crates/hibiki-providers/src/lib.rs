//! # hibiki-providers
//!
//! Generative text service implementations for Hibiki.

pub mod gemini;
