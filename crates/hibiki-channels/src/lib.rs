//! # hibiki-channels
//!
//! Broadcast platform integrations for Hibiki.

pub mod youtube;
