//! # verdant-core
//!
//! Core types, bounded scores, identifiers, and error types for Verdant.
//!
//! This crate provides the foundational types shared across all Verdant crates:
//! - Catalogue subjects and the four finding kinds (discoveries, audio analyses,
//!   ecosystem assessments, conservation actions)
//! - Enums with `snake_case` storage names
//! - [`score::Score`], the `[0, 1]` bounded value every confidence and health
//!   metric is built from
//! - [`location::Location`], the all-or-nothing geolocation triple
//! - Finding identifiers and their display prefixes
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod location;
pub mod score;
