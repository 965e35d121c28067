//! Field definitions and types for search index models.
//!
//! This module provides the [`FieldDef`] struct and [`FieldType`] enum that
//! describe model fields and their index column mappings.

pub mod types;

pub use types::{FieldDef, FieldType};
