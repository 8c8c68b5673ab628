//! Shared utilities and common types for the Family Locator backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Validation helpers for coordinates, sample fields, and geofence geometry
//! - Pagination limit handling for history queries

pub mod pagination;
pub mod validation;
