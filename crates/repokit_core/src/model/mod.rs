//! Entity-agnostic domain model.
//!
//! # Responsibility
//! - Define the contract every bound entity type implements.
//! - Carry attribute input, filters and changesets between layers.
//!
//! # Invariants
//! - Every entity exposes its validation function through `Entity::changeset`.
//! - Model types never touch storage.

pub mod changeset;
pub mod entity;
pub mod value;
