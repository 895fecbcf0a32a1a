//! Data-access layer: the contract the CRUD surface delegates to, plus
//! bundled SQLite and in-memory handles.
//!
//! # Responsibility
//! - Define the storage contract consumed by `service::crud_service`.
//! - Isolate SQL details from the CRUD surface.
//!
//! # Invariants
//! - Handles enforce changeset validity before persistence.
//! - Handles return semantic errors (`Stale`, `UnknownField`,
//!   `MultipleResults`) in addition to transport errors.

pub mod data_access;
pub mod memory_repo;
pub mod query;
pub mod sqlite_repo;
