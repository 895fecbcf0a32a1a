//! CRUD surface and result normalization.
//!
//! # Responsibility
//! - Expose the generated CRUD operations for one bound entity.
//! - Keep callers decoupled from data-access error details.

pub mod crud_service;
pub mod result;
