//! Core types for Rally Tools
//!
//! This module holds the pieces every other module depends on: the error system and
//! the entity kind enumeration used to key caches and traversal state.
//!
//! # Modules
//!
//! - `error` - [`RallyError`], [`ErrorContext`] and [`user_friendly_error`]
//! - `kind` - [`EntityKind`], the four entity types served by the Rally API

pub mod error;
pub mod kind;

pub use error::{ErrorContext, RallyError, user_friendly_error};
pub use kind::EntityKind;
