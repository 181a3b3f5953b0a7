//! Core types for Ambra.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod events;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use events::{OrderEvent, OrderTimeline};
pub use id::*;
pub use status::*;
