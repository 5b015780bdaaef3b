//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Chat turns, blocking and streamed.
pub mod chat;
/// Long-term memory listing.
pub mod memory;
/// Session identity and persona handlers.
pub mod session;
