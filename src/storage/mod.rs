//! Certificate storage.
//!
//! This module provides the in-memory registry of issued certificates.

pub mod memory;
