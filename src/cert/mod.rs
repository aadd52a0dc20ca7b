//! Certificate generation module.
//!
//! This module builds, signs and records X.509 certificates for the
//! root → intermediate → leaf hierarchy.

pub mod certificate;
pub mod factory;
pub mod template;
