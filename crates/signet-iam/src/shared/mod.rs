//! Shared infrastructure: errors, configuration, and the cross-cutting
//! authorization services.

pub mod authorization_service;
pub mod config;
pub mod email;
pub mod error;
pub mod request_context;
