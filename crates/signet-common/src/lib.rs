//! Signet shared infrastructure.
//!
//! Process-level plumbing shared by every Signet service: structured
//! logging setup lives here so binaries and integration harnesses
//! initialize it the same way.

pub mod logging;
