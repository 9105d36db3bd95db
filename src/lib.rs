//! Static site server that sends every HTML page with a per-request
//! `Content-Security-Policy` and matching script nonces.
//!
//! The policy builder in [`csp`] has no dependency on the server and can be
//! used on its own.

pub mod config;
pub mod csp;
pub mod handler;
pub mod http;
pub mod net;
pub mod nonce;
pub mod policy;
