//! HTTP API module.
//!
//! The server, its response bodies and the log broadcaster shared by the
//! engines.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{build_router, start_server, AppState};
pub use types::*;
