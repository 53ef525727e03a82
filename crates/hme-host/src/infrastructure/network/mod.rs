//! Network infrastructure for the host.
//!
//! # Sub-modules
//!
//! - **`request`** – parses the HTTP request line a receiver sends first and
//!   maps it to a route.
//! - **`server`** – the TCP accept loop. Application requests are answered
//!   with an HME content type and the socket is handed to a blocking
//!   session; listing and resource requests are served as plain HTTP.
//! - **`discovery`** – builds the DNS-SD announcement for each application.

pub mod discovery;
pub mod request;
pub mod server;
