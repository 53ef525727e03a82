//! hme-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Layout
//!
//! - **`application`** – the registry of hosted applications and the sample
//!   applications that ship with the host.
//! - **`infrastructure`** – sockets and files: the TCP server that hands
//!   connections to sessions, the discovery announcement, and the TOML
//!   configuration file.

pub mod application;
pub mod infrastructure;
