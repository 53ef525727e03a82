//! Infrastructure layer for the host.
//!
//! Contains the OS-facing adapters: the TCP server, the discovery
//! announcement and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and `hme_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod network;
pub mod storage;
