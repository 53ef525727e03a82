//! Application layer of the host.
//!
//! # Sub-modules
//!
//! - **`registry`** – the static `name → factory` table consulted for every
//!   incoming connection.
//! - **`samples`** – small demonstration applications registered with
//!   `--samples` or by name.

pub mod registry;
pub mod samples;
