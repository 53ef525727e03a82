//! Domain model: remote resources and the view tree, both owned by a session.

pub mod resource;
pub mod view;
