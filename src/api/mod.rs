//! Data access: the backend collaborator the views fetch from.

pub mod client;
pub mod source;

pub use client::{ApiClient, AuthContext};
pub use source::FleetApi;
