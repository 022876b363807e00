//! Project hierarchy lookups.
//!
//! The quota engine only needs two questions answered: "who is this
//! project's parent?" and "what lies below this project?". [`IdentityService`]
//! is that narrow seam; [`StaticIdentityService`] serves a fixed tree and
//! [`KeystoneIdentityService`] asks a Keystone v3 endpoint.

mod error;
mod keystone;
mod service;
mod static_service;

pub use error::IdentityError;
pub use keystone::{KeystoneIdentityService, KeystoneIdentityServiceBuilder};
pub use service::{IdentityService, ProjectRecord};
pub use static_service::StaticIdentityService;
