//! Data models for the Serapeu tutorial community.
//!
//! Field names serialize in camelCase so the same shapes travel over the REST
//! boundary and live in the client state store.

mod admin_log;
mod datastore;
mod folder;
mod problem;
mod request;
mod tutorial;
mod user;

pub use admin_log::*;
pub use datastore::*;
pub use folder::*;
pub use problem::*;
pub use request::*;
pub use tutorial::*;
pub use user::*;
