//! Database models split into domain-specific modules.

pub mod client;
pub mod client_request;
pub mod common;
pub mod notification;
pub mod repair_request;
pub mod role;
pub mod user;

pub use client::*;
pub use client_request::*;
pub use common::*;
pub use notification::*;
pub use repair_request::*;
pub use role::*;
pub use user::*;
