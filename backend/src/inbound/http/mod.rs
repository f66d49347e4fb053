//! HTTP inbound adapter exposing the resource endpoints.

pub mod error;
pub mod health;
pub mod resource;
pub mod schemas;
pub mod state;
pub mod users;

pub use error::ApiResult;
