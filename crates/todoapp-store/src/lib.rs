//! Client-side todo store.
//!
//! Holds the canonical list of todos, keeps it in step with the remote task
//! API through a [`TodoGateway`], and derives the filtered views and counts
//! the UI renders.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod query;
pub mod store;

pub use config::{ClientConfig, ConfigError};
pub use error::{StoreError, normalize_error};
pub use gateway::{GatewayError, GatewayResult, ListPage, TodoGateway};
pub use http::HttpGateway;
pub use store::{Phase, StoreState, TodoStore};
