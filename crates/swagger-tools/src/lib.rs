//! Swagger 2.0 -> MCP tooling.
//!
//! Turns a Swagger document into a set of schema-described tools and, at call time, rebuilds
//! the concrete HTTP request for a tool from caller arguments plus per-call ambient context
//! (organization id, credential, optional base URL, cancellation).
//!
//! Pipeline: [`loader`] -> [`filter`] -> [`naming`] + [`synthesis`] once per load;
//! [`request`] -> [`transport`] -> [`runtime::classify`] once per call.
//! [`runtime::SwaggerToolSource`] ties it together at the MCP boundary.

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod loader;
pub mod naming;
pub mod request;
pub mod resolver;
pub mod runtime;
pub mod semantics;
pub mod spec;
pub mod synthesis;
pub mod transport;

pub use config::ToolsConfig;
pub use context::AmbientContext;
pub use error::{Result, SwaggerToolsError};
pub use runtime::SwaggerToolSource;
