//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → dispatcher.rs (ask the pool for a target)
//!     → proxy.rs (rewrite URI, forward, stream back)
//!     → response.rs (strip hop-by-hop headers, error statuses)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use proxy::{ForwardError, ReverseProxy};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
