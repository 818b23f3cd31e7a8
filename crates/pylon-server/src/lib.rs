//! Kernel, application assembly, and HTTP host for the Pylon framework.
//!
//! The [`AppBuilder`] wires the pieces together: environment, realm,
//! middleware and authentication chains, switches, and providers. The
//! result is a [`Kernel`] — the synchronous per-request pipeline — which
//! the [`Server`] hosts over hyper.
//!
//! # Example
//!
//! ```rust,ignore
//! use pylon_server::{AppBuilder, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> pylon_core::PylonResult<()> {
//!     let kernel = AppBuilder::new()
//!         .switch(Box::new(AppSwitch), "v1")
//!         .build()?;
//!     Server::new(kernel, ServerConfig::default()).run().await
//! }
//! ```

pub mod config;
pub mod kernel;
pub mod provider;
pub mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use kernel::Kernel;
pub use provider::{AppBuilder, Provider};
pub use server::Server;
pub use shutdown::{ConnectionTracker, ShutdownSignal};
