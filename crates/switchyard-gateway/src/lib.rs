//! `switchyard-gateway` — dispatch engine and OpenAI-compatible HTTP surface.
//!
//! | Piece | Type |
//! |-------|------|
//! | Route a request to a built-in or custom adapter | [`dispatch::Dispatcher`] |
//! | Layered settings | [`config::GatewaySettings`] |
//! | axum service | [`server::GatewayServer`], [`server::router`] |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use switchyard_gateway::{GatewayServer, GatewaySettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = GatewaySettings::load()?;
//!     GatewayServer::new(settings).start().await
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod server;

pub use config::{ConfigError, GatewaySettings, ProviderSettings};
pub use dispatch::{DispatchStream, Dispatcher, collect_content};
pub use error::{GatewayError, GatewayResult};
pub use server::{GatewayServer, router};
