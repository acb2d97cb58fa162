//! # Session Board - Shared Real-Time Board
//!
//! One JSON document (key slots, wiki markers, site markers, notes, wifi
//! credentials and a mode flag) shared by every connected screen.
//!
//! ## Features
//!
//! - **Serialized store**: every mutation runs read → modify → persist under one lock
//! - **Atomic persistence**: compact JSON written to a temp file and renamed into place
//! - **Full-state fan-out**: each accepted change is broadcast in full to all clients
//! - **Fire-and-forget**: rejected events are logged and never echoed back
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use session_board::{server, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     server::start(config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod net;
pub mod server;
pub mod storage;
pub mod sync;

// Re-export main types for library consumers
pub use config::Config;
pub use error::{MutationError, ProtocolError};
pub use storage::{Document, SiteColor, SiteMarkers, Store, WifiEntry};
pub use sync::{ClientEvent, Gateway, ServerEvent, SyncManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
