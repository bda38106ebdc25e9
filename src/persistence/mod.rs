//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig (uri, timeouts)
//!     → connector.rs (parse, ping once)
//!     → state.rs (Disconnected → Connecting → Connected | Failed)
//!     → Connection handed to AppState for the route groups
//! ```

pub mod connector;
pub mod state;

pub use connector::{connect, mask_connection_string, ConnectError, ConnectOptions, Connection};
pub use state::{ConnectionMonitor, ConnectionState};
