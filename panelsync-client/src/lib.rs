//! panelsync-client: connection layer for remote control panels
//!
//! Owns the transport lifecycle, the connection state machine with fixed-
//! delay reconnection, the outbound task queue, and the widget registry
//! that routes inbound value updates onto the application's widget tree.
//!
//! The core is single-threaded and poll-driven: there is no background
//! thread, and the surrounding event loop must call [`Connection::tick`]
//! once per cycle.

pub mod config;
pub mod connection;
pub mod listener;
pub mod registry;
pub mod tasks;
pub mod transport;

// Re-export main types at crate root
pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionState};
pub use listener::{ChangeCallback, ClientListener};
pub use registry::{ApplyOutcome, WidgetRegistry};
pub use tasks::{Task, TaskQueue};
pub use transport::{TcpTransport, Transport};
