//! Listener plumbing for connection events
//!
//! The original inheritance-style widget→group→client listener chain is
//! replaced by a single connection-level trait plus a per-widget callback
//! table keyed by id (see [`crate::Connection::on_widget_change`]), both
//! invoked synchronously from the dispatch step so event order matches
//! arrival order.

use panelsync_protocol::{TaskKind, Widget};

/// Receives connection-level events.
///
/// Model payloads are handed over as raw JSON; interpreting them — and
/// answering a `GetModel` request via [`crate::Connection::push_model`] —
/// is the surrounding application's business.
pub trait ClientListener {
    fn on_connected(&mut self) {}

    fn on_disconnected(&mut self) {}

    /// A `GetModel` request or `SetModel` delivery arrived.
    fn on_model(&mut self, kind: TaskKind, payload: &str) {
        let _ = (kind, payload);
    }
}

/// Per-widget change callback, fired after an inbound value update has been
/// applied to the widget.
pub type ChangeCallback = Box<dyn FnMut(&Widget)>;
