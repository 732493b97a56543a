//! Client connection to a remote panel peer
//!
//! Owns the transport lifecycle, the connection state machine, reconnection
//! timing, the outbound task queue, and the widget registry, and drives the
//! encoder/decoder. Single logical thread of control: the surrounding event
//! loop calls [`Connection::tick`] once per cycle, and every listener or
//! callback fires synchronously from inside that call.

use std::collections::HashMap;
use std::time::Instant;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use panelsync_protocol::codec::CodecError;
use panelsync_protocol::{decode, encode, FrameCodec, Model, SharedGroup, SharedPanel, TaskKind};
use panelsync_utils::{PanelsyncError, Result};

use crate::config::ConnectionConfig;
use crate::listener::{ChangeCallback, ClientListener};
use crate::registry::{ApplyOutcome, WidgetRegistry};
use crate::tasks::{Task, TaskQueue};
use crate::transport::{TcpTransport, Transport};

/// Connection lifecycle state. Owned exclusively by the connection and
/// driven by transport events only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

/// A point-to-point connection syncing one widget model.
///
/// The side that registered a model before [`connect`](Self::connect) is the
/// application (it pushes its model on connect); a side without one is a
/// viewer (it requests the model on connect). This asymmetry lets either
/// side initiate without negotiation.
pub struct Connection<T: Transport = TcpTransport> {
    config: ConnectionConfig,
    transport: T,
    state: ConnectionState,
    is_application: bool,
    model: Model,
    registry: WidgetRegistry,
    queue: TaskQueue,
    codec: FrameCodec,
    rx_buf: BytesMut,
    reconnect_deadline: Option<Instant>,
    listener: Option<Box<dyn ClientListener>>,
    change_callbacks: HashMap<u32, ChangeCallback>,
}

impl Connection<TcpTransport> {
    /// Connection over the bundled TCP transport, addressed by the config.
    pub fn new(config: ConnectionConfig) -> Self {
        let transport =
            TcpTransport::new(config.host.clone(), config.port, config.connect_timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Connection<T> {
    /// Connection over a caller-provided transport (e.g. a TLS-capable one).
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: ConnectionState::Idle,
            is_application: false,
            model: Model::new(),
            registry: WidgetRegistry::new(),
            queue: TaskQueue::new(),
            codec: FrameCodec::new(),
            rx_buf: BytesMut::new(),
            reconnect_deadline: None,
            listener: None,
            change_callbacks: HashMap::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Application role: this side owns the model and pushes it on connect.
    /// Fixed at `connect()` time.
    pub fn is_application(&self) -> bool {
        self.is_application
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Number of tasks awaiting a writable transport.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// When the next reconnection attempt is due, if disconnected.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_deadline
    }

    pub fn set_listener(&mut self, listener: Box<dyn ClientListener>) {
        self.listener = Some(listener);
    }

    /// Register a change callback for one widget id, replacing any previous
    /// one. Fired synchronously after an inbound update is applied.
    pub fn on_widget_change(&mut self, id: u32, callback: ChangeCallback) {
        self.change_callbacks.insert(id, callback);
    }

    /// Register a panel for transfer and inbound routing.
    pub fn add_panel(&mut self, panel: &SharedPanel) -> Result<()> {
        self.registry.register_panel(panel)?;
        self.model.add_panel(panel);
        Ok(())
    }

    /// Register a loose group (one outside any panel).
    pub fn add_group(&mut self, group: &SharedGroup) -> Result<()> {
        self.registry.register_group(group)?;
        self.model.add_group(group);
        Ok(())
    }

    /// Begin connecting. No-op when already connecting or connected.
    ///
    /// A synchronous connect failure transitions to `Disconnected` and arms
    /// the reconnect deadline; the error is also returned to the caller.
    pub fn connect(&mut self) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            return Ok(());
        }

        // A side with a registered model is the application.
        self.is_application = !self.model.is_empty();
        self.state = ConnectionState::Connecting;

        if let Err(err) = self.transport.connect() {
            self.enter_disconnected(Instant::now());
            return Err(err);
        }
        Ok(())
    }

    /// Drive the connection one step. Never blocks for an unbounded time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// [`tick`](Self::tick) with an explicit clock, for callers that own a
    /// frame timer.
    pub fn tick_at(&mut self, now: Instant) {
        match self.state {
            ConnectionState::Idle => {}
            ConnectionState::Connecting => self.poll_connecting(now),
            ConnectionState::Connected => self.service(now),
            ConnectionState::Disconnected => self.maybe_reconnect(now),
        }
    }

    /// Tear down the transport and drop all pending work. Idempotent.
    pub fn shutdown(&mut self) {
        self.transport.close();
        self.queue.clear();
        self.registry.clear();
        self.rx_buf.clear();
        self.reconnect_deadline = None;
        self.state = ConnectionState::Idle;
    }

    /// Enqueue a `SetModel` task carrying the fully encoded model.
    ///
    /// Called automatically when an application connects; an application
    /// listener also calls this to answer an inbound `GetModel` request.
    pub fn push_model(&mut self) -> Result<()> {
        let payload = encode::encode_model(&self.model)
            .map_err(|err| PanelsyncError::protocol(err.to_string()))?;
        self.queue
            .push(Task::new(TaskKind::SetModel, self.config.session_id, payload));
        Ok(())
    }

    /// Queue a value-changed notification for a locally modified widget.
    pub fn queue_value_changed(&mut self, id: u32) -> Result<()> {
        let widget = self
            .registry
            .resolve(id)
            .ok_or(PanelsyncError::WidgetNotFound { id })?;
        let payload = encode::encode_value_changed(&widget.borrow());
        self.queue.push(Task::new(
            TaskKind::ValueChanged,
            self.config.session_id,
            payload,
        ));
        Ok(())
    }

    fn poll_connecting(&mut self, now: Instant) {
        match self.transport.poll_established() {
            Ok(true) => self.enter_connected(),
            Ok(false) => {}
            Err(err) => {
                warn!(%err, "connection attempt failed");
                self.enter_disconnected(now);
            }
        }
    }

    fn maybe_reconnect(&mut self, now: Instant) {
        let due = self
            .reconnect_deadline
            .map_or(true, |deadline| now >= deadline);
        if !due {
            return;
        }

        debug!("attempting reconnect");
        self.state = ConnectionState::Connecting;
        if let Err(err) = self.transport.connect() {
            warn!(%err, "reconnect attempt failed");
            self.enter_disconnected(now);
        }
    }

    fn enter_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.reconnect_deadline = None;

        if self.is_application {
            if let Err(err) = self.push_model() {
                warn!(%err, "cannot encode model for transfer");
            }
        } else {
            self.queue
                .push(Task::new(TaskKind::GetModel, self.config.session_id, ""));
        }

        if let Some(listener) = self.listener.as_mut() {
            listener.on_connected();
        }
    }

    fn enter_disconnected(&mut self, now: Instant) {
        self.state = ConnectionState::Disconnected;
        self.reconnect_deadline = Some(now + self.config.reconnect_delay());
        self.transport.close();
        self.rx_buf.clear();
        // At-most-once delivery: unflushed tasks do not survive a drop.
        self.queue.clear();

        if !self.is_application {
            // Stale ids from the old session must not accept updates after a
            // reconnect that may re-enumerate different ids.
            self.registry.clear();
            self.model.clear();
        }

        if let Some(listener) = self.listener.as_mut() {
            listener.on_disconnected();
        }
    }

    /// One Connected-state poll cycle: drain a batch of inbound data,
    /// dispatch it, then flush the task queue if the transport is writable.
    fn service(&mut self, now: Instant) {
        if let Err(err) = self.transport.flush() {
            warn!(%err, "transport write failed");
            self.enter_disconnected(now);
            return;
        }

        match self.transport.recv(&mut self.rx_buf) {
            Ok(0) => {}
            Ok(_) => self.dispatch_inbound(now),
            Err(err) => {
                warn!(%err, "transport read failed");
                self.enter_disconnected(now);
                return;
            }
        }

        if self.state != ConnectionState::Connected {
            return;
        }

        if self.transport.is_writable() && !self.queue.is_empty() {
            self.flush_queue(now);
        }
    }

    fn dispatch_inbound(&mut self, now: Instant) {
        loop {
            match self.codec.decode(&mut self.rx_buf) {
                Ok(Some(frame)) => self.dispatch_task(&frame),
                Ok(None) => break,
                Err(CodecError::Utf8(err)) => {
                    // The frame was consumed; drop it and keep going.
                    warn!(%err, "dropping non-UTF-8 frame");
                }
                Err(err) => {
                    // A corrupt length prefix cannot be skipped.
                    warn!(%err, "corrupt frame stream");
                    self.enter_disconnected(now);
                    break;
                }
            }
        }
    }

    fn dispatch_task(&mut self, frame: &str) {
        let envelope = match decode::decode_task(frame.as_bytes()) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(%err, "dropping malformed task");
                return;
            }
        };

        match TaskKind::from_tag(envelope.kind) {
            Some(kind @ (TaskKind::GetModel | TaskKind::SetModel)) => {
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_model(kind, &envelope.payload);
                }
            }
            Some(TaskKind::ValueChanged) => self.apply_value_changed(&envelope.payload),
            None => warn!(kind = envelope.kind, "ignoring task with unknown kind"),
        }
    }

    fn apply_value_changed(&mut self, payload: &str) {
        match self.registry.apply_value_changed(payload) {
            Ok(ApplyOutcome::Applied(id)) => {
                if let Some(callback) = self.change_callbacks.get_mut(&id) {
                    if let Some(widget) = self.registry.resolve(id) {
                        callback(&widget.borrow());
                    }
                }
            }
            Ok(ApplyOutcome::UnknownWidget(id)) => {
                // Normal race between a disconnect and in-flight messages.
                debug!(id, "ignoring value for unregistered widget");
            }
            Err(err) => warn!(%err, "dropping malformed value update"),
        }
    }

    /// Send every task queued at flush start, in FIFO order. The count is
    /// recorded before the first send so tasks enqueued mid-flush wait for
    /// the next writable tick.
    fn flush_queue(&mut self, now: Instant) {
        let pending = self.queue.len();
        for _ in 0..pending {
            let Some(task) = self.queue.pop() else { break };

            let envelope =
                match encode::encode_task(task.kind.tag(), task.session_id, &task.payload) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!(%err, "dropping unencodable task");
                        continue;
                    }
                };

            let mut frame = BytesMut::new();
            if let Err(err) = self.codec.encode(envelope.as_str(), &mut frame) {
                warn!(%err, "dropping oversize task");
                continue;
            }

            if let Err(err) = self.transport.send(&frame) {
                warn!(%err, "transport write failed");
                self.enter_disconnected(now);
                return;
            }
        }
    }
}
