//! Routing table from widget id to the live widget
//!
//! Rebuilt whenever panels/groups are registered with the connection and
//! cleared on disconnect for the viewer role, so ids from a dead session
//! can never accept updates meant for a newer one.

use std::collections::HashMap;
use std::rc::Rc;

use panelsync_protocol::decode::{self, DecodeError};
use panelsync_protocol::{SharedGroup, SharedPanel, SharedWidget};
use panelsync_utils::{PanelsyncError, Result};
use serde_json::Value;

/// What became of an inbound value-changed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The update was applied to the widget with this id.
    Applied(u32),
    /// No widget with this id is registered. Not an error: the update may
    /// belong to a session that disconnected while it was in flight.
    UnknownWidget(u32),
}

/// Mapping from stable widget id to a shared widget handle.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    widgets: HashMap<u32, SharedWidget>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk a panel and insert every leaf widget, in traversal order.
    pub fn register_panel(&mut self, panel: &SharedPanel) -> Result<()> {
        for group in &panel.borrow().groups {
            self.register_group(group)?;
        }
        Ok(())
    }

    /// Walk a group and insert every leaf widget, in traversal order.
    ///
    /// A duplicate id fails the call; insertions made before the duplicate
    /// was hit stand.
    pub fn register_group(&mut self, group: &SharedGroup) -> Result<()> {
        for widget in &group.borrow().children {
            let id = widget.borrow().id;
            if self.widgets.contains_key(&id) {
                return Err(PanelsyncError::DuplicateWidgetId { id });
            }
            self.widgets.insert(id, Rc::clone(widget));
        }
        Ok(())
    }

    pub fn resolve(&self, id: u32) -> Option<SharedWidget> {
        self.widgets.get(&id).map(Rc::clone)
    }

    /// Apply a single value-changed payload.
    ///
    /// A missing id field is a decode failure; an id that resolves to no
    /// registered widget is the normal race between a disconnect and
    /// in-flight messages and reports [`ApplyOutcome::UnknownWidget`].
    pub fn apply_value_changed(&self, payload: &str) -> std::result::Result<ApplyOutcome, DecodeError> {
        let value: Value = serde_json::from_str(payload)?;
        self.apply_value(&value)
    }

    /// Apply a bulk values payload (one entry per widget), in order.
    pub fn apply_values(&self, payload: &str) -> std::result::Result<Vec<ApplyOutcome>, DecodeError> {
        let entries = decode::decode_values(payload)?;
        entries.iter().map(|entry| self.apply_value(entry)).collect()
    }

    fn apply_value(&self, value: &Value) -> std::result::Result<ApplyOutcome, DecodeError> {
        let id = decode::changed_widget_id(value)?;
        let Some(widget) = self.widgets.get(&id) else {
            return Ok(ApplyOutcome::UnknownWidget(id));
        };
        decode::apply_changed_value(&mut widget.borrow_mut(), value)?;
        Ok(ApplyOutcome::Applied(id))
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}
