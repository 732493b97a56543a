//! Widget model shared between application and viewer
//!
//! The model is a tree of panels containing groups containing widgets, plus
//! loose groups that sit outside any panel. The surrounding application owns
//! the tree; the connection layer holds shared handles into it for encoding
//! and for routing inbound value updates.

use std::cell::RefCell;
use std::rc::Rc;

/// Handle to a widget owned by the surrounding application.
///
/// The whole core is single-threaded (the connection is driven from one
/// logical thread via `tick()`), so shared nodes use `Rc<RefCell<_>>`.
pub type SharedWidget = Rc<RefCell<Widget>>;

/// Handle to a group owned by the surrounding application.
pub type SharedGroup = Rc<RefCell<Group>>;

/// Handle to a panel owned by the surrounding application.
pub type SharedPanel = Rc<RefCell<Panel>>;

/// Protocol message kinds carried in the task envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Request the full model from the peer.
    GetModel,
    /// Deliver the full model to the peer.
    SetModel,
    /// Single-widget value update.
    ValueChanged,
}

impl TaskKind {
    /// Stable integer tag used in the wire envelope.
    pub fn tag(self) -> i64 {
        match self {
            TaskKind::GetModel => 1,
            TaskKind::SetModel => 2,
            TaskKind::ValueChanged => 3,
        }
    }

    /// Map a wire tag back to a task kind. Unknown tags yield `None` and are
    /// the caller's business to log and ignore, never a decode failure.
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            1 => Some(TaskKind::GetModel),
            2 => Some(TaskKind::SetModel),
            3 => Some(TaskKind::ValueChanged),
            _ => None,
        }
    }
}

/// Widget type tags. The set is closed: encode, decode, and value
/// application all match exhaustively over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    SliderInt,
    SliderFloat,
    Toggle,
    ColorRgb,
    Button,
    Text,
}

impl WidgetKind {
    /// Stable integer tag used in widget wire objects.
    pub fn tag(self) -> i64 {
        match self {
            WidgetKind::SliderInt => 1,
            WidgetKind::SliderFloat => 2,
            WidgetKind::Toggle => 3,
            WidgetKind::ColorRgb => 4,
            WidgetKind::Button => 5,
            WidgetKind::Text => 6,
        }
    }

    /// Map a wire tag back to a widget kind. Unknown tags yield `None`; the
    /// decoder skips those widgets so that peers of different versions can
    /// still exchange the rest of a model.
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            1 => Some(WidgetKind::SliderInt),
            2 => Some(WidgetKind::SliderFloat),
            3 => Some(WidgetKind::Toggle),
            4 => Some(WidgetKind::ColorRgb),
            5 => Some(WidgetKind::Button),
            6 => Some(WidgetKind::Text),
            _ => None,
        }
    }
}

/// The typed value carried by a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetValue {
    SliderInt {
        value: i64,
        min: i64,
        max: i64,
        step: i64,
    },
    SliderFloat {
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    Toggle {
        on: bool,
    },
    ColorRgb {
        /// Number of selectable colors.
        channels: u32,
        saturation: f64,
        brightness: f64,
        /// Live hue position; this is what value-changed messages carry.
        percent: f64,
    },
    /// Buttons are click notifications, not value holders.
    Button {
        icon: u32,
        callback: u32,
    },
    Text {
        value: String,
        text_width: i64,
    },
}

impl WidgetValue {
    pub fn kind(&self) -> WidgetKind {
        match self {
            WidgetValue::SliderInt { .. } => WidgetKind::SliderInt,
            WidgetValue::SliderFloat { .. } => WidgetKind::SliderFloat,
            WidgetValue::Toggle { .. } => WidgetKind::Toggle,
            WidgetValue::ColorRgb { .. } => WidgetKind::ColorRgb,
            WidgetValue::Button { .. } => WidgetKind::Button,
            WidgetValue::Text { .. } => WidgetKind::Text,
        }
    }
}

/// One control in a group.
///
/// Ids are assigned once by the application, are unique across the registry
/// for the lifetime of a connection, and are never reused while referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: u32,
    pub label: String,
    pub value: WidgetValue,
}

impl Widget {
    pub fn new(id: u32, label: impl Into<String>, value: WidgetValue) -> Self {
        Self {
            id,
            label: label.into(),
            value,
        }
    }

    pub fn kind(&self) -> WidgetKind {
        self.value.kind()
    }

    /// Wrap this widget in a shared handle.
    pub fn shared(self) -> SharedWidget {
        Rc::new(RefCell::new(self))
    }
}

/// An ordered collection of widgets. Order is render/transfer order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub label: String,
    pub children: Vec<SharedWidget>,
}

impl Group {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Append a widget and return its shared handle.
    pub fn add(&mut self, widget: Widget) -> SharedWidget {
        let widget = widget.shared();
        self.children.push(Rc::clone(&widget));
        widget
    }

    /// Wrap this group in a shared handle.
    pub fn shared(self) -> SharedGroup {
        Rc::new(RefCell::new(self))
    }
}

/// An ordered collection of groups with a display height.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub height: i64,
    pub groups: Vec<SharedGroup>,
}

impl Panel {
    pub fn new(height: i64) -> Self {
        Self {
            height,
            groups: Vec::new(),
        }
    }

    /// Append a group and return its shared handle.
    pub fn add(&mut self, group: Group) -> SharedGroup {
        let group = group.shared();
        self.groups.push(Rc::clone(&group));
        group
    }

    /// Wrap this panel in a shared handle.
    pub fn shared(self) -> SharedPanel {
        Rc::new(RefCell::new(self))
    }
}

/// The top-level transferable unit: panels plus any groups registered
/// outside a panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub panels: Vec<SharedPanel>,
    pub groups: Vec<SharedGroup>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_panel(&mut self, panel: &SharedPanel) {
        self.panels.push(Rc::clone(panel));
    }

    pub fn add_group(&mut self, group: &SharedGroup) {
        self.groups.push(Rc::clone(group));
    }

    /// An empty model cannot be transferred; the receiver could not tell
    /// "no model" from "empty update".
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty() && self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.panels.clear();
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_tags_roundtrip() {
        for kind in [TaskKind::GetModel, TaskKind::SetModel, TaskKind::ValueChanged] {
            assert_eq!(TaskKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_task_kind_unknown_tag() {
        assert_eq!(TaskKind::from_tag(0), None);
        assert_eq!(TaskKind::from_tag(99), None);
    }

    #[test]
    fn test_widget_kind_tags_roundtrip() {
        for kind in [
            WidgetKind::SliderInt,
            WidgetKind::SliderFloat,
            WidgetKind::Toggle,
            WidgetKind::ColorRgb,
            WidgetKind::Button,
            WidgetKind::Text,
        ] {
            assert_eq!(WidgetKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn test_widget_kind_unknown_tag() {
        assert_eq!(WidgetKind::from_tag(0), None);
        assert_eq!(WidgetKind::from_tag(7), None);
    }

    #[test]
    fn test_widget_kind_from_value() {
        let widget = Widget::new(1, "power", WidgetValue::Toggle { on: false });
        assert_eq!(widget.kind(), WidgetKind::Toggle);
    }

    #[test]
    fn test_group_add_shares_widget() {
        let mut group = Group::new("main");
        let handle = group.add(Widget::new(
            1,
            "gain",
            WidgetValue::SliderInt {
                value: 3,
                min: 0,
                max: 10,
                step: 1,
            },
        ));

        handle.borrow_mut().value = WidgetValue::SliderInt {
            value: 7,
            min: 0,
            max: 10,
            step: 1,
        };

        let via_group = group.children[0].borrow();
        assert!(matches!(
            via_group.value,
            WidgetValue::SliderInt { value: 7, .. }
        ));
    }

    #[test]
    fn test_model_empty() {
        let mut model = Model::new();
        assert!(model.is_empty());

        let panel = Panel::new(300).shared();
        model.add_panel(&panel);
        assert!(!model.is_empty());

        model.clear();
        assert!(model.is_empty());
    }

    #[test]
    fn test_model_loose_group() {
        let mut model = Model::new();
        let group = Group::new("loose").shared();
        model.add_group(&group);
        assert!(!model.is_empty());
        assert!(model.panels.is_empty());
    }
}
