//! Wire encoding for full-model and value-changed messages
//!
//! All functions here are pure transforms over a model snapshot at call
//! time. Encoding is deterministic given the traversal order: panels first,
//! then loose groups; within a group, children in registration order.

use serde_json::value::RawValue;
use serde_json::{json, Map, Value};

use crate::model::{Group, Model, Panel, Widget, WidgetValue};

/// Encoding failures. These are programmer-facing and returned
/// synchronously; nothing is written to the wire on failure.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The receiver cannot distinguish "no model" from "empty update".
    #[error("cannot encode a model with no panels and no groups")]
    EmptyModel,

    #[error("task payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Encode the full model into the `{"ps": [...], "g": [...]}` payload.
///
/// Either key is omitted when its list is empty; an entirely empty model is
/// an error.
pub fn encode_model(model: &Model) -> Result<String, EncodeError> {
    if model.is_empty() {
        return Err(EncodeError::EmptyModel);
    }

    let mut root = Map::new();

    if !model.panels.is_empty() {
        let panels: Vec<Value> = model
            .panels
            .iter()
            .map(|panel| encode_panel(&panel.borrow()))
            .collect();
        root.insert("ps".into(), Value::Array(panels));
    }

    if !model.groups.is_empty() {
        let groups: Vec<Value> = model
            .groups
            .iter()
            .map(|group| encode_group(&group.borrow()))
            .collect();
        root.insert("g".into(), Value::Array(groups));
    }

    Ok(Value::Object(root).to_string())
}

fn encode_panel(panel: &Panel) -> Value {
    let groups: Vec<Value> = panel
        .groups
        .iter()
        .map(|group| encode_group(&group.borrow()))
        .collect();
    json!({ "p": groups, "h": panel.height })
}

fn encode_group(group: &Group) -> Value {
    let widgets: Vec<Value> = group
        .children
        .iter()
        .map(|widget| encode_widget(&widget.borrow()))
        .collect();
    json!({ "g": widgets, "l": &group.label })
}

fn encode_widget(widget: &Widget) -> Value {
    let tag = widget.kind().tag();
    match &widget.value {
        WidgetValue::SliderInt {
            value,
            min,
            max,
            step,
        } => json!({
            "t": tag, "v": value, "l": &widget.label, "i": widget.id,
            "minv": min, "maxv": max, "step": step,
        }),
        WidgetValue::SliderFloat {
            value,
            min,
            max,
            step,
        } => json!({
            "t": tag, "v": value, "l": &widget.label, "i": widget.id,
            "minv": min, "maxv": max, "step": step,
        }),
        // No value in the model transfer; the toggle state arrives through
        // a value-changed message.
        WidgetValue::Toggle { .. } => json!({
            "t": tag, "l": &widget.label, "i": widget.id,
        }),
        WidgetValue::ColorRgb {
            channels,
            saturation,
            brightness,
            ..
        } => json!({
            "t": tag, "i": widget.id, "l": &widget.label,
            "n": channels, "s": saturation, "v": brightness,
        }),
        WidgetValue::Button { icon, callback } => json!({
            "t": tag, "i": widget.id, "l": &widget.label,
            "c": icon, "b": callback,
        }),
        WidgetValue::Text { value, text_width } => json!({
            "t": tag, "i": widget.id, "l": &widget.label,
            "v": value, "tw": text_width,
        }),
    }
}

/// Encode the minimal payload identifying a widget and its new value.
///
/// A button change is a click notification and carries only the id.
pub fn encode_value_changed(widget: &Widget) -> String {
    value_changed_json(widget).to_string()
}

fn value_changed_json(widget: &Widget) -> Value {
    match &widget.value {
        WidgetValue::SliderInt { value, .. } => json!({ "i": widget.id, "v": value }),
        WidgetValue::SliderFloat { value, .. } => json!({ "i": widget.id, "v": value }),
        WidgetValue::Toggle { on } => json!({ "i": widget.id, "v": if *on { 1 } else { 0 } }),
        WidgetValue::ColorRgb { percent, .. } => json!({ "i": widget.id, "v": percent }),
        WidgetValue::Button { .. } => json!({ "i": widget.id }),
        WidgetValue::Text { value, .. } => json!({ "i": widget.id, "v": value }),
    }
}

/// Encode the values of every value-carrying widget reachable from the
/// model, in traversal order, as one JSON array.
///
/// Buttons are skipped; a button value would mean a click.
pub fn encode_values(model: &Model) -> String {
    let mut values = Vec::new();
    for panel in &model.panels {
        for group in &panel.borrow().groups {
            push_group_values(&group.borrow(), &mut values);
        }
    }
    for group in &model.groups {
        push_group_values(&group.borrow(), &mut values);
    }
    Value::Array(values).to_string()
}

fn push_group_values(group: &Group, values: &mut Vec<Value>) {
    for widget in &group.children {
        let widget = widget.borrow();
        if matches!(widget.value, WidgetValue::Button { .. }) {
            continue;
        }
        values.push(value_changed_json(&widget));
    }
}

#[derive(serde::Serialize)]
struct Envelope<'a> {
    t: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<&'a RawValue>,
    i: i64,
}

/// Wrap an already-encoded payload into the outer task envelope.
///
/// The payload is spliced as raw JSON, not re-parsed; an empty payload omits
/// the `v` field entirely (e.g. a GetModel request).
pub fn encode_task(kind: i64, session_id: i64, payload: &str) -> Result<String, EncodeError> {
    let raw: Option<&RawValue> = if payload.is_empty() {
        None
    } else {
        Some(serde_json::from_str(payload)?)
    };

    let envelope = Envelope {
        t: kind,
        v: raw,
        i: session_id,
    };
    Ok(serde_json::to_string(&envelope)?)
}
