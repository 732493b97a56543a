//! Wire decoding for untrusted inbound bytes
//!
//! Decode failures drop the offending message and leave the connection
//! open; they are surfaced to the caller as [`DecodeError`] so the
//! connection layer can log them. Two tolerances keep mixed-version peers
//! talking: unknown widget type tags are skipped with a warning, and
//! unknown task kinds are reported raw rather than rejected.

use serde_json::Value;
use tracing::warn;

use crate::model::{Group, Model, Panel, Widget, WidgetKind, WidgetValue};

/// Decoding failures for malformed or structurally incomplete messages.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has the wrong type")]
    WrongType { field: &'static str },

    #[error("model payload has neither panels nor groups")]
    EmptyModel,

    #[error("expected {0}")]
    UnexpectedShape(&'static str),
}

/// Decoded outer envelope.
///
/// `kind` is the raw wire tag: well-formed-but-unknown kinds are not a
/// decode failure, the dispatcher logs and ignores them.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEnvelope {
    pub kind: i64,
    pub session_id: i64,
    /// The `v` field re-serialized compactly, or empty when absent.
    pub payload: String,
}

/// Parse a task envelope from raw inbound bytes.
///
/// Fails on malformed JSON or a missing/non-integer `t` or `i` field.
pub fn decode_task(data: &[u8]) -> Result<TaskEnvelope, DecodeError> {
    let value: Value = serde_json::from_slice(data)?;
    let kind = require_i64(&value, "t")?;
    let session_id = require_i64(&value, "i")?;
    let payload = match value.get("v") {
        Some(v) => v.to_string(),
        None => String::new(),
    };
    Ok(TaskEnvelope {
        kind,
        session_id,
        payload,
    })
}

/// Rebuild a full model from a `{"ps": [...], "g": [...]}` payload.
///
/// Widgets with an unknown type tag are skipped with a warning; a payload
/// with neither panels nor groups is structurally incomplete.
pub fn decode_model(payload: &str) -> Result<Model, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;

    let panels = value.get("ps");
    let groups = value.get("g");
    if panels.is_none() && groups.is_none() {
        return Err(DecodeError::EmptyModel);
    }

    let mut model = Model::new();

    if let Some(panels) = panels {
        let panels = panels
            .as_array()
            .ok_or(DecodeError::WrongType { field: "ps" })?;
        for panel in panels {
            model.panels.push(decode_panel(panel)?.shared());
        }
    }

    if let Some(groups) = groups {
        let groups = groups
            .as_array()
            .ok_or(DecodeError::WrongType { field: "g" })?;
        for group in groups {
            model.groups.push(decode_group(group)?.shared());
        }
    }

    Ok(model)
}

fn decode_panel(obj: &Value) -> Result<Panel, DecodeError> {
    let height = require_i64(obj, "h")?;
    let groups = obj
        .get("p")
        .ok_or(DecodeError::MissingField("p"))?
        .as_array()
        .ok_or(DecodeError::WrongType { field: "p" })?;

    let mut panel = Panel::new(height);
    for group in groups {
        panel.groups.push(decode_group(group)?.shared());
    }
    Ok(panel)
}

fn decode_group(obj: &Value) -> Result<Group, DecodeError> {
    let label = require_str(obj, "l")?;
    let widgets = obj
        .get("g")
        .ok_or(DecodeError::MissingField("g"))?
        .as_array()
        .ok_or(DecodeError::WrongType { field: "g" })?;

    let mut group = Group::new(label);
    for widget in widgets {
        if let Some(widget) = decode_widget(widget)? {
            group.children.push(widget.shared());
        }
    }
    Ok(group)
}

/// Returns `Ok(None)` for widget type tags this build does not know about;
/// viewer and application versions may differ.
fn decode_widget(obj: &Value) -> Result<Option<Widget>, DecodeError> {
    let tag = require_i64(obj, "t")?;
    let Some(kind) = WidgetKind::from_tag(tag) else {
        warn!(tag, "skipping widget with unknown type tag");
        return Ok(None);
    };

    let id = require_u32(obj, "i")?;
    let label = require_str(obj, "l")?.to_string();

    let value = match kind {
        WidgetKind::SliderInt => WidgetValue::SliderInt {
            value: require_i64(obj, "v")?,
            min: require_i64(obj, "minv")?,
            max: require_i64(obj, "maxv")?,
            step: require_i64(obj, "step")?,
        },
        WidgetKind::SliderFloat => WidgetValue::SliderFloat {
            value: require_f64(obj, "v")?,
            min: require_f64(obj, "minv")?,
            max: require_f64(obj, "maxv")?,
            step: require_f64(obj, "step")?,
        },
        // The model transfer carries no toggle state; it defaults to false
        // until a value-changed message arrives.
        WidgetKind::Toggle => WidgetValue::Toggle { on: false },
        WidgetKind::ColorRgb => WidgetValue::ColorRgb {
            channels: require_u32(obj, "n")?,
            saturation: require_f64(obj, "s")?,
            brightness: require_f64(obj, "v")?,
            percent: 0.0,
        },
        WidgetKind::Button => WidgetValue::Button {
            icon: require_u32(obj, "c")?,
            callback: require_u32(obj, "b")?,
        },
        WidgetKind::Text => WidgetValue::Text {
            value: require_str(obj, "v")?.to_string(),
            text_width: require_i64(obj, "tw")?,
        },
    };

    Ok(Some(Widget { id, label, value }))
}

/// Extract the target widget id from a value-changed payload.
pub fn changed_widget_id(payload: &Value) -> Result<u32, DecodeError> {
    require_u32(payload, "i")
}

/// Apply a value-changed payload onto the resolved widget.
///
/// The `v` field is interpreted against the widget's own kind; a button
/// payload is a click signal and mutates nothing.
pub fn apply_changed_value(widget: &mut Widget, payload: &Value) -> Result<(), DecodeError> {
    match &mut widget.value {
        WidgetValue::SliderInt { value, .. } => *value = require_i64(payload, "v")?,
        WidgetValue::SliderFloat { value, .. } => *value = require_f64(payload, "v")?,
        WidgetValue::Toggle { on } => *on = require_i64(payload, "v")? != 0,
        WidgetValue::ColorRgb { percent, .. } => *percent = require_f64(payload, "v")?,
        WidgetValue::Button { .. } => {}
        WidgetValue::Text { value, .. } => *value = require_str(payload, "v")?.to_string(),
    }
    Ok(())
}

/// Parse a bulk values payload into its per-widget entries.
pub fn decode_values(payload: &str) -> Result<Vec<Value>, DecodeError> {
    let value: Value = serde_json::from_str(payload)?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(DecodeError::UnexpectedShape(
            "a JSON array of widget values",
        )),
    }
}

fn require_i64(obj: &Value, field: &'static str) -> Result<i64, DecodeError> {
    obj.get(field)
        .ok_or(DecodeError::MissingField(field))?
        .as_i64()
        .ok_or(DecodeError::WrongType { field })
}

fn require_u32(obj: &Value, field: &'static str) -> Result<u32, DecodeError> {
    obj.get(field)
        .ok_or(DecodeError::MissingField(field))?
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(DecodeError::WrongType { field })
}

fn require_f64(obj: &Value, field: &'static str) -> Result<f64, DecodeError> {
    obj.get(field)
        .ok_or(DecodeError::MissingField(field))?
        .as_f64()
        .ok_or(DecodeError::WrongType { field })
}

fn require_str<'a>(obj: &'a Value, field: &'static str) -> Result<&'a str, DecodeError> {
    obj.get(field)
        .ok_or(DecodeError::MissingField(field))?
        .as_str()
        .ok_or(DecodeError::WrongType { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_model, encode_task, encode_value_changed, encode_values};
    use crate::model::TaskKind;

    fn sample_model() -> Model {
        let mut group = Group::new("audio");
        group.add(Widget::new(
            7,
            "gain",
            WidgetValue::SliderInt {
                value: 3,
                min: 0,
                max: 10,
                step: 1,
            },
        ));
        group.add(Widget::new(
            8,
            "level",
            WidgetValue::SliderFloat {
                value: 0.5,
                min: 0.0,
                max: 1.0,
                step: 0.25,
            },
        ));
        group.add(Widget::new(9, "mute", WidgetValue::Toggle { on: false }));

        let mut panel = Panel::new(240);
        panel.add(group);

        let mut loose = Group::new("misc");
        loose.add(Widget::new(
            10,
            "tint",
            WidgetValue::ColorRgb {
                channels: 12,
                saturation: 0.5,
                brightness: 0.75,
                percent: 0.0,
            },
        ));
        loose.add(Widget::new(
            11,
            "save",
            WidgetValue::Button {
                icon: 2,
                callback: 9,
            },
        ));
        loose.add(Widget::new(
            12,
            "title",
            WidgetValue::Text {
                value: "hello".into(),
                text_width: 140,
            },
        ));

        let mut model = Model::new();
        model.add_panel(&panel.shared());
        model.add_group(&loose.shared());
        model
    }

    #[test]
    fn test_model_roundtrip() {
        let model = sample_model();
        let decoded = decode_model(&encode_model(&model).unwrap()).unwrap();
        assert_eq!(decoded, model);
    }

    #[test]
    fn test_decode_task_roundtrip() {
        let envelope = encode_task(TaskKind::ValueChanged.tag(), 42, r#"{"i":7,"v":5}"#).unwrap();
        let task = decode_task(envelope.as_bytes()).unwrap();
        assert_eq!(task.kind, 3);
        assert_eq!(task.session_id, 42);

        let payload: Value = serde_json::from_str(&task.payload).unwrap();
        assert_eq!(payload["i"], 7);
        assert_eq!(payload["v"], 5);
    }

    #[test]
    fn test_decode_task_without_payload() {
        let task = decode_task(br#"{"t":1,"i":0}"#).unwrap();
        assert_eq!(task.kind, 1);
        assert!(task.payload.is_empty());
    }

    #[test]
    fn test_decode_task_malformed_json() {
        assert!(matches!(
            decode_task(b"{not json"),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_task_missing_kind() {
        assert!(matches!(
            decode_task(br#"{"i":0}"#),
            Err(DecodeError::MissingField("t"))
        ));
    }

    #[test]
    fn test_decode_task_non_integer_kind() {
        assert!(matches!(
            decode_task(br#"{"t":1.5,"i":0}"#),
            Err(DecodeError::WrongType { field: "t" })
        ));
    }

    #[test]
    fn test_decode_task_unknown_kind_is_not_an_error() {
        let task = decode_task(br#"{"t":77,"i":0}"#).unwrap();
        assert_eq!(task.kind, 77);
        assert_eq!(TaskKind::from_tag(task.kind), None);
    }

    #[test]
    fn test_decode_model_empty_payload() {
        assert!(matches!(decode_model("{}"), Err(DecodeError::EmptyModel)));
    }

    #[test]
    fn test_decode_model_unknown_widget_tag_skipped() {
        let payload = r#"{"g":[{"l":"g","g":[
            {"t":99,"i":1,"l":"mystery"},
            {"t":3,"i":2,"l":"mute"}
        ]}]}"#;
        let model = decode_model(payload).unwrap();
        let group = model.groups[0].borrow();
        assert_eq!(group.children.len(), 1);
        assert_eq!(group.children[0].borrow().id, 2);
    }

    #[test]
    fn test_decode_model_missing_widget_field_fails() {
        // known tag but no bounds: structurally incomplete
        let payload = r#"{"g":[{"l":"g","g":[{"t":1,"i":1,"l":"gain","v":3}]}]}"#;
        assert!(matches!(
            decode_model(payload),
            Err(DecodeError::MissingField("minv"))
        ));
    }

    #[test]
    fn test_decode_model_int_slider_rejects_float_bounds() {
        let payload =
            r#"{"g":[{"l":"g","g":[{"t":1,"i":1,"l":"gain","v":3,"minv":0.5,"maxv":10,"step":1}]}]}"#;
        assert!(matches!(
            decode_model(payload),
            Err(DecodeError::WrongType { field: "minv" })
        ));
    }

    #[test]
    fn test_decode_model_float_slider_keeps_precision() {
        let payload = r#"{"g":[{"l":"g","g":[
            {"t":2,"i":1,"l":"level","v":0.123456789012345,"minv":0,"maxv":1,"step":0.1}
        ]}]}"#;
        let model = decode_model(payload).unwrap();
        let group = model.groups[0].borrow();
        let widget = group.children[0].borrow();
        match widget.value {
            WidgetValue::SliderFloat { value, .. } => assert_eq!(value, 0.123456789012345),
            _ => panic!("expected a float slider"),
        }
    }

    #[test]
    fn test_apply_changed_value_per_kind() {
        let payload: Value = serde_json::from_str(r#"{"i":7,"v":5}"#).unwrap();
        let mut widget = Widget::new(
            7,
            "gain",
            WidgetValue::SliderInt {
                value: 3,
                min: 0,
                max: 10,
                step: 1,
            },
        );
        apply_changed_value(&mut widget, &payload).unwrap();
        assert!(matches!(
            widget.value,
            WidgetValue::SliderInt { value: 5, .. }
        ));

        let payload: Value = serde_json::from_str(r#"{"i":9,"v":1}"#).unwrap();
        let mut widget = Widget::new(9, "mute", WidgetValue::Toggle { on: false });
        apply_changed_value(&mut widget, &payload).unwrap();
        assert!(matches!(widget.value, WidgetValue::Toggle { on: true }));

        let payload: Value = serde_json::from_str(r#"{"i":10,"v":0.25}"#).unwrap();
        let mut widget = Widget::new(
            10,
            "tint",
            WidgetValue::ColorRgb {
                channels: 12,
                saturation: 0.5,
                brightness: 0.75,
                percent: 0.0,
            },
        );
        apply_changed_value(&mut widget, &payload).unwrap();
        assert!(matches!(
            widget.value,
            WidgetValue::ColorRgb { percent, .. } if percent == 0.25
        ));

        let payload: Value = serde_json::from_str(r#"{"i":12,"v":"world"}"#).unwrap();
        let mut widget = Widget::new(
            12,
            "title",
            WidgetValue::Text {
                value: "hello".into(),
                text_width: 140,
            },
        );
        apply_changed_value(&mut widget, &payload).unwrap();
        assert!(matches!(
            widget.value,
            WidgetValue::Text { ref value, .. } if value == "world"
        ));
    }

    #[test]
    fn test_value_roundtrip_per_kind() {
        let widgets = [
            Widget::new(
                1,
                "gain",
                WidgetValue::SliderInt {
                    value: 5,
                    min: 0,
                    max: 10,
                    step: 1,
                },
            ),
            Widget::new(
                2,
                "level",
                WidgetValue::SliderFloat {
                    value: 0.625,
                    min: 0.0,
                    max: 1.0,
                    step: 0.125,
                },
            ),
            Widget::new(3, "mute", WidgetValue::Toggle { on: true }),
            Widget::new(
                4,
                "tint",
                WidgetValue::ColorRgb {
                    channels: 12,
                    saturation: 0.5,
                    brightness: 0.75,
                    percent: 0.5,
                },
            ),
            Widget::new(
                5,
                "title",
                WidgetValue::Text {
                    value: "abc".into(),
                    text_width: 80,
                },
            ),
        ];

        for original in widgets {
            let payload: Value =
                serde_json::from_str(&encode_value_changed(&original)).unwrap();
            assert_eq!(changed_widget_id(&payload).unwrap(), original.id);

            // Start from a widget of the same kind holding a different value
            let mut target = original.clone();
            match &mut target.value {
                WidgetValue::SliderInt { value, .. } => *value = 0,
                WidgetValue::SliderFloat { value, .. } => *value = 0.0,
                WidgetValue::Toggle { on } => *on = false,
                WidgetValue::ColorRgb { percent, .. } => *percent = 0.0,
                WidgetValue::Button { .. } => {}
                WidgetValue::Text { value, .. } => value.clear(),
            }

            apply_changed_value(&mut target, &payload).unwrap();
            assert_eq!(target, original);
        }
    }

    #[test]
    fn test_button_click_mutates_nothing() {
        let original = Widget::new(
            4,
            "save",
            WidgetValue::Button {
                icon: 2,
                callback: 9,
            },
        );
        let payload: Value = serde_json::from_str(&encode_value_changed(&original)).unwrap();

        let mut target = original.clone();
        apply_changed_value(&mut target, &payload).unwrap();
        assert_eq!(target, original);
    }

    #[test]
    fn test_changed_widget_id_missing() {
        let payload: Value = serde_json::from_str(r#"{"v":5}"#).unwrap();
        assert!(matches!(
            changed_widget_id(&payload),
            Err(DecodeError::MissingField("i"))
        ));
    }

    #[test]
    fn test_decode_values_roundtrip() {
        let model = sample_model();
        let entries = decode_values(&encode_values(&model)).unwrap();
        // five value-carrying widgets; the button is excluded
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_decode_values_rejects_non_array() {
        assert!(matches!(
            decode_values(r#"{"i":1}"#),
            Err(DecodeError::UnexpectedShape(_))
        ));
    }
}
