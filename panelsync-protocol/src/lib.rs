//! panelsync-protocol: wire protocol for remote control panels
//!
//! This crate defines the widget model transferred between an application
//! (the peer that owns the panel state) and a viewer (the peer that renders
//! it remotely), the JSON encoder/decoder for full-model and value-changed
//! messages, and the length-prefixed frame codec used on the wire.

pub mod codec;
pub mod decode;
pub mod encode;
pub mod model;

// Re-export main types at crate root
pub use codec::{CodecError, FrameCodec};
pub use decode::{DecodeError, TaskEnvelope};
pub use encode::EncodeError;
pub use model::{
    Group, Model, Panel, SharedGroup, SharedPanel, SharedWidget, TaskKind, Widget, WidgetKind,
    WidgetValue,
};
