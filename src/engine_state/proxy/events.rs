//! Input events forwarded from the host, in the shape the host serializes them.
//!
//! Field names follow the DOM event properties (`clientX`, `ctrlKey`, ...).
//! Every payload field is optional on the wire and defaults to zero or
//! `false`, so partial events from simpler hosts still decode.

use serde::{Deserialize, Serialize};

/// Arrow key codes the host forwards; every other key stays on the host.
pub const ARROW_KEY_CODES: [u32; 4] = [37, 38, 39, 40];

/// Bounding rectangle of the host-side surface element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRect {
    /// Offset from the left of the viewport
    pub left: f32,
    /// Offset from the top of the viewport
    pub top: f32,
    /// Width in CSS pixels
    pub width: f32,
    /// Height in CSS pixels
    pub height: f32,
}

impl ClientRect {
    /// Right edge.
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Pointer and mouse event properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointerData {
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    /// 0 = primary, 1 = auxiliary (middle), 2 = secondary
    pub button: i32,
    /// `mouse`, `pen` or `touch`
    pub pointer_type: String,
    pub client_x: f32,
    pub client_y: f32,
    pub pointer_id: i64,
    pub page_x: f32,
    pub page_y: f32,
}

/// Wheel scroll deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WheelData {
    pub delta_x: f32,
    pub delta_y: f32,
}

/// A forwarded `keydown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyData {
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub key_code: u32,
}

/// One active touch point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TouchPoint {
    pub page_x: f32,
    pub page_y: f32,
    pub client_x: f32,
    pub client_y: f32,
}

/// Every touch currently on the surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchData {
    pub touches: Vec<TouchPoint>,
}

/// An event forwarded to a proxy entry, tagged by its DOM event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxyEventData {
    /// The surface element moved or resized
    Size(ClientRect),
    PointerDown(PointerData),
    PointerMove(PointerData),
    PointerUp(PointerData),
    PointerCancel(PointerData),
    MouseDown(PointerData),
    MouseMove(PointerData),
    MouseUp(PointerData),
    Wheel(WheelData),
    KeyDown(KeyData),
    TouchStart(TouchData),
    TouchMove(TouchData),
    TouchEnd(TouchData),
    ContextMenu,
    /// Any event type the worker does not interpret
    #[serde(other)]
    Unknown,
}

impl ProxyEventData {
    /// The DOM event type name.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyEventData::Size(_) => "size",
            ProxyEventData::PointerDown(_) => "pointerdown",
            ProxyEventData::PointerMove(_) => "pointermove",
            ProxyEventData::PointerUp(_) => "pointerup",
            ProxyEventData::PointerCancel(_) => "pointercancel",
            ProxyEventData::MouseDown(_) => "mousedown",
            ProxyEventData::MouseMove(_) => "mousemove",
            ProxyEventData::MouseUp(_) => "mouseup",
            ProxyEventData::Wheel(_) => "wheel",
            ProxyEventData::KeyDown(_) => "keydown",
            ProxyEventData::TouchStart(_) => "touchstart",
            ProxyEventData::TouchMove(_) => "touchmove",
            ProxyEventData::TouchEnd(_) => "touchend",
            ProxyEventData::ContextMenu => "contextmenu",
            ProxyEventData::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_dom_shaped_pointer_events() {
        let event: ProxyEventData = serde_json::from_str(
            r#"{"type":"pointerdown","button":2,"pointerType":"mouse","clientX":10.5,"clientY":4,"shiftKey":true}"#,
        )
        .unwrap();
        match event {
            ProxyEventData::PointerDown(data) => {
                assert_eq!(data.button, 2);
                assert_eq!(data.pointer_type, "mouse");
                assert_eq!(data.client_x, 10.5);
                assert!(data.shift_key && !data.ctrl_key);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn decodes_size_and_touch_lists() {
        let size: ProxyEventData =
            serde_json::from_str(r#"{"type":"size","left":1,"top":2,"width":300,"height":200}"#)
                .unwrap();
        assert_eq!(
            size,
            ProxyEventData::Size(ClientRect { left: 1.0, top: 2.0, width: 300.0, height: 200.0 })
        );

        let touch: ProxyEventData = serde_json::from_str(
            r#"{"type":"touchstart","touches":[{"pageX":1,"pageY":2},{"pageX":3,"pageY":4}]}"#,
        )
        .unwrap();
        match touch {
            ProxyEventData::TouchStart(data) => assert_eq!(data.touches.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_types_are_tolerated() {
        let event: ProxyEventData = serde_json::from_str(r#"{"type":"dblclick"}"#).unwrap();
        assert_eq!(event, ProxyEventData::Unknown);
        assert_eq!(
            serde_json::from_str::<ProxyEventData>(r#"{"type":"contextmenu"}"#).unwrap(),
            ProxyEventData::ContextMenu
        );
    }
}
