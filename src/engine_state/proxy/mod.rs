//! # Event Proxy
//!
//! The worker never owns the element that receives input. The host forwards
//! serialized events keyed by an opaque id, and each id maps to a
//! [`ProxyEntry`] that stands in for the element: it remembers the last
//! bounding rectangle and queues events for the orbit controller.
//!
//! ## Key Components
//! - `ProxyId`: Opaque id; hosts may send it as a string or a number
//! - `ProxyEntry`: Rectangle plus pending events for one surface
//! - `ProxyRegistry`: All live entries; cleared as a whole by `dispose`

pub mod events;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use events::{ClientRect, ProxyEventData};

/// Events kept per entry before the oldest is dropped.
const MAX_PENDING_EVENTS: usize = 512;

/// Identifies one forwarded surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawProxyId", into = "String")]
pub struct ProxyId(String);

impl ProxyId {
    /// Wraps an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProxyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<ProxyId> for String {
    fn from(id: ProxyId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProxyId {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<RawProxyId> for ProxyId {
    fn from(raw: RawProxyId) -> Self {
        match raw {
            RawProxyId::Text(text) => ProxyId(text),
            RawProxyId::Integer(number) => ProxyId(number.to_string()),
            RawProxyId::Float(number) => ProxyId(number.to_string()),
        }
    }
}

/// The worker-side stand-in for one host element.
#[derive(Debug, Default)]
pub struct ProxyEntry {
    rect: ClientRect,
    pending: VecDeque<ProxyEventData>,
    dropped: usize,
}

impl ProxyEntry {
    /// Last known bounding rectangle.
    pub fn rect(&self) -> ClientRect {
        self.rect
    }

    /// Element width in CSS pixels.
    pub fn client_width(&self) -> f32 {
        self.rect.width
    }

    /// Element height in CSS pixels.
    pub fn client_height(&self) -> f32 {
        self.rect.height
    }

    /// Number of queued events.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Applies or queues one event. `size` updates the rectangle immediately.
    pub fn handle_event(&mut self, event: ProxyEventData) {
        match event {
            ProxyEventData::Size(rect) => self.rect = rect,
            ProxyEventData::Unknown | ProxyEventData::ContextMenu => {}
            event => {
                if self.pending.len() == MAX_PENDING_EVENTS {
                    self.pending.pop_front();
                    self.dropped += 1;
                    if self.dropped.is_power_of_two() {
                        debug!("Proxy event queue full, {} events dropped", self.dropped);
                    }
                }
                self.pending.push_back(event);
            }
        }
    }

    /// Takes every queued event, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = ProxyEventData> + '_ {
        self.pending.drain(..)
    }
}

/// Every proxy entry the host has created.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
    targets: HashMap<ProxyId, ProxyEntry>,
}

impl ProxyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the entry for `id`. An existing entry is kept untouched.
    ///
    /// # Returns
    /// `true` if a new entry was created
    pub fn make_proxy(&mut self, id: ProxyId) -> bool {
        if self.targets.contains_key(&id) {
            warn!("Proxy already exists for ID: {id}");
            return false;
        }
        info!("Proxy created for ID: {id}");
        self.targets.insert(id, ProxyEntry::default());
        true
    }

    /// Forwards `event` to the entry for `id`.
    ///
    /// # Returns
    /// `false` if no such entry exists; the event is dropped
    pub fn dispatch(&mut self, id: &ProxyId, event: ProxyEventData) -> bool {
        match self.targets.get_mut(id) {
            Some(entry) => {
                entry.handle_event(event);
                true
            }
            None => {
                warn!("Proxy not found for event target ID: {id}");
                false
            }
        }
    }

    /// Whether an entry exists for `id`.
    pub fn contains(&self, id: &ProxyId) -> bool {
        self.targets.contains_key(id)
    }

    /// The entry for `id`.
    pub fn get(&self, id: &ProxyId) -> Option<&ProxyEntry> {
        self.targets.get(id)
    }

    /// The entry for `id`, mutably.
    pub fn get_mut(&mut self, id: &ProxyId) -> Option<&mut ProxyEntry> {
        self.targets.get_mut(id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Drops every entry.
    pub fn dispose(&mut self) {
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::WheelData;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let text: ProxyId = serde_json::from_str(r#""canvas-1""#).unwrap();
        let number: ProxyId = serde_json::from_str("7").unwrap();
        assert_eq!(text, ProxyId::new("canvas-1"));
        assert_eq!(number, ProxyId::new("7"));
        assert_eq!(serde_json::to_string(&number).unwrap(), r#""7""#);
    }

    #[test]
    fn make_proxy_keeps_existing_entries() {
        let mut registry = ProxyRegistry::new();
        let id = ProxyId::new("c");
        assert!(registry.make_proxy(id.clone()));
        registry.dispatch(
            &id,
            ProxyEventData::Size(ClientRect { left: 0.0, top: 0.0, width: 640.0, height: 480.0 }),
        );
        assert!(!registry.make_proxy(id.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).unwrap().client_height(), 480.0);
    }

    #[test]
    fn size_updates_rect_and_other_events_queue() {
        let mut registry = ProxyRegistry::new();
        let id = ProxyId::new("c");
        registry.make_proxy(id.clone());
        registry.dispatch(
            &id,
            ProxyEventData::Size(ClientRect { left: 10.0, top: 20.0, width: 100.0, height: 50.0 }),
        );
        registry.dispatch(&id, ProxyEventData::Wheel(WheelData { delta_x: 0.0, delta_y: 1.0 }));
        let entry = registry.get_mut(&id).unwrap();
        assert_eq!(entry.rect().right(), 110.0);
        assert_eq!(entry.rect().bottom(), 70.0);
        assert_eq!(entry.pending_len(), 1);
        assert_eq!(entry.drain().count(), 1);
        assert_eq!(entry.pending_len(), 0);
    }

    #[test]
    fn unknown_ids_are_dropped_and_dispose_clears_everything() {
        let mut registry = ProxyRegistry::new();
        assert!(!registry.dispatch(&ProxyId::new("ghost"), ProxyEventData::ContextMenu));
        registry.make_proxy(ProxyId::new("a"));
        registry.make_proxy(ProxyId::new("b"));
        registry.dispose();
        assert!(registry.is_empty());
    }

    #[test]
    fn queue_is_bounded() {
        let mut entry = ProxyEntry::default();
        for _ in 0..MAX_PENDING_EVENTS + 10 {
            entry.handle_event(ProxyEventData::Wheel(WheelData::default()));
        }
        assert_eq!(entry.pending_len(), MAX_PENDING_EVENTS);
    }
}
