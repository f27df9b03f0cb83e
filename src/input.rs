use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return None;
        };
        ch.is_ascii_alphabetic()
            .then_some(Self::Character(ch.to_ascii_uppercase()))
    }

    fn steers_left(self) -> bool {
        matches!(
            self,
            KeyCode::Named(NamedKey::Left) | KeyCode::Character('A')
        )
    }

    fn steers_right(self) -> bool {
        matches!(
            self,
            KeyCode::Named(NamedKey::Right) | KeyCode::Character('D')
        )
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" | " " => Space,
        "Enter" | "Return" => Enter,
        "Left" | "ArrowLeft" => Left,
        "Right" | "ArrowRight" => Right,
        "Up" | "ArrowUp" => Up,
        "Down" | "ArrowDown" => Down,
        "Escape" | "Esc" => Escape,
        "Shift" | "LeftShift" | "RightShift" => Shift,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Friendly names for the keys the games react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Shift,
}

/// Thread-safe input snapshot shared between event listeners and the
/// Ice Slide loop.
///
/// Once detached every write is dropped, so listeners that outlive their
/// run cannot steer a later one.
#[derive(Debug)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    touch_anchor: RwLock<Option<f32>>,
    drag_delta: RwLock<f32>,
    attached: AtomicBool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys: RwLock::new(HashSet::new()),
            touch_anchor: RwLock::new(None),
            drag_delta: RwLock::new(0.0),
            attached: AtomicBool::new(true),
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        if self.is_attached() {
            self.keys.write().insert(key);
        }
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn touch_start(&self, x: f32) {
        if self.is_attached() {
            *self.touch_anchor.write() = Some(x);
        }
    }

    /// Accumulates the horizontal distance travelled since the last touch event.
    pub fn touch_move(&self, x: f32) {
        if !self.is_attached() {
            return;
        }
        let mut anchor = self.touch_anchor.write();
        let Some(previous) = *anchor else {
            return;
        };
        *anchor = Some(x);
        *self.drag_delta.write() += x - previous;
    }

    pub fn touch_end(&self) {
        *self.touch_anchor.write() = None;
    }

    /// Returns and clears the drag distance gathered since the previous call.
    pub fn take_drag_delta(&self) -> f32 {
        std::mem::take(&mut *self.drag_delta.write())
    }

    /// -1 when steering left, 1 when steering right, 0 when both or neither.
    pub fn horizontal_axis(&self) -> f32 {
        let keys = self.keys.read();
        let left = keys.iter().any(|key| key.steers_left());
        let right = keys.iter().any(|key| key.steers_right());
        match (left, right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Stops accepting input and forgets everything held so far.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
        self.keys.write().clear();
        *self.touch_anchor.write() = None;
        *self.drag_delta.write() = 0.0;
    }
}
