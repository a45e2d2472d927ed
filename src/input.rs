/// Input sampler.
///
/// Device events (keys, mouse, touch) update held state as they arrive; once
/// per frame [`InputSampler::sample`] folds that state into a single
/// [`InputCommand`].  Keys stay held from key-down until key-up, so one press
/// gives continuous movement.  Terminals that never report key releases can
/// use [`KeyHold::Window`] instead: a key counts as held while its last
/// press/repeat event is recent enough, and the OS key-repeat keeps it fresh.
use std::collections::HashMap;

use tracing::trace;

use crate::compute::InputCommand;
use crate::config::InputMode;
use crate::entities::Rect;

/// Height of the on-screen button strip below the playfield, in playfield
/// units.
pub const BUTTON_STRIP_HEIGHT: f32 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    A,
    D,
    Space,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Right,
    Fire,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// Pointer and touch lifecycles share one shape: start/down, move, end/up,
/// cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw device event.  Pointer coordinates are in playfield units; the host
/// converts from screen space before handing events over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceEvent {
    KeyDown(Key),
    KeyUp(Key),
    Pointer {
        source: PointerSource,
        id: u64,
        phase: PointerPhase,
        x: f32,
        y: f32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyHold {
    /// Held until an explicit key-up.
    UntilRelease,
    /// Held while the last press/repeat arrived within this many frames.
    Window(u64),
}

/// On-screen button regions, laid out in a strip under the playfield.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ButtonLayout {
    pub left: Rect,
    pub right: Rect,
    pub fire: Rect,
}

impl ButtonLayout {
    /// Left and right arrows on the left side, fire on the right.
    pub fn below(width: f32, height: f32) -> Self {
        let unit = width / 6.0;
        let y = height;
        let h = BUTTON_STRIP_HEIGHT;
        Self {
            left: Rect::new(0.0, y, unit, h),
            right: Rect::new(unit, y, unit, h),
            fire: Rect::new(width - 2.0 * unit, y, 2.0 * unit, h),
        }
    }

    pub fn hit(&self, x: f32, y: f32) -> Option<Button> {
        let contains = |r: &Rect| x >= r.x && x < r.right() && y >= r.y && y < r.bottom();
        if contains(&self.left) {
            Some(Button::Left)
        } else if contains(&self.right) {
            Some(Button::Right)
        } else if contains(&self.fire) {
            Some(Button::Fire)
        } else {
            None
        }
    }

    pub fn regions(&self) -> [(Button, Rect); 3] {
        [
            (Button::Left, self.left),
            (Button::Right, self.right),
            (Button::Fire, self.fire),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct InputSampler {
    mode: InputMode,
    hold: KeyHold,
    layout: ButtonLayout,
    /// Held key → frame it was last seen pressed or repeated.
    keys: HashMap<Key, u64>,
    /// Pointer id → button it is currently pressing.
    buttons: HashMap<u64, Button>,
    /// Active drag gesture: pointer id and latest x.
    drag: Option<(u64, f32)>,
    frame: u64,
}

impl InputSampler {
    pub fn new(mode: InputMode, hold: KeyHold, layout: ButtonLayout) -> Self {
        Self {
            mode,
            hold,
            layout,
            keys: HashMap::new(),
            buttons: HashMap::new(),
            drag: None,
            frame: 0,
        }
    }

    pub fn layout(&self) -> &ButtonLayout {
        &self.layout
    }

    pub fn handle(&mut self, event: DeviceEvent) {
        trace!(?event, "Device event");
        match event {
            DeviceEvent::KeyDown(key) => {
                self.keys.insert(key, self.frame);
            }
            DeviceEvent::KeyUp(key) => {
                self.keys.remove(&key);
            }
            DeviceEvent::Pointer { id, phase, x, y, .. } => self.handle_pointer(id, phase, x, y),
        }
    }

    fn handle_pointer(&mut self, id: u64, phase: PointerPhase, x: f32, y: f32) {
        match phase {
            PointerPhase::Down => {
                if let Some(button) = self.layout.hit(x, y) {
                    self.buttons.insert(id, button);
                } else if self.mode == InputMode::Drag && self.drag.is_none() {
                    self.drag = Some((id, x));
                }
            }
            PointerPhase::Move => {
                if let Some((drag_id, drag_x)) = self.drag.as_mut() {
                    if *drag_id == id {
                        *drag_x = x;
                        return;
                    }
                }
                // Sliding off a button releases it; sliding onto another presses that one.
                if self.buttons.contains_key(&id) {
                    match self.layout.hit(x, y) {
                        Some(button) => {
                            self.buttons.insert(id, button);
                        }
                        None => {
                            self.buttons.remove(&id);
                        }
                    }
                }
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                self.buttons.remove(&id);
                if self.drag.is_some_and(|(drag_id, _)| drag_id == id) {
                    self.drag = None;
                }
            }
        }
    }

    fn key_held(&self, key: Key) -> bool {
        match (self.keys.get(&key), self.hold) {
            (None, _) => false,
            (Some(_), KeyHold::UntilRelease) => true,
            (Some(&last), KeyHold::Window(window)) => self.frame.saturating_sub(last) <= window,
        }
    }

    fn button_held(&self, button: Button) -> bool {
        self.buttons.values().any(|b| *b == button)
    }

    /// Fold the held state into this frame's command and advance the frame
    /// counter.
    pub fn sample(&mut self) -> InputCommand {
        let fire = self.key_held(Key::Space) || self.button_held(Button::Fire);

        let command = match self.drag {
            Some((_, x)) => InputCommand {
                move_left: false,
                move_right: false,
                fire,
                drag_x: Some(x),
            },
            None => InputCommand {
                move_left: self.key_held(Key::Left) || self.key_held(Key::A) || self.button_held(Button::Left),
                move_right: self.key_held(Key::Right) || self.key_held(Key::D) || self.button_held(Button::Right),
                fire,
                drag_x: None,
            },
        };

        if let KeyHold::Window(window) = self.hold {
            let frame = self.frame;
            self.keys.retain(|_, last| frame.saturating_sub(*last) <= window);
        }
        self.frame += 1;
        command
    }

    /// Forget every held key, button and drag.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.buttons.clear();
        self.drag = None;
    }

    pub fn is_idle(&self) -> bool {
        self.keys.is_empty() && self.buttons.is_empty() && self.drag.is_none()
    }
}
