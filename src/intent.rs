//! Control input and per-tick input buffering.
//!
//! Games describe what keys are held through [`ControlKeys`] (or any other
//! [`InputSource`]). Once per fixed tick the controller turns that held state
//! into an [`InputFrame`] using an [`InputBuffer`], which performs edge
//! detection so a press is seen on exactly one tick.

use bevy::prelude::*;

/// Logical controls the platformer understands.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Dash,
    Glide,
    Grapple,
}

impl ControlKey {
    /// Keys whose presses are tracked as edges.
    pub const PRESSABLE: [ControlKey; 6] = [
        ControlKey::Left,
        ControlKey::Right,
        ControlKey::Up,
        ControlKey::Down,
        ControlKey::Jump,
        ControlKey::Dash,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Pause-aware source of held control state.
///
/// Implement this for whatever the game polls: keyboard, gamepad, AI or a
/// replay. The controller never reads devices itself.
pub trait InputSource {
    /// Whether `key` is currently held down.
    fn held(&self, key: ControlKey) -> bool;

    /// Whether gameplay is paused. A paused source yields a neutral frame.
    fn paused(&self) -> bool {
        false
    }

    /// Whether `key` went down since the last sample, even if it has been
    /// released again.
    fn latched(&self, _key: ControlKey) -> bool {
        false
    }

    /// Forget latched presses. Called once per sample.
    fn clear_latched(&mut self) {}
}

/// Held control state written by the game each frame.
///
/// This is just booleans - you handle device input in your code and the
/// controller handles buffering, edge detection and everything after.
///
/// # Example
///
/// ```rust
/// use msg_platformer_controller::prelude::*;
///
/// let mut keys = ControlKeys::default();
/// keys.right = true;
/// keys.jump = true;
/// assert!(keys.held(ControlKey::Jump));
/// assert!(!keys.held(ControlKey::Left));
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct ControlKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump: bool,
    pub dash: bool,
    pub glide: bool,
    pub grapple: bool,
    /// Set while the game is paused; the frame resolves to neutral input.
    pub paused: bool,
    /// Presses seen since the last sample, one bit per [`ControlKey`].
    latched: u8,
}

impl ControlKeys {
    /// Create an empty key state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the held state of a single key.
    pub fn set(&mut self, key: ControlKey, held: bool) {
        match key {
            ControlKey::Left => self.left = held,
            ControlKey::Right => self.right = held,
            ControlKey::Up => self.up = held,
            ControlKey::Down => self.down = held,
            ControlKey::Jump => self.jump = held,
            ControlKey::Dash => self.dash = held,
            ControlKey::Glide => self.glide = held,
            ControlKey::Grapple => self.grapple = held,
        }
    }

    /// Record that `key` went down. The press survives until the next
    /// sample even if the key is released first.
    pub fn latch(&mut self, key: ControlKey) {
        self.latched |= key.bit();
    }

    /// Release every key.
    pub fn clear(&mut self) {
        *self = Self {
            paused: self.paused,
            ..default()
        };
    }
}

impl InputSource for ControlKeys {
    fn held(&self, key: ControlKey) -> bool {
        match key {
            ControlKey::Left => self.left,
            ControlKey::Right => self.right,
            ControlKey::Up => self.up,
            ControlKey::Down => self.down,
            ControlKey::Jump => self.jump,
            ControlKey::Dash => self.dash,
            ControlKey::Glide => self.glide,
            ControlKey::Grapple => self.grapple,
        }
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn latched(&self, key: ControlKey) -> bool {
        self.latched & key.bit() != 0
    }

    fn clear_latched(&mut self) {
        self.latched = 0;
    }
}

/// Input as seen by one simulation tick.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct InputFrame {
    /// Held direction, each component in {-1, 0, 1}.
    pub axis: Vec2,
    /// Direction keys that went down this tick, each component in {-1, 0, 1}.
    pub axis_pressed: Vec2,
    /// Jump went down this tick.
    pub jump_pressed: bool,
    /// Dash went down this tick.
    pub dash_pressed: bool,
    pub jump_held: bool,
    pub glide_held: bool,
    pub grapple_held: bool,
    /// Last nonzero input on each axis. Starts facing right.
    pub last_input: Vec2,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self {
            axis: Vec2::ZERO,
            axis_pressed: Vec2::ZERO,
            jump_pressed: false,
            dash_pressed: false,
            jump_held: false,
            glide_held: false,
            grapple_held: false,
            last_input: Vec2::X,
        }
    }
}

impl InputFrame {
    /// Facing direction derived from the last horizontal input: +1 or -1.
    #[inline]
    pub fn facing(&self) -> f32 {
        if self.last_input.x >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }
}

/// Per-entity input memory used for edge detection.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct InputBuffer {
    previous: ControlKeys,
    last_input: Vec2,
    jump_held: bool,
    glide_held: bool,
    grapple_held: bool,
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self {
            previous: ControlKeys::default(),
            last_input: Vec2::X,
            jump_held: false,
            glide_held: false,
            grapple_held: false,
        }
    }
}

fn axis_value(negative: bool, positive: bool) -> f32 {
    let mut value = 0.0;
    if negative {
        value -= 1.0;
    }
    if positive {
        value += 1.0;
    }
    value
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last nonzero input direction on each axis.
    pub fn last_input(&self) -> Vec2 {
        self.last_input
    }

    /// Build this tick's frame from `source`.
    ///
    /// Call exactly once per simulation tick. A press counts when a key is
    /// held now but was not at the previous sample, or when the source
    /// latched it in between. Latched presses are cleared.
    ///
    /// While the source is paused the frame carries no direction and no
    /// presses, held latches keep their last unpaused value and edge memory
    /// is left untouched.
    pub fn sample(&mut self, source: &mut impl InputSource) -> InputFrame {
        let mut latched = ControlKeys::default();
        for key in ControlKey::PRESSABLE {
            latched.set(key, source.latched(key));
        }
        source.clear_latched();

        if source.paused() {
            return InputFrame {
                jump_held: self.jump_held,
                glide_held: self.glide_held,
                grapple_held: self.grapple_held,
                last_input: self.last_input,
                ..default()
            };
        }

        let mut current = ControlKeys::default();
        for key in [
            ControlKey::Left,
            ControlKey::Right,
            ControlKey::Up,
            ControlKey::Down,
            ControlKey::Jump,
            ControlKey::Dash,
            ControlKey::Glide,
            ControlKey::Grapple,
        ] {
            current.set(key, source.held(key));
        }
        let previous = self.previous;
        let went_down = |now: bool, before: bool| now && !before;

        let axis = Vec2::new(
            axis_value(current.left, current.right),
            axis_value(current.down, current.up),
        );
        let axis_pressed = Vec2::new(
            axis_value(
                went_down(current.left, previous.left) || latched.left,
                went_down(current.right, previous.right) || latched.right,
            ),
            axis_value(
                went_down(current.down, previous.down) || latched.down,
                went_down(current.up, previous.up) || latched.up,
            ),
        );

        if axis.x != 0.0 {
            self.last_input.x = axis.x;
        }
        if axis.y != 0.0 {
            self.last_input.y = axis.y;
        }

        self.jump_held = current.jump;
        self.glide_held = current.glide;
        self.grapple_held = current.grapple;
        self.previous = current;

        InputFrame {
            axis,
            axis_pressed,
            jump_pressed: went_down(current.jump, previous.jump) || latched.jump,
            dash_pressed: went_down(current.dash, previous.dash) || latched.dash,
            jump_held: current.jump,
            glide_held: current.glide,
            grapple_held: current.grapple,
            last_input: self.last_input,
        }
    }
}
