//! Movement state machine and state marker components.
//!
//! [`PlayerState`] is the visible state driven by the controller each tick.
//! The marker components mirror it for queries. They are added and removed
//! by the controller systems from the latest contact classification.

use bevy::prelude::*;

/// The four visible movement states. Exactly one is current at any time.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[reflect(Component)]
pub enum PlayerState {
    #[default]
    Idle,
    Run,
    Airborne,
    Dash,
}

/// What the state machine looks at when choosing the next state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateInputs {
    pub on_ground: bool,
    pub dashing: bool,
    /// Horizontal input this tick.
    pub input_x: f32,
    /// Horizontal controller velocity after this tick's resolution.
    pub velocity_x: f32,
}

impl PlayerState {
    /// Next state from the current one. At most one transition per tick.
    pub fn next(self, inputs: &StateInputs) -> Self {
        let resting = inputs.velocity_x == 0.0;
        match self {
            Self::Idle => {
                if inputs.dashing {
                    Self::Dash
                } else if !inputs.on_ground {
                    Self::Airborne
                } else if inputs.input_x != 0.0 {
                    Self::Run
                } else {
                    Self::Idle
                }
            }
            Self::Run => {
                if inputs.dashing {
                    Self::Dash
                } else if !inputs.on_ground {
                    Self::Airborne
                } else if resting {
                    Self::Idle
                } else {
                    Self::Run
                }
            }
            Self::Airborne => {
                if inputs.dashing {
                    Self::Dash
                } else if inputs.on_ground && resting {
                    Self::Idle
                } else if inputs.on_ground {
                    Self::Run
                } else {
                    Self::Airborne
                }
            }
            Self::Dash => {
                if inputs.dashing {
                    Self::Dash
                } else if inputs.on_ground && resting {
                    Self::Idle
                } else if inputs.on_ground {
                    Self::Run
                } else {
                    Self::Airborne
                }
            }
        }
    }
}

/// Horizontal facing, taken from the last nonzero input direction.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    pub fn from_sign(sign: f32) -> Self {
        if sign < 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }
}

/// Marker component indicating the character is grounded.
///
/// Mutually exclusive with [`Airborne`].
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Present while a side probe reports a wall too steep to walk on.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Side the wall is on: -1 left, +1 right.
    pub side: i8,
    /// Normal of the wall surface.
    pub normal: Vec2,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self {
            side: 1,
            normal: Vec2::NEG_X,
        }
    }
}

impl TouchingWall {
    pub fn new(side: i8, normal: Vec2) -> Self {
        Self { side, normal }
    }

    pub fn is_left(&self) -> bool {
        self.side < 0
    }

    pub fn is_right(&self) -> bool {
        self.side > 0
    }
}
