//! Turtle state and operations for plotter interpretation.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Drawing parameters read from an L-system definition.
///
/// Angles are in degrees. Turns are applied by adding the angle to the heading, so a
/// clockwise turn is expressed with a negative angle. Every field defaults to zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurtleParams {
    /// Length of every forward move.
    pub step_length: f64,
    /// Heading of the turtle before the first symbol.
    pub initial_angle: f64,
    /// Heading change applied by `-`.
    pub left_angle: f64,
    /// Heading change applied by `+`.
    pub right_angle: f64,
}

/// The state of the plotter turtle.
///
/// Position is in screen space: `y` grows downwards, so a heading of 90 degrees points up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurtleState {
    /// Current position of the pen.
    pub position: DVec2,
    /// Current heading in degrees, always within `[0, 360)`.
    pub heading: f64,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            heading: 0.0,
        }
    }
}

impl TurtleState {
    pub fn new(position: DVec2, heading: f64) -> Self {
        Self {
            position,
            heading: normalize_heading(heading),
        }
    }

    /// Unit vector along the current heading, with the screen-space y inversion applied.
    pub fn direction(&self) -> DVec2 {
        let (sin, cos) = self.heading.to_radians().sin_cos();
        DVec2::new(cos, -sin)
    }

    /// Moves `length` along the current heading and returns the new position.
    pub fn forward(&mut self, length: f64) -> DVec2 {
        self.position += self.direction() * length;
        self.position
    }

    /// Adds `degrees` to the heading, keeping it within `[0, 360)`.
    pub fn turn(&mut self, degrees: f64) {
        self.heading = normalize_heading(self.heading + degrees);
    }
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Operations that can be performed by the plotter turtle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurtleOp {
    /// Draw a segment of `step_length` along the heading (`F`, `G`).
    Forward,
    /// Turn by `left_angle` (`-`).
    TurnLeft,
    /// Turn by `right_angle` (`+`).
    TurnRight,
    /// Save position and heading onto the stack (`[`).
    Push,
    /// Restore the most recently pushed position and heading (`]`).
    Pop,
    /// No-op: symbol has no registered meaning.
    #[default]
    Ignore,
}
