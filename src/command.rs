use glam::DVec2;
use serde::{Deserialize, Serialize};

/// One step of a drawing, as handed to a rendering backend.
///
/// Only [`DrawCommand::MoveForward`] puts ink on the page. The other variants record how
/// the turtle state changed so a consumer can replay the walk without re-reading the
/// generation. Mapping to pixels, panning and scaling are the renderer's business.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// A straight segment from `from` to `to` along `heading`.
    MoveForward {
        length: f64,
        from: DVec2,
        to: DVec2,
        heading: f64,
    },
    /// Heading after a `-` turn.
    TurnLeft { heading: f64 },
    /// Heading after a `+` turn.
    TurnRight { heading: f64 },
    /// Turtle state saved.
    Push,
    /// Turtle state restored to `position` and `heading`.
    Pop { position: DVec2, heading: f64 },
}

impl DrawCommand {
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::MoveForward { .. })
    }

    pub fn segment(&self) -> Option<Segment> {
        match *self {
            Self::MoveForward { from, to, .. } => Some(Segment { from, to }),
            _ => None,
        }
    }
}

/// A drawn line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: DVec2,
    pub to: DVec2,
}

/// The drawn segments of a command stream, in order.
pub fn segments(commands: &[DrawCommand]) -> impl Iterator<Item = Segment> + '_ {
    commands.iter().filter_map(DrawCommand::segment)
}

/// Axis-aligned box enclosing every drawn segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    /// Returns `None` when nothing is drawn.
    pub fn of(commands: &[DrawCommand]) -> Option<Self> {
        segments(commands).fold(None, |acc, seg| {
            let lo = seg.from.min(seg.to);
            let hi = seg.from.max(seg.to);
            Some(match acc {
                None => Bounds { min: lo, max: hi },
                Some(b) => Bounds {
                    min: b.min.min(lo),
                    max: b.max.max(hi),
                },
            })
        })
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }
}
