//! Interpreter that converts a generation into an ordered [`DrawCommand`] stream.
//!
//! The entry point is [`TurtleInterpreter`]. Configure it with [`TurtleParams`],
//! optionally remap symbols via [`TurtleInterpreter::set_op`], then call
//! [`TurtleInterpreter::interpret`] with a [`Generation`].

use crate::command::DrawCommand;
use crate::generation::Generation;
use crate::turtle::{TurtleOp, TurtleParams, TurtleState};
use glam::DVec2;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("Unbalanced ']' at symbol {position}: state stack is empty")]
    UnbalancedBracket { position: usize },
}

/// Interprets generations as plotter drawing commands.
///
/// Interpretation is a pure function of the generation, the parameters and the symbol
/// map: nothing is cached between calls, so the same inputs always yield the same
/// command sequence.
#[derive(Clone, Debug)]
pub struct TurtleInterpreter {
    op_map: [TurtleOp; 256],
    params: TurtleParams,
    origin: DVec2,
}

impl TurtleInterpreter {
    /// Creates an interpreter with the standard symbol map and the turtle at the origin.
    pub fn new(params: TurtleParams) -> Self {
        let mut interpreter = Self {
            op_map: [TurtleOp::Ignore; 256],
            params,
            origin: DVec2::ZERO,
        };
        interpreter.populate_standard_symbols();
        interpreter
    }

    /// Starts every pass at `origin` instead of `(0, 0)` (builder pattern).
    pub fn with_origin(mut self, origin: DVec2) -> Self {
        self.origin = origin;
        self
    }

    /// Assigns a single [`TurtleOp`] to a symbol.
    pub fn set_op(&mut self, symbol: u8, op: TurtleOp) {
        self.op_map[symbol as usize] = op;
    }

    pub fn op(&self, symbol: u8) -> TurtleOp {
        self.op_map[symbol as usize]
    }

    pub fn params(&self) -> &TurtleParams {
        &self.params
    }

    /// Registers the conventional mappings: `F`/`G` draw, `-`/`+` turn, `[`/`]` branch.
    pub fn populate_standard_symbols(&mut self) {
        let mappings = [
            (b'F', TurtleOp::Forward),
            (b'G', TurtleOp::Forward),
            (b'-', TurtleOp::TurnLeft),
            (b'+', TurtleOp::TurnRight),
            (b'[', TurtleOp::Push),
            (b']', TurtleOp::Pop),
        ];

        for (symbol, op) in mappings {
            self.set_op(symbol, op);
        }
    }

    /// Walks `generation` left to right and returns the resulting commands.
    ///
    /// The turtle starts at the configured origin with `initial_angle` as its heading.
    /// `[` saves position and heading onto a stack and `]` restores them; a `]` with
    /// nothing to restore fails with [`InterpretError::UnbalancedBracket`] carrying the
    /// index of that symbol. A `[` left open at the end is not an error. Symbols with no
    /// registered mapping are skipped.
    pub fn interpret(&self, generation: &Generation) -> Result<Vec<DrawCommand>, InterpretError> {
        let mut turtle = TurtleState::new(self.origin, self.params.initial_angle);
        let mut stack: Vec<TurtleState> = Vec::new();
        let mut commands = Vec::new();

        for (position, &symbol) in generation.as_bytes().iter().enumerate() {
            match self.op_map[symbol as usize] {
                TurtleOp::Forward => {
                    let from = turtle.position;
                    let to = turtle.forward(self.params.step_length);
                    commands.push(DrawCommand::MoveForward {
                        length: self.params.step_length,
                        from,
                        to,
                        heading: turtle.heading,
                    });
                }
                TurtleOp::TurnLeft => {
                    turtle.turn(self.params.left_angle);
                    commands.push(DrawCommand::TurnLeft {
                        heading: turtle.heading,
                    });
                }
                TurtleOp::TurnRight => {
                    turtle.turn(self.params.right_angle);
                    commands.push(DrawCommand::TurnRight {
                        heading: turtle.heading,
                    });
                }
                TurtleOp::Push => {
                    stack.push(turtle);
                    commands.push(DrawCommand::Push);
                }
                TurtleOp::Pop => {
                    turtle = stack
                        .pop()
                        .ok_or(InterpretError::UnbalancedBracket { position })?;
                    commands.push(DrawCommand::Pop {
                        position: turtle.position,
                        heading: turtle.heading,
                    });
                }
                TurtleOp::Ignore => {}
            }
        }

        if !stack.is_empty() {
            log::debug!("{} branch(es) left open at end of generation", stack.len());
        }

        Ok(commands)
    }
}
