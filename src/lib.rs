//! # lsystem-plotter
//!
//! Rewrites 0L-system grammars into successive generations and interprets them as
//! turtle drawing commands for a plotter.
//!
//! A [`Grammar`] is built once and shared read-only. The [`ProductionEngine`] turns
//! generation *k* into generation *k+1*, optionally splitting the work across a pool
//! of workers, and the [`TurtleInterpreter`] walks any generation to produce an ordered
//! [`DrawCommand`] stream that a rendering backend can consume.

pub mod command;
pub mod config;
pub mod generation;
pub mod grammar;
pub mod interpreter;
pub mod parser;
pub mod production;
pub mod turtle;

pub use command::*;
pub use config::*;
pub use generation::*;
pub use grammar::*;
pub use interpreter::*;
pub use parser::*;
pub use production::*;
pub use turtle::*;
