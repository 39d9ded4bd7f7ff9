//! courgette-core: Courgette front-end library.
//!
//! Provides the shared pipeline from Courgette source text to the
//! document model: line segmentation, the phrase grammar, the
//! best-effort parser, and type/period inference for variables.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`segment()`] -- split source text into classified lines
//! - [`parse_text()`] -- parse source text into a [`Document`]
//! - [`CompileError`] -- compile-time error type
//! - Model types: [`Document`], [`Block`], [`Scenario`], [`Schedule`],
//!   [`Definition`], [`ConditionNode`], [`Outcome`], [`Variable`]
//!
//! The phrase grammar in [`phrase`] is shared by the parser and the
//! diagnostics engine, so both recognize exactly the same sentences.

/// Courgette language version, emitted in generated-code headers.
pub const COURGETTE_VERSION: &str = "0.1";

pub mod ast;
pub mod error;
pub mod infer;
pub mod parser;
pub mod phrase;
pub mod segment;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    Block, ConditionNode, Definition, Document, GroupKind, Operand, Operator, Outcome, Period,
    Scenario, Schedule, ScheduleEntry, Variable,
};
pub use error::CompileError;
pub use infer::{DefinitionPeriod, ValueType};
pub use segment::{BlockKind, LineKind, SegmentedLine, SourceMap};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use parser::{parse, parse_text};
pub use segment::segment;
