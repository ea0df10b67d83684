//! # Augmented Transition Networks
//!
//! The automata behind grammar rules: the [`Atn`] model, construction from a
//! parsed grammar, the serialized `.interp` form and graph extraction for
//! visualization.
//!
//! ```text
//! GrammarFile ──builder──→ InterpreterData ──serialize──→ .interp
//!                               ↑      │
//!              .interp ──parse──┘      └──graph──→ AtnGraphData
//! ```

pub mod builder;
pub mod graph;
pub mod interval_set;
pub mod model;
mod serialize;

pub use builder::{BuiltGrammar, DEFAULT_CHANNELS, DEFAULT_MODE, build_interpreter_data};
pub use graph::{AtnGraphData, AtnLink, AtnNode, extract_graph};
pub use interval_set::{Interval, IntervalSet};
pub use model::{
    Atn, AtnState, AtnStateType, AtnType, InterpreterData, LexerAction, MAX_CHAR, MIN_CHAR,
    MIN_USER_TOKEN_TYPE, TOKEN_EOF, Transition, TransitionType, Vocabulary,
};
pub use serialize::SERIALIZED_VERSION;
