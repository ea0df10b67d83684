//! IDE features: high-level views over grammar contexts for editor hosts.
//!
//! Each function takes the contexts it needs and returns plain data; the
//! workspace resolves contexts and dependency closures before calling in.
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: Take data in, return data out
//! 2. **No LSP types**: Uses our own types, converted at the host boundary

mod completion;
mod debugger;
mod rrd;
mod symbols;

pub use completion::{CompletionItem, CompletionKind, completions};
pub use debugger::{Breakpoint, GrammarDebugger};
pub use rrd::rrd_script;
pub use symbols::{document_symbols, workspace_symbols};
