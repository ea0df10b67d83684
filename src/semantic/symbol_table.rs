/// Registry of the named elements of one grammar file
mod lookup;
mod symbol;
mod table;

pub use symbol::{Definition, Occurrence, Symbol, SymbolId, SymbolInfo, SymbolKind};
pub use table::{BUILTIN_SOURCE, SymbolTable};
