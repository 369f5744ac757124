//! The interactive query console and everything it needs to print results.

pub mod error;
pub mod format;
pub mod highlight;
pub mod history;
pub mod input;
pub mod layout;
pub mod render;
pub mod repl;
pub mod resolver;

pub use error::{ConsoleError, Result};
pub use format::{DetectedKind, FormattedValue, ValueFormatter};
pub use history::{
    history_key, history_path, HistoryError, HistoryStore, JsonHistoryStore, MemoryHistoryStore,
    QueryHistory, MAX_HISTORY_ENTRIES,
};
pub use input::{EditorInput, LineSource, ReadOutcome, ScriptedInput};
pub use layout::{compute_widths, ColumnWidthPlan};
pub use render::ResultTable;
pub use repl::{ConsoleState, QueryConsole, StatementInput, Step};
pub use resolver::{ClassNameLookup, ReferenceResolver, UNKNOWN_CLASS};
