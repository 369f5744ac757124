pub mod cli;
pub mod console;
pub mod db;

pub use console::{ConsoleError, QueryConsole, QueryHistory};
pub use db::{DbError, DbHandle, OpenMode, StoreKind};
