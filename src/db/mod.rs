mod error;
mod handle;
mod reader;
mod value;

pub use error::{DbError, Result};
pub use handle::{Capabilities, DbHandle, OpenMode, SchemaInfo, Store, StoreKind};
pub use reader::{QueryOptions, QueryReader};
pub use value::{ColumnMeta, ResultSet, Value};

pub use rusqlite::types::Value as SqlValue;
