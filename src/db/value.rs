/// A raw cell value as drained from a query reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
    /// A relationship encoded as an (instance id, relationship class id) pair.
    Navigation {
        id: Option<String>,
        rel_class_id: Option<String>,
    },
    Array(Vec<Value>),
    /// Structured values the backend hands back as-is, e.g. abbreviated blobs.
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a parsed JSON document into a cell value, keeping scalars scalar.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            other => Value::Json(other),
        }
    }
}

/// Column metadata reported alongside a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    /// Backend type name, e.g. `long`, `double`, `string`, `navigation`.
    pub type_name: String,
    /// Optional refinement of the type, e.g. `Json`.
    pub extended_type: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            extended_type: None,
        }
    }

    pub fn with_extended_type(mut self, extended_type: impl Into<String>) -> Self {
        self.extended_type = Some(extended_type.into());
        self
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.type_name.as_str(), "int" | "long" | "double")
    }

    pub fn is_navigation(&self) -> bool {
        self.type_name.eq_ignore_ascii_case("navigation")
    }

    /// Whether string cells in this column may hold JSON documents.
    pub fn may_hold_json(&self) -> bool {
        self.type_name.eq_ignore_ascii_case("string")
            || self
                .extended_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("json"))
    }

    /// The label shown under the column name in the table header.
    pub fn display_type(&self) -> &str {
        self.extended_type.as_deref().unwrap_or(&self.type_name)
    }
}

/// Rows drained from one execution plus their column metadata.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn add_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
