use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Statement};
use serde_json::json;

use super::error::{DbError, Result};
use super::value::{ColumnMeta, ResultSet, Value};

/// Per-execution knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Stop draining after this many rows.
    pub limit: Option<usize>,
    /// Replace blob cells with `{"bytes": N}`.
    pub abbreviate_blobs: bool,
}

impl QueryOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_abbreviated_blobs(mut self) -> Self {
        self.abbreviate_blobs = true;
        self
    }
}

/// How a column is declared in the file, reduced to what display cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredType {
    Long,
    Double,
    Boolean,
    Binary,
    String,
    DateTime,
    Json,
    Navigation,
    Array,
    /// Expression columns carry no declaration; typed from their values.
    Undeclared,
}

impl DeclaredType {
    fn parse(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return DeclaredType::Undeclared;
        };
        match decl.trim().to_uppercase().as_str() {
            t if t.ends_with("[]") || t.contains("ARRAY") => DeclaredType::Array,
            t if t.contains("NAVIGATION") => DeclaredType::Navigation,
            t if t.contains("JSON") => DeclaredType::Json,
            t if t.contains("BOOL") => DeclaredType::Boolean,
            t if t.contains("INT") => DeclaredType::Long,
            t if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") => {
                DeclaredType::Double
            }
            t if t.contains("BLOB") => DeclaredType::Binary,
            t if t.contains("DATE") || t.contains("TIME") => DeclaredType::DateTime,
            _ => DeclaredType::String,
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Integer(_) => DeclaredType::Long,
            Value::Float(_) => DeclaredType::Double,
            Value::Boolean(_) => DeclaredType::Boolean,
            Value::Blob(_) | Value::Json(_) => DeclaredType::Binary,
            _ => DeclaredType::String,
        }
    }

    fn to_meta(self, name: String) -> ColumnMeta {
        match self {
            DeclaredType::Long => ColumnMeta::new(name, "long"),
            DeclaredType::Double => ColumnMeta::new(name, "double"),
            DeclaredType::Boolean => ColumnMeta::new(name, "boolean"),
            DeclaredType::Binary => ColumnMeta::new(name, "binary"),
            DeclaredType::DateTime => ColumnMeta::new(name, "dateTime"),
            DeclaredType::Json => ColumnMeta::new(name, "string").with_extended_type("Json"),
            DeclaredType::Navigation => ColumnMeta::new(name, "navigation"),
            DeclaredType::Array => ColumnMeta::new(name, "array"),
            DeclaredType::String | DeclaredType::Undeclared => ColumnMeta::new(name, "string"),
        }
    }
}

/// A prepared statement waiting to be drained.
pub struct QueryReader<'db> {
    query: String,
    stmt: Statement<'db>,
    params: Vec<SqlValue>,
    options: QueryOptions,
    columns: Vec<(String, DeclaredType)>,
}

impl<'db> QueryReader<'db> {
    pub(super) fn prepare(
        conn: &'db Connection,
        query: &str,
        params: &[SqlValue],
        options: QueryOptions,
    ) -> Result<Self> {
        let stmt = conn.prepare(query).map_err(|e| DbError::query(query, e))?;
        let columns = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), DeclaredType::parse(c.decl_type())))
            .collect();

        Ok(Self {
            query: query.to_string(),
            stmt,
            params: params.to_vec(),
            options,
            columns,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Steps the statement until it is exhausted or the row limit is reached.
    pub fn into_result_set(mut self) -> Result<ResultSet> {
        let query = &self.query;
        let columns = &self.columns;
        let options = self.options;

        let mut rows_out: Vec<Vec<Value>> = Vec::new();
        let mut rows = self
            .stmt
            .query(params_from_iter(self.params.iter()))
            .map_err(|e| DbError::query(query, e))?;

        while let Some(row) = rows.next().map_err(|e| DbError::query(query, e))? {
            if options.limit.is_some_and(|limit| rows_out.len() >= limit) {
                break;
            }
            let mut values = Vec::with_capacity(columns.len());
            for (i, (_, declared)) in columns.iter().enumerate() {
                let cell = row.get_ref(i).map_err(|e| DbError::query(query, e))?;
                values.push(convert_cell(cell, *declared, options.abbreviate_blobs));
            }
            rows_out.push(values);
        }

        let metadata = columns
            .iter()
            .enumerate()
            .map(|(i, (name, declared))| {
                let declared = match declared {
                    DeclaredType::Undeclared => rows_out
                        .iter()
                        .map(|r| &r[i])
                        .find(|v| !v.is_null())
                        .map(DeclaredType::from_value)
                        .unwrap_or(DeclaredType::String),
                    other => *other,
                };
                declared.to_meta(name.clone())
            })
            .collect();

        Ok(ResultSet::with_rows(metadata, rows_out))
    }
}

fn convert_cell(cell: ValueRef<'_>, declared: DeclaredType, abbreviate_blobs: bool) -> Value {
    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if declared == DeclaredType::Boolean => Value::Boolean(i != 0),
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            match declared {
                DeclaredType::Navigation => parse_navigation(&text).unwrap_or(Value::Text(text)),
                DeclaredType::Array => parse_array(&text).unwrap_or(Value::Text(text)),
                _ => Value::Text(text),
            }
        }
        ValueRef::Blob(bytes) if abbreviate_blobs => Value::Json(json!({ "bytes": bytes.len() })),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Reads `{"Id": "0x..", "RelECClassId": "0x.."}`; either member may be missing.
fn parse_navigation(text: &str) -> Option<Value> {
    let json: serde_json::Value = serde_json::from_str(text).ok()?;
    let obj = json.as_object()?;
    let id_member = |key: &str| match obj.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => n.as_u64().map(|n| format!("0x{:x}", n)),
        _ => None,
    };
    Some(Value::Navigation {
        id: id_member("Id"),
        rel_class_id: id_member("RelECClassId"),
    })
}

fn parse_array(text: &str) -> Option<Value> {
    match serde_json::from_str(text).ok()? {
        json @ serde_json::Value::Array(_) => Some(Value::from_json(json)),
        _ => None,
    }
}
