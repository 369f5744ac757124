//! The ECSql read-eval-print loop.
//!
//! Lines are accumulated until one ends with `;`, then the statement is run
//! against the open [`DbHandle`] and the result printed as a table. Ctrl+C
//! while typing discards the pending statement and hands control back to the
//! caller. Failed statements are reported and the loop carries on.
//!
//! ```text
//! AwaitingInput -> Accumulating -> Executing -> Rendering -> AwaitingInput
//!        \              |
//!         +-------------+--> Cancelled
//! ```

use std::io::Write;
use std::time::{Duration, Instant};

use crossterm::style::Stylize;
use tracing::{debug, warn};

use crate::db::{ColumnMeta, DbHandle, QueryOptions, ResultSet};

use super::error::Result;
use super::format::{FormattedValue, ValueFormatter};
use super::history::{HistoryStore, MemoryHistoryStore, QueryHistory};
use super::input::{LineSource, ReadOutcome};
use super::render::ResultTable;
use super::resolver::ReferenceResolver;

pub const PRIMARY_PROMPT: &str = "ECSql> ";
pub const CONTINUATION_PROMPT: &str = "   ... ";
/// Rows shown per statement.
pub const DISPLAY_ROWS: usize = 100;
/// Rows fetched per statement; one extra to detect truncation.
pub const FETCH_ROWS: usize = DISPLAY_ROWS + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    AwaitingInput,
    Accumulating,
    Executing,
    Rendering,
    Cancelled,
}

/// Result of reading one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementInput {
    Complete(String),
    Cancelled,
    Eof,
}

/// Result of one turn of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Cancelled,
    Ended,
}

pub struct QueryConsole<'db> {
    db: &'db DbHandle,
    label: String,
    history: QueryHistory,
    history_key: String,
    store: Box<dyn HistoryStore>,
    resolver: ReferenceResolver,
    state: ConsoleState,
    buffer: String,
    color: bool,
    terminal_width: fn() -> Option<u16>,
}

fn terminal_columns() -> Option<u16> {
    crossterm::terminal::size().ok().map(|(columns, _)| columns)
}

impl<'db> QueryConsole<'db> {
    pub fn new(db: &'db DbHandle, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            db,
            history_key: label.clone(),
            label,
            history: QueryHistory::new(),
            store: Box::new(MemoryHistoryStore::new()),
            resolver: ReferenceResolver::new(),
            state: ConsoleState::AwaitingInput,
            buffer: String::new(),
            color: true,
            terminal_width: terminal_columns,
        }
    }

    /// Persists history through `store` under `key`, starting from what it already holds.
    pub fn with_history_store(mut self, store: Box<dyn HistoryStore>, key: impl Into<String>) -> Self {
        self.history_key = key.into();
        self.history = match store.load(&self.history_key) {
            Ok(entries) => QueryHistory::from_entries(entries),
            Err(e) => {
                warn!(error = %e, "could not load query history");
                QueryHistory::new()
            }
        };
        self.store = store;
        self
    }

    pub fn with_history(mut self, history: QueryHistory) -> Self {
        self.history = history;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_terminal_width(mut self, terminal_width: fn() -> Option<u16>) -> Self {
        self.terminal_width = terminal_width;
        self
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Runs statements until the user interrupts or input ends.
    pub fn run<W: Write>(&mut self, input: &mut impl LineSource, out: &mut W) -> Result<()> {
        let read_only = if self.db.is_read_only() { " (read-only)" } else { "" };
        writeln!(out, "{}{}", self.label, read_only)?;
        writeln!(
            out,
            "ECSql editor. (press up/down for history, Ctrl+C to exit, use semicolon to end statement)"
        )?;
        writeln!(out)?;

        while self.step(input, out)? == Step::Continue {}
        Ok(())
    }

    /// Reads and runs one statement.
    pub fn step<W: Write>(&mut self, input: &mut impl LineSource, out: &mut W) -> Result<Step> {
        match self.read_statement(input)? {
            StatementInput::Complete(sql) => {
                self.run_statement(&sql, out)?;
                Ok(Step::Continue)
            }
            StatementInput::Cancelled => {
                writeln!(out)?;
                Ok(Step::Cancelled)
            }
            StatementInput::Eof => Ok(Step::Ended),
        }
    }

    /// Accumulates lines until one ends with `;`.
    pub fn read_statement(&mut self, input: &mut impl LineSource) -> Result<StatementInput> {
        self.buffer.clear();
        self.state = ConsoleState::AwaitingInput;

        loop {
            let prompt = if self.buffer.is_empty() {
                PRIMARY_PROMPT
            } else {
                CONTINUATION_PROMPT
            };

            match input.read_line(prompt, self.history.entries())? {
                ReadOutcome::Line(line) => {
                    if self.buffer.is_empty() {
                        if line.trim().is_empty() {
                            continue;
                        }
                        self.buffer = line.clone();
                        self.state = ConsoleState::Accumulating;
                    } else {
                        self.buffer.push('\n');
                        self.buffer.push_str(&line);
                    }

                    if line.trim_end().ends_with(';') {
                        return Ok(StatementInput::Complete(std::mem::take(&mut self.buffer)));
                    }
                }
                ReadOutcome::Interrupted => {
                    debug!(discarded = %self.buffer, "statement cancelled");
                    self.buffer.clear();
                    self.state = ConsoleState::Cancelled;
                    return Ok(StatementInput::Cancelled);
                }
                ReadOutcome::Eof => {
                    self.buffer.clear();
                    self.state = ConsoleState::AwaitingInput;
                    return Ok(StatementInput::Eof);
                }
            }
        }
    }

    /// Executes `sql` and prints the outcome.
    ///
    /// Rejected statements are reported to `out` and leave history untouched.
    /// Only failures that make the handle unusable are returned as errors.
    pub fn run_statement<W: Write>(&mut self, sql: &str, out: &mut W) -> Result<()> {
        self.state = ConsoleState::Executing;
        let options = QueryOptions::default()
            .with_limit(FETCH_ROWS)
            .with_abbreviated_blobs();
        let started = Instant::now();

        let result = self
            .db
            .execute(sql, &[], options)
            .and_then(|reader| reader.into_result_set());
        let elapsed = started.elapsed();

        let rs = match result {
            Ok(rs) => rs,
            // Rejected by the backend: report and keep the session going
            Err(e) if e.is_recoverable() => {
                debug!(error = %e, "statement failed");
                self.report_failure(sql, &e.to_string(), out)?;
                self.state = ConsoleState::AwaitingInput;
                return Ok(());
            }
            Err(e) => {
                self.state = ConsoleState::AwaitingInput;
                return Err(e.into());
            }
        };

        // Only statements the backend accepted make it into history
        self.record_history(sql);

        self.state = ConsoleState::Rendering;
        self.render(sql, &rs, elapsed, out)?;
        self.state = ConsoleState::AwaitingInput;
        Ok(())
    }

    /// Prints the schemas stored in the file as a table.
    pub fn list_schemas<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let schemas = match self.db.schemas() {
            Ok(schemas) => schemas,
            Err(e) if e.is_recoverable() => {
                let message = format!("Error: {}", e);
                if self.color {
                    writeln!(out, "{}", message.as_str().red().bold())?;
                } else {
                    writeln!(out, "{}", message)?;
                }
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if schemas.is_empty() {
            writeln!(out, "No schemas found.")?;
            return Ok(());
        }

        let columns = vec![
            ColumnMeta::new("Name", "string"),
            ColumnMeta::new("Alias", "string"),
            ColumnMeta::new("Version", "string"),
        ];
        let rows: Vec<Vec<FormattedValue>> = schemas
            .into_iter()
            .map(|schema| {
                vec![
                    FormattedValue::plain(schema.name),
                    FormattedValue::plain(schema.alias),
                    FormattedValue::plain(schema.version),
                ]
            })
            .collect();

        let width = (self.terminal_width)().map(usize::from).unwrap_or(0);
        let table = ResultTable::new("Schemas", &columns, &rows, width);
        write!(out, "{}", table.render(self.color))?;
        Ok(())
    }

    fn record_history(&mut self, sql: &str) {
        if !self.history.push(sql) {
            return;
        }
        if let Err(e) = self.store.save(&self.history_key, self.history.entries()) {
            warn!(error = %e, "could not save query history");
        }
    }

    fn report_failure<W: Write>(&self, sql: &str, message: &str, out: &mut W) -> Result<()> {
        let headline = format!("ECSql query failed: {}", sql);
        let detail = format!("Error: {}", message);
        if self.color {
            writeln!(out, "{}", headline.as_str().yellow())?;
            writeln!(out, "{}", detail.as_str().red().bold())?;
        } else {
            writeln!(out, "{}", headline)?;
            writeln!(out, "{}", detail)?;
        }
        Ok(())
    }

    fn render<W: Write>(&mut self, sql: &str, rs: &ResultSet, elapsed: Duration, out: &mut W) -> Result<()> {
        if rs.row_count() == 0 {
            writeln!(out, "No rows returned.")?;
            return Ok(());
        }
        if rs.column_count() == 0 {
            writeln!(out, "No metadata returned.")?;
            return Ok(());
        }

        let mut formatter = ValueFormatter::new(self.db, &mut self.resolver);
        let rows: Vec<Vec<FormattedValue>> = rs
            .rows
            .iter()
            .take(DISPLAY_ROWS)
            .map(|row| {
                row.iter()
                    .zip(&rs.columns)
                    .map(|(value, column)| formatter.format(value, column))
                    .collect()
            })
            .collect();

        // Unknown terminal width falls back to the layout floor
        let width = (self.terminal_width)().map(usize::from).unwrap_or(0);
        let table = ResultTable::new(sql, &rs.columns, &rows, width);
        write!(out, "{}", table.render(self.color))?;

        if rs.row_count() > DISPLAY_ROWS {
            let notice = format!(
                "More than {} rows returned. Only the first {} rows are displayed.",
                DISPLAY_ROWS, DISPLAY_ROWS
            );
            if self.color {
                writeln!(out, "{}", notice.as_str().yellow())?;
            } else {
                writeln!(out, "{}", notice)?;
            }
        }

        writeln!(out, "{}", format_elapsed(elapsed))?;
        Ok(())
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_secs_f64() * 1000.0;
    if millis < 1000.0 {
        format!("Executed in {:.0} ms.", millis)
    } else {
        format!("Executed in {:.2} seconds.", millis / 1000.0)
    }
}
