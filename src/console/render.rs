//! ASCII table output for query results.
//!
//! ```text
//! +---------------------+
//! | SELECT * FROM t;    |
//! +----------+----------+
//! | Id       | Name     |
//! | long     | string   |
//! +----------+----------+
//! |        1 | Element  |
//! |       22 | Model    |
//! +----------+----------+
//! ```
//!
//! The query text spans the full width in the first row. Header cells show the
//! column name over its type. Numeric columns are right-aligned. Cells wider
//! than their column wrap onto further lines.

use crossterm::style::Stylize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::db::ColumnMeta;

use super::format::{DetectedKind, FormattedValue};
use super::highlight::{highlight_json_line, highlight_sql_line};
use super::layout::{compute_widths, ColumnWidthPlan, COLUMN_PADDING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Plain,
    HeaderName,
    HeaderType,
    Json,
    Sql,
}

pub struct ResultTable<'a> {
    title: &'a str,
    columns: &'a [ColumnMeta],
    rows: &'a [Vec<FormattedValue>],
    plan: ColumnWidthPlan,
}

impl<'a> ResultTable<'a> {
    pub fn new(
        title: &'a str,
        columns: &'a [ColumnMeta],
        rows: &'a [Vec<FormattedValue>],
        available_width: usize,
    ) -> Self {
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
        grid.push(
            columns
                .iter()
                .map(|c| format!("{}\n{}", c.name, c.display_type()))
                .collect(),
        );
        grid.extend(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.text.clone()).collect()),
        );
        let plan = compute_widths(&grid, available_width);

        Self {
            title,
            columns,
            rows,
            plan,
        }
    }

    pub fn render(&self, color: bool) -> String {
        let mut output = String::new();
        let span = self.span_width();

        write_span_separator(&mut output, span);
        for line in wrap(self.title, span) {
            output.push_str("| ");
            push_styled(&mut output, &line, span, Align::Left, Style::Sql, color);
            output.push_str(" |\n");
        }
        self.write_separator(&mut output);

        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        let types: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.display_type().to_string())
            .collect();
        self.write_row(&mut output, &names, |_| Style::HeaderName, |_| Align::Left, color);
        self.write_row(&mut output, &types, |_| Style::HeaderType, |_| Align::Left, color);
        self.write_separator(&mut output);

        for row in self.rows {
            let texts: Vec<String> = row.iter().map(|c| c.text.clone()).collect();
            let style_of = |i: usize| match row.get(i).and_then(|c| c.kind) {
                Some(DetectedKind::Json) => Style::Json,
                None => Style::Plain,
            };
            self.write_row(&mut output, &texts, style_of, |i| self.align_of(i), color);
        }
        self.write_separator(&mut output);

        output
    }

    /// Width available to the spanning title row.
    fn span_width(&self) -> usize {
        let widths = self.plan.widths();
        (widths.iter().sum::<usize>() + widths.len() * COLUMN_PADDING).saturating_sub(COLUMN_PADDING)
    }

    fn write_separator(&self, output: &mut String) {
        output.push('+');
        for width in self.plan.widths() {
            output.push_str(&"-".repeat(width + 2));
            output.push('+');
        }
        output.push('\n');
    }

    fn write_row<S, A>(&self, output: &mut String, cells: &[String], style_of: S, align_of: A, color: bool)
    where
        S: Fn(usize) -> Style,
        A: Fn(usize) -> Align,
    {
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| wrap(cell, self.plan.width(i).unwrap_or(1)))
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line_idx in 0..height {
            output.push('|');
            for (i, lines) in wrapped.iter().enumerate() {
                let width = self.plan.width(i).unwrap_or(1);
                let line = lines.get(line_idx).map(String::as_str).unwrap_or("");
                output.push(' ');
                push_styled(output, line, width, align_of(i), style_of(i), color);
                output.push_str(" |");
            }
            output.push('\n');
        }
    }

    fn align_of(&self, column: usize) -> Align {
        if self.columns.get(column).is_some_and(ColumnMeta::is_numeric) {
            Align::Right
        } else {
            Align::Left
        }
    }
}

fn write_span_separator(output: &mut String, span: usize) {
    output.push('+');
    output.push_str(&"-".repeat(span + 2));
    output.push_str("+\n");
}

/// Pads `line` to `width` visible characters, styling only the text itself.
fn push_styled(output: &mut String, line: &str, width: usize, align: Align, style: Style, color: bool) {
    let pad = width.saturating_sub(line.width());
    if align == Align::Right {
        output.push_str(&" ".repeat(pad));
    }
    if color && !line.is_empty() {
        let styled = match style {
            Style::Plain => line.to_string(),
            Style::HeaderName => line.bold().to_string(),
            Style::HeaderType => line.italic().to_string(),
            Style::Json => highlight_json_line(line),
            Style::Sql => highlight_sql_line(line),
        };
        output.push_str(&styled);
    } else {
        output.push_str(line);
    }
    if align == Align::Left {
        output.push_str(&" ".repeat(pad));
    }
}

/// Splits `text` into display lines no wider than `width` terminal columns.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let mut current = String::new();
        let mut used = 0;
        for c in line.trim_end_matches('\r').chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width {
                lines.push(std::mem::take(&mut current));
                used = 0;
            }
            current.push(c);
            used += w;
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> FormattedValue {
        FormattedValue {
            text: text.to_string(),
            kind: None,
        }
    }

    fn sample_columns() -> Vec<ColumnMeta> {
        vec![ColumnMeta::new("Id", "long"), ColumnMeta::new("Name", "string")]
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("", 5), vec![""]);
        assert_eq!(wrap("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(wrap("ab\ncd", 8), vec!["ab", "cd"]);
    }

    #[test]
    fn test_render_plain_table() {
        let columns = sample_columns();
        let rows = vec![vec![plain("1"), plain("Element")], vec![plain("22"), plain("Model")]];
        let table = ResultTable::new("SELECT * FROM t;", &columns, &rows, 80);
        let out = table.render(false);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], format!("+{}+", "-".repeat(21)));
        assert_eq!(lines[1], format!("| {:<19} |", "SELECT * FROM t;"));
        assert_eq!(lines[2], "+----------+----------+");
        assert_eq!(lines[3], "| Id       | Name     |");
        assert_eq!(lines[4], "| long     | string   |");
        assert_eq!(lines[5], "+----------+----------+");
        assert_eq!(lines[6], "|        1 | Element  |");
        assert_eq!(lines[7], "|       22 | Model    |");
        assert_eq!(lines[8], "+----------+----------+");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_lines_never_exceed_budget_plus_border() {
        let columns = sample_columns();
        let long = "n".repeat(500);
        let rows = vec![vec![plain("1"), plain(&long)]];
        let table = ResultTable::new("SELECT * FROM t;", &columns, &rows, 100);
        let out = table.render(false);
        for line in out.lines() {
            assert!(line.chars().count() <= 100, "{}", line);
        }
    }

    #[test]
    fn test_exactly_fitting_row_stays_within_terminal() {
        let columns = sample_columns();
        let long = "x".repeat(66);
        let rows = vec![vec![plain("1"), plain(&long)]];
        let out = ResultTable::new("SELECT * FROM t;", &columns, &rows, 80).render(false);
        let widest = out.lines().map(|l| l.chars().count()).max().unwrap();
        assert!(widest <= 80, "{}", widest);
    }

    #[test]
    fn test_wide_characters_keep_columns_aligned() {
        let columns = sample_columns();
        let rows = vec![vec![plain("1"), plain("名称")], vec![plain("2"), plain("name")]];
        let out = ResultTable::new("SELECT * FROM t;", &columns, &rows, 80).render(false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[6], "|        1 | 名称     |");
        assert_eq!(lines[7], "|        2 | name     |");
        assert_eq!(lines[6].width(), lines[7].width());
    }

    #[test]
    fn test_wrap_by_display_width() {
        assert_eq!(wrap("数据库名", 5), vec!["数据", "库名"]);
    }

    #[test]
    fn test_multiline_json_cell_spans_lines() {
        let columns = vec![ColumnMeta::new("Props", "string")];
        let rows = vec![vec![FormattedValue {
            text: "{\n  \"a\": 1\n}".to_string(),
            kind: Some(DetectedKind::Json),
        }]];
        let table = ResultTable::new("q;", &columns, &rows, 80);
        let out = table.render(false);
        assert!(out.contains("|   \"a\": 1 |"));
    }

    #[test]
    fn test_color_output_contains_escapes() {
        let columns = sample_columns();
        let rows = vec![vec![plain("1"), plain("x")]];
        let table = ResultTable::new("SELECT 1;", &columns, &rows, 80);
        assert!(table.render(true).contains('\u{1b}'));
        assert!(!table.render(false).contains('\u{1b}'));
    }
}
