//! Column width planning for rendered result tables.
//!
//! Widths are measured in characters over the already formatted grid. When the
//! natural widths do not fit the terminal, the widest column is halved
//! repeatedly until they do (or every column sits at the floor).

use unicode_width::UnicodeWidthStr;

/// Terminals narrower than this are treated as this wide.
pub const MIN_TABLE_WIDTH: usize = 80;
/// No column is ever narrower than this.
pub const MIN_COLUMN_WIDTH: usize = 8;
/// Border and padding characters each column adds (`" x |"`).
pub const COLUMN_PADDING: usize = 3;
/// The `|` opening every rendered line.
pub const LEADING_BORDER: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnWidthPlan {
    widths: Vec<usize>,
}

impl ColumnWidthPlan {
    pub fn new(widths: Vec<usize>) -> Self {
        Self { widths }
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn width(&self, column: usize) -> Option<usize> {
        self.widths.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Characters one rendered line of the plan occupies, borders included.
    pub fn total_width(&self) -> usize {
        total_width(&self.widths)
    }

    pub fn fits(&self, available: usize) -> bool {
        self.total_width() <= available
    }
}

fn total_width(widths: &[usize]) -> usize {
    LEADING_BORDER + widths.iter().sum::<usize>() + widths.len() * COLUMN_PADDING
}

/// Width of a cell as displayed: its longest line, in terminal columns.
pub fn cell_width(cell: &str) -> usize {
    cell.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}

/// Plans column widths for `grid` given the terminal width.
///
/// `available` of zero (unknown terminal) is handled by the 80-column floor.
pub fn compute_widths(grid: &[Vec<String>], available: usize) -> ColumnWidthPlan {
    let Some(first) = grid.first() else {
        return ColumnWidthPlan::default();
    };
    let available = available.max(MIN_TABLE_WIDTH);
    let columns = first.len();

    let floor = vec![MIN_COLUMN_WIDTH; columns];
    if total_width(&floor) > available {
        return ColumnWidthPlan::new(floor);
    }

    let mut widths = floor;
    for row in grid {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell_width(cell));
        }
    }

    ColumnWidthPlan::new(shrink_to_fit(widths, available))
}

/// Halves the widest column until the widths fit `available`.
///
/// Stops early once every column is at the floor; such a plan cannot fit and
/// the renderer wraps instead. Running this on an already fitting plan returns
/// it unchanged.
pub fn shrink_to_fit(mut widths: Vec<usize>, available: usize) -> Vec<usize> {
    while total_width(&widths) > available {
        let mut widest = 0;
        for i in 1..widths.len() {
            if widths[i] > widths[widest] {
                widest = i;
            }
        }
        if widths.get(widest).map_or(true, |&w| w <= MIN_COLUMN_WIDTH) {
            break;
        }
        widths[widest] = (widths[widest] / 2).max(MIN_COLUMN_WIDTH);
    }
    widths
}
