//! Spreadsheet cell addresses (`A2`, `D7`, `AA2`).
//!
//! Data rows are zero-based and start on spreadsheet row 2, because row 1 is
//! the header. Problems with the sheet as a whole are reported against the
//! bare column `A`.

use std::fmt;

/// Where a validation message is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellAddress {
    /// The header row itself, rendered as `A`.
    Header,
    /// A data cell: zero-based column and zero-based data row.
    Cell { column: usize, row: usize },
}

impl CellAddress {
    pub fn cell(column: usize, row: usize) -> Self {
        CellAddress::Cell { column, row }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellAddress::Header => f.write_str(&column_letters(0)),
            CellAddress::Cell { column, row } => {
                write!(f, "{}{}", column_letters(*column), row + 2)
            }
        }
    }
}

/// Spreadsheet address of a data cell.
pub fn address(column: usize, row: usize) -> String {
    CellAddress::cell(column, row).to_string()
}

/// Bijective base-26 column name: 0 → `A`, 25 → `Z`, 26 → `AA`, 702 → `AAA`.
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index;
    loop {
        letters.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.reverse();
    letters.into_iter().map(char::from).collect()
}
