// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io};

use colored::{Color, Colorize};
use unicode_width::UnicodeWidthStr;

/// Rows of `T` rendered as aligned, optionally colored columns.
pub struct Table<'a, T, C: Column<T>> {
    pub columns: &'a [C],
    pub separator: &'a str,
    pub data: &'a [T],
}

impl<T, C: Column<T>> Table<'_, T, C> {
    pub fn write_to(&self, w: &mut impl io::Write) -> Result<(), Box<dyn Error>> {
        let table: Vec<Vec<String>> = self
            .data
            .iter()
            .map(|row| self.columns.iter().map(|col| col.format(row)).collect())
            .collect();

        let widths = column_widths(&table, self.columns.len());
        for (cells, row) in table.into_iter().zip(self.data) {
            let last = cells.len().saturating_sub(1);
            for (j, (col, cell)) in self.columns.iter().zip(cells).enumerate() {
                // Width counts display columns, so pad by hand
                let fill = widths[j].saturating_sub(cell.width());
                let cell = match col.padding_direction() {
                    PaddingDirection::Left if j == last => cell,
                    PaddingDirection::Left => format!("{cell}{}", " ".repeat(fill)),
                    PaddingDirection::Right => format!("{}{cell}", " ".repeat(fill)),
                };
                let cell = match col.color(row) {
                    Some(color) => cell.color(color).to_string(),
                    None => cell,
                };

                write!(w, "{cell}")?;
                if j < last {
                    write!(w, "{}", self.separator)?;
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

pub trait Column<T> {
    fn format(&self, data: &T) -> String;

    fn padding_direction(&self) -> PaddingDirection {
        PaddingDirection::Left
    }

    fn color(&self, _data: &T) -> Option<Color> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingDirection {
    Left,
    Right,
}

fn column_widths(table: &[Vec<String>], columns: usize) -> Vec<usize> {
    let mut widths = vec![0; columns];
    for row in table {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }
    widths
}
