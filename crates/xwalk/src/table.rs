//! In-memory string table used for attribute and supplementary inputs.
//!
//! Cells are `Option<String>`; empty strings from loaders are stored as `None`.

use std::collections::HashMap;

use crate::error::XwalkError;
use crate::ids::{self, Record};

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub name: String,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Self {
            name: name.into(),
            headers,
            index,
            rows: Vec::new(),
        }
    }

    /// Build a table from string rows; empty cells become `None`.
    pub fn from_rows<I, R, S>(name: impl Into<String>, headers: &[&str], rows: I) -> Result<Self, XwalkError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            let cells = row
                .into_iter()
                .map(|s| {
                    let s = s.as_ref();
                    (!s.is_empty()).then(|| s.to_string())
                })
                .collect();
            table.push_row(cells)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, cells: Vec<Option<String>>) -> Result<(), XwalkError> {
        if cells.len() != self.headers.len() {
            return Err(XwalkError::RaggedRow {
                table: self.name.clone(),
                row: self.rows.len() + 1,
                expected: self.headers.len(),
                found: cells.len(),
            });
        }
        self.rows.push(cells);
        Ok(())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn column_index(&self, column: &str) -> Result<usize, XwalkError> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| XwalkError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Fail on the first of `columns` the table does not have.
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), XwalkError> {
        columns
            .iter()
            .try_for_each(|column| self.column_index(column).map(|_| ()))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    pub fn row(&self, row: usize) -> RowRef<'_> {
        RowRef { table: self, row }
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.rows.len()).map(move |row| RowRef { table: self, row })
    }

    /// Add (or replace) a column, one value per row.
    pub fn set_column(&mut self, column: &str, values: Vec<Option<String>>) -> Result<(), XwalkError> {
        if values.len() != self.rows.len() {
            return Err(XwalkError::RaggedRow {
                table: self.name.clone(),
                row: 0,
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.index.get(column).copied() {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.index.insert(column.to_string(), self.headers.len());
                self.headers.push(column.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a Table,
    row: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.row
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = self.table.index.get(column)?;
        self.table.get(self.row, *col)
    }
}

impl Record for RowRef<'_> {
    fn value(&self, column: &str) -> Option<&str> {
        ids::present(self.get(column))
    }
}
