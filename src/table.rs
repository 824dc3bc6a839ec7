//! Rectangular result table and its CSV export.

use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// A named column of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<String>,
}

/// Columns of identical length, in bucket-creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<Column>,
}

/// Pad every column with empty strings up to the longest one. Never truncates.
pub fn pad_columns(columns: &mut [Column]) -> usize {
    let max_len = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
    for column in columns.iter_mut() {
        column.values.resize(max_len, String::new());
    }
    max_len
}

impl ResultTable {
    /// Build a table from possibly ragged columns, padding short ones.
    pub fn from_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut columns: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| Column { name, values })
            .collect();
        pad_columns(&mut columns);
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Row `i` across all columns.
    pub fn row(&self, i: usize) -> Option<Vec<&str>> {
        if i >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[i].as_str()).collect())
    }

    /// Write as CSV: an unnamed index column, then one column per bucket.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = vec![""];
        header.extend(self.column_names());
        csv.write_record(&header)?;

        for i in 0..self.row_count() {
            let index = i.to_string();
            let mut record = vec![index.as_str()];
            record.extend(self.columns.iter().map(|c| c.values[i].as_str()));
            csv.write_record(&record)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Write the CSV to a uniquely named temporary file next to `path` and
    /// move it into place once complete, so a failure never leaves a
    /// half-written file behind and concurrent writers never share a
    /// temporary file.
    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_csv(BufWriter::new(tmp.as_file_mut()))?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Plain-text preview of the first `rows` rows.
    pub fn preview(&self, rows: usize) -> String {
        let shown = rows.min(self.row_count());
        let index_width = shown.saturating_sub(1).to_string().len();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| {
                c.values[..shown]
                    .iter()
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(c.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (column, width) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {:<width$}", column.name, width = width));
        }
        out.push('\n');

        for i in 0..shown {
            out.push_str(&format!("{:>width$}", i, width = index_width));
            for (column, width) in self.columns.iter().zip(&widths) {
                out.push_str(&format!("  {:<width$}", column.values[i], width = width));
            }
            out.push('\n');
        }
        out
    }
}
