//! Row-oriented export of profiles and CSV serialization.
//!
//! Header row is `Index,<profile names...>`; each data row is the sample
//! index followed by one value per profile.

use anyhow::{anyhow, bail, Context, Result};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Name of the leading index column.
pub const INDEX_HEADER: &str = "Index";

/// One data row: the sample index and one value per profile column.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub index: usize,
    pub values: Vec<f64>,
}

/// Complete in-memory table, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    /// `Index` followed by the profile names
    pub header: Vec<String>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    /// Builds a table from named columns. Column order is preserved.
    ///
    /// Fails if there are no columns or if the columns differ in length.
    pub fn from_columns(columns: &[(&str, &[f64])]) -> Result<Self> {
        let Some((first_name, first)) = columns.first() else {
            bail!("Cannot build an export table without profiles");
        };
        let len = first.len();

        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != len) {
            bail!(
                "Size mismatch: profile '{}' has {} samples, '{}' has {}",
                name,
                values.len(),
                first_name,
                len
            );
        }

        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push(INDEX_HEADER.to_string());
        header.extend(columns.iter().map(|(name, _)| name.to_string()));

        let rows = (0..len)
            .map(|index| ExportRow {
                index,
                values: columns.iter().map(|(_, v)| v[index]).collect(),
            })
            .collect();

        Ok(Self { header, rows })
    }

    /// Number of data rows (excluding the header).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serializes the table as CSV text, one newline-terminated line per row.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header.join(","));
        out.push('\n');

        for row in &self.rows {
            let _ = write!(out, "{}", row.index);
            for value in &row.values {
                let _ = write!(out, ",{}", value);
            }
            out.push('\n');
        }

        out
    }

    /// Writes the table to `path`.
    ///
    /// The data goes to a temporary file in the same directory first and is
    /// renamed into place, so a failed write never leaves a partial file.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)
            .context(format!("Failed to create temporary file in {}", dir.display()))?;
        tmp.write_all(self.to_csv().as_bytes())
            .context("Failed to write CSV data")?;
        tmp.as_file().sync_all().context("Failed to flush CSV data")?;
        tmp.persist(path)
            .map_err(|e| anyhow!("Failed to save CSV to {}: {}", path.display(), e.error))?;

        Ok(())
    }

    /// Parses CSV text produced by [`ExportTable::to_csv`].
    #[cfg(test)]
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header_line = lines.next().ok_or_else(|| anyhow!("CSV is empty"))?;
        let header: Vec<String> = header_line.split(',').map(|s| s.trim().to_string()).collect();
        if header.first().map(String::as_str) != Some(INDEX_HEADER) {
            bail!("CSV header must start with '{}'", INDEX_HEADER);
        }

        let mut rows = Vec::new();
        for (line_num, line) in lines.enumerate() {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() != header.len() {
                bail!(
                    "Row {}: expected {} columns, got {}",
                    line_num + 2,
                    header.len(),
                    parts.len()
                );
            }

            let index = parts[0]
                .parse::<usize>()
                .context(format!("Row {}: invalid index", line_num + 2))?;
            let values = parts[1..]
                .iter()
                .map(|p| p.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .context(format!("Row {}: invalid sample", line_num + 2))?;

            rows.push(ExportRow { index, values });
        }

        Ok(Self { header, rows })
    }

    /// Reads a CSV file written by [`ExportTable::write_csv`].
    #[cfg(test)]
    pub fn read_csv(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to open CSV file: {}", path.display()))?;
        Self::from_csv_str(&content)
    }
}
