//! Tab-separated tables with a header row and a leading index column, the
//! layout RSEM, the QC flattener and the metadata sheets all share.
//!
//! Cells are kept as the exact text read from disk so values round-trip
//! without reformatting; an empty cell is a missing value.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::PipelineError;

/// A single named column keyed by row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub index: Vec<String>,
    pub values: Vec<Option<String>>,
}

impl Series {
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .iter()
            .position(|k| k == key)
            .and_then(|i| self.values[i].as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    source: String,
    index_name: String,
    columns: Vec<String>,
    index: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(index_name: &str) -> Self {
        Self {
            source: "<memory>".to_string(),
            index_name: index_name.to_string(),
            columns: Vec::new(),
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Reads a TSV file. With `header` the first line names the index and
    /// the columns; without it columns are numbered from 1.
    pub fn read_tsv(path: &Path, header: bool) -> Result<Self, PipelineError> {
        let source = path.display().to_string();
        let table_err = |message: String| PipelineError::Table {
            path: source.clone(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_path(path)
            .map_err(|err| table_err(err.to_string()))?;

        let mut records = reader.records();
        let mut table = Table::new("");
        table.source = source.clone();

        if header {
            let Some(first) = records.next() else {
                return Err(table_err("missing header row".to_string()));
            };
            let first = first.map_err(|err| table_err(err.to_string()))?;
            let mut fields = first.iter();
            table.index_name = fields.next().unwrap_or_default().to_string();
            table.columns = fields.map(str::to_string).collect();
        }

        let mut seen = HashSet::new();
        for (line, record) in records.enumerate() {
            let record = record.map_err(|err| table_err(err.to_string()))?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let mut fields = record.iter();
            let key = fields.next().unwrap_or_default().to_string();
            let values: Vec<Option<String>> = fields.map(cell).collect();

            if !header && table.columns.len() < values.len() {
                table.columns = (1..=values.len()).map(|n| n.to_string()).collect();
                for row in &mut table.rows {
                    row.resize(values.len(), None);
                }
            }
            if values.len() > table.columns.len() {
                return Err(table_err(format!(
                    "row {} has {} values for {} columns",
                    line + 1,
                    values.len(),
                    table.columns.len()
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(PipelineError::DuplicateRow {
                    path: source.clone(),
                    key,
                });
            }

            let mut values = values;
            values.resize(table.columns.len(), None);
            table.index.push(key);
            table.rows.push(values);
        }

        Ok(table)
    }

    /// Writes the table atomically; the header row is optional.
    pub fn write_tsv(&self, path: &Path, header: bool) -> Result<(), PipelineError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        let temp = tempfile::Builder::new()
            .prefix(".rsem-pipe-table")
            .tempfile_in(&parent)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;

        let target = path.display().to_string();
        let write_err = |err: csv::Error| PipelineError::Table {
            path: target.clone(),
            message: err.to_string(),
        };

        {
            let mut writer = WriterBuilder::new()
                .delimiter(b'\t')
                .flexible(true)
                .from_writer(temp.as_file());
            if header {
                let mut row = vec![self.index_name.as_str()];
                row.extend(self.columns.iter().map(String::as_str));
                writer.write_record(&row).map_err(write_err)?;
            }
            for (key, values) in self.index.iter().zip(&self.rows) {
                let mut row = vec![key.as_str()];
                row.extend(values.iter().map(|v| v.as_deref().unwrap_or("")));
                writer.write_record(&row).map_err(write_err)?;
            }
            writer
                .flush()
                .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        }

        temp.persist(path)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn set_index_name(&mut self, name: &str) {
        self.index_name = name.to_string();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.columns.is_empty()
    }

    pub fn value(&self, key: &str, column: &str) -> Option<&str> {
        let row = self.index.iter().position(|k| k == key)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows[row][col].as_deref()
    }

    fn column_position(&self, name: &str) -> Result<usize, PipelineError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: self.source.clone(),
                column: name.to_string(),
            })
    }

    pub fn column(&self, name: &str) -> Result<Series, PipelineError> {
        let pos = self.column_position(name)?;
        Ok(Series {
            name: name.to_string(),
            index: self.index.clone(),
            values: self.rows.iter().map(|row| row[pos].clone()).collect(),
        })
    }

    /// Column at a zero-based position, for header-less tables.
    pub fn column_at(&self, pos: usize) -> Option<Series> {
        let name = self.columns.get(pos)?;
        Some(Series {
            name: name.clone(),
            index: self.index.clone(),
            values: self.rows.iter().map(|row| row[pos].clone()).collect(),
        })
    }

    /// Outer join on the row index. The result's rows are the sorted union
    /// of both key sets; cells absent on either side are missing.
    pub fn outer_join(&mut self, series: Series) {
        let mut by_key: HashMap<String, Vec<Option<String>>> = self
            .index
            .drain(..)
            .zip(self.rows.drain(..))
            .collect();
        let incoming: HashMap<&str, &Option<String>> = series
            .index
            .iter()
            .map(String::as_str)
            .zip(series.values.iter())
            .collect();

        let keys: BTreeSet<String> = by_key
            .keys()
            .cloned()
            .chain(series.index.iter().cloned())
            .collect();

        let width = self.columns.len();
        for key in keys {
            let mut row = by_key.remove(&key).unwrap_or_else(|| vec![None; width]);
            row.push(incoming.get(key.as_str()).and_then(|v| (*v).clone()));
            self.index.push(key);
            self.rows.push(row);
        }
        self.columns.push(series.name);
    }

    /// Keeps rows whose `column` cell equals `value` exactly.
    pub fn filter_eq(&self, column: &str, value: &str) -> Result<Table, PipelineError> {
        let pos = self.column_position(column)?;
        let mut out = self.empty_like();
        for (key, row) in self.index.iter().zip(&self.rows) {
            if row[pos].as_deref() == Some(value) {
                out.index.push(key.clone());
                out.rows.push(row.clone());
            }
        }
        Ok(out)
    }

    /// Stable ascending sort by `column`. Numeric when every present value
    /// parses as a number, lexicographic otherwise; missing values sort last.
    pub fn sort_by_column(&mut self, column: &str) -> Result<(), PipelineError> {
        let pos = self.column_position(column)?;
        let numeric = self
            .rows
            .iter()
            .filter_map(|row| row[pos].as_deref())
            .all(|v| v.trim().parse::<f64>().is_ok());

        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by(|&a, &b| {
            match (self.rows[a][pos].as_deref(), self.rows[b][pos].as_deref()) {
                (Some(x), Some(y)) if numeric => {
                    let x: f64 = x.trim().parse().unwrap_or(f64::NAN);
                    let y: f64 = y.trim().parse().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        self.index = order.iter().map(|&i| self.index[i].clone()).collect();
        self.rows = order.iter().map(|&i| self.rows[i].clone()).collect();
        Ok(())
    }

    /// Projects onto `names`, in that order.
    pub fn select_columns(&self, names: &[String]) -> Result<Table, PipelineError> {
        let positions = names
            .iter()
            .map(|name| self.column_position(name))
            .collect::<Result<Vec<_>, _>>()?;
        let mut out = self.empty_like();
        out.columns = names.to_vec();
        out.index = self.index.clone();
        out.rows = self
            .rows
            .iter()
            .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
            .collect();
        Ok(out)
    }

    fn empty_like(&self) -> Table {
        Table {
            source: self.source.clone(),
            index_name: self.index_name.clone(),
            columns: self.columns.clone(),
            index: Vec::new(),
            rows: Vec::new(),
        }
    }
}

fn cell(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
