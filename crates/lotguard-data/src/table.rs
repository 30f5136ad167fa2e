use lotguard_core::{LotError, LotResult, Tensor};
use std::collections::HashMap;
use std::fmt;

/// A single cell of an uploaded table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parse a raw text cell the way a spreadsheet would: blank is missing,
    /// anything that reads as a number is a number.
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Value::Number(v),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell. Text that parses as a number is coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// In-memory table with named columns and ordered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    index: HashMap<String, usize>,
}

impl Table {
    /// Build a table, checking that every row has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> LotResult<Self> {
        if columns.is_empty() {
            return Err(LotError::format("table has no columns"));
        }
        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(LotError::format(format!("duplicate column '{name}'")));
            }
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(LotError::format(format!(
                "row {} has {} cells, expected {}",
                i + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Table { columns, rows, index })
    }

    /// Build a numeric table from named columns of equal length.
    pub fn from_columns(columns: Vec<(&str, Vec<f64>)>) -> LotResult<Self> {
        let n = columns.first().map_or(0, |(_, v)| v.len());
        if let Some((name, _)) = columns.iter().find(|(_, v)| v.len() != n) {
            return Err(LotError::format(format!("column '{name}' has a different length")));
        }
        let names = columns.iter().map(|(name, _)| name.to_string()).collect();
        let rows = (0..n)
            .map(|i| columns.iter().map(|(_, v)| Value::Number(v[i])).collect())
            .collect();
        Table::new(names, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of a column that must be present.
    pub fn require_column(&self, name: &str) -> LotResult<usize> {
        self.column_index(name).ok_or_else(|| {
            LotError::schema(format!(
                "missing required column '{name}' (available: {})",
                self.columns.join(", ")
            ))
        })
    }

    /// All values of a column as numbers; a missing, non-numeric or
    /// non-finite (`nan`, `inf`) cell fails.
    pub fn numeric_column(&self, name: &str) -> LotResult<Vec<f64>> {
        let j = self.require_column(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row[j].as_f64() {
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(LotError::schema(format!(
                    "column '{name}' row {}: value must be finite, found {v}",
                    i + 1
                ))),
                None => Err(LotError::schema(format!(
                    "column '{name}' row {}: expected a number, found '{}'",
                    i + 1,
                    row[j]
                ))),
            })
            .collect()
    }

    /// Matrix `[rows, names.len()]` of the named numeric columns, in the given order.
    pub fn numeric_matrix(&self, names: &[String]) -> LotResult<Tensor<f64>> {
        let columns = names
            .iter()
            .map(|name| self.numeric_column(name))
            .collect::<LotResult<Vec<_>>>()?;
        let n = self.nrows();
        let mut data = Vec::with_capacity(n * names.len());
        for i in 0..n {
            data.extend(columns.iter().map(|col| col[i]));
        }
        Ok(Tensor::new(data, vec![n, names.len()])?)
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            index: self.index.clone(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join(" | "))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", cells.join(" | "))?;
        }
        Ok(())
    }
}
