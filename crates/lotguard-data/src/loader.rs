use crate::table::{Table, Value};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use log::{debug, info};
use lotguard_core::{LotError, LotResult};
use serde_json::Value as Json;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Supported upload encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Excel,
    Json,
}

impl DataFormat {
    pub fn from_extension(ext: &str) -> LotResult<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "xlsx" | "xls" => Ok(DataFormat::Excel),
            "json" => Ok(DataFormat::Json),
            other => Err(LotError::format(format!(
                "unsupported format '{other}': use CSV, Excel or JSON"
            ))),
        }
    }

    pub fn from_path(path: &Path) -> LotResult<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataFormat::Csv => "CSV",
            DataFormat::Excel => "Excel",
            DataFormat::Json => "JSON",
        }
    }
}

/// Load a table from disk, dispatching on the file extension.
pub fn load_table(path: impl AsRef<Path>) -> LotResult<Table> {
    let path = path.as_ref();
    let format = DataFormat::from_path(path)?;
    let file = File::open(path)?;
    let table = load_reader(format, file)?;
    info!(
        "loaded {} rows x {} columns from {} ({})",
        table.nrows(),
        table.ncols(),
        path.display(),
        format.name()
    );
    Ok(table)
}

/// Decode a table of the given format from any reader (e.g. uploaded bytes).
pub fn load_reader<R: Read>(format: DataFormat, reader: R) -> LotResult<Table> {
    match format {
        DataFormat::Csv => decode_csv(reader),
        DataFormat::Excel => decode_excel(reader),
        DataFormat::Json => decode_json(reader),
    }
}

fn decode_csv<R: Read>(reader: R) -> LotResult<Table> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let columns: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.iter().all(String::is_empty) {
        return Err(LotError::format("CSV file has an empty header"));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(Value::parse).collect());
    }
    debug!("decoded {} CSV rows", rows.len());
    Table::new(columns, rows)
}

fn csv_error(e: csv::Error) -> LotError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => LotError::Io(io),
        kind => LotError::format(format!("invalid CSV: {kind:?}")),
    }
}

fn decode_excel<R: Read>(mut reader: R) -> LotResult<Table> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| LotError::format(format!("invalid Excel workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LotError::format("Excel workbook has no worksheets"))?
        .map_err(|e| LotError::format(format!("unreadable worksheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .next()
        .ok_or_else(|| LotError::format("Excel worksheet is empty"))?;
    let columns: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();

    let rows = sheet_rows
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();
    Table::new(columns, rows)
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) => Value::Number(*v),
        Data::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => Value::parse(s),
        Data::Empty => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

/// Accepts record arrays (`[{"a": 1}, ...]`) and column objects
/// (`{"a": {"0": 1}}` or `{"a": [1]}`).
fn decode_json<R: Read>(reader: R) -> LotResult<Table> {
    let doc: Json = serde_json::from_reader(reader)
        .map_err(|e| LotError::format(format!("invalid JSON: {e}")))?;
    match doc {
        Json::Array(records) => json_records(records),
        Json::Object(columns) => json_columns(columns),
        _ => Err(LotError::format("JSON must be an array of records or an object of columns")),
    }
}

fn json_records(records: Vec<Json>) -> LotResult<Table> {
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        let obj = record
            .as_object()
            .ok_or_else(|| LotError::format("every JSON record must be an object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return Err(LotError::format("JSON records contain no fields"));
    }

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| json_cell(record.get(c).unwrap_or(&Json::Null)))
                .collect::<LotResult<Vec<_>>>()
        })
        .collect::<LotResult<Vec<_>>>()?;
    Table::new(columns, rows)
}

fn json_columns(columns: serde_json::Map<String, Json>) -> LotResult<Table> {
    let mut names = Vec::with_capacity(columns.len());
    let mut cells: Vec<Vec<Value>> = Vec::with_capacity(columns.len());
    for (name, column) in columns {
        let values = match column {
            Json::Array(items) => items.iter().map(json_cell).collect::<LotResult<Vec<_>>>()?,
            Json::Object(by_index) => {
                let mut entries: Vec<(usize, Json)> = by_index
                    .into_iter()
                    .map(|(k, v)| {
                        k.parse::<usize>()
                            .map(|i| (i, v))
                            .map_err(|_| LotError::format(format!("column '{name}': bad row index '{k}'")))
                    })
                    .collect::<LotResult<_>>()?;
                entries.sort_by_key(|(i, _)| *i);
                entries.iter().map(|(_, v)| json_cell(v)).collect::<LotResult<Vec<_>>>()?
            }
            _ => return Err(LotError::format(format!("column '{name}' must be an array or object"))),
        };
        names.push(name);
        cells.push(values);
    }

    let n = cells.first().map_or(0, Vec::len);
    if cells.iter().any(|c| c.len() != n) {
        return Err(LotError::format("JSON columns have different lengths"));
    }
    let rows = (0..n)
        .map(|i| cells.iter().map(|c| c[i].clone()).collect())
        .collect();
    Table::new(names, rows)
}

fn json_cell(v: &Json) -> LotResult<Value> {
    match v {
        Json::Null => Ok(Value::Missing),
        Json::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        Json::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| LotError::format(format!("unrepresentable number {n}"))),
        Json::String(s) => Ok(Value::parse(s)),
        _ => Err(LotError::format("nested JSON values are not supported")),
    }
}
