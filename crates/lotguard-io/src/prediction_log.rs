use chrono::{Local, NaiveDateTime, Timelike};
use log::{debug, info};
use lotguard_core::{LotError, LotResult};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_COLUMN: &str = "Fecha y Hora";
pub const PREDICTION_COLUMN: &str = "Predicción";
pub const INTERPRETATION_COLUMN: &str = "Interpretación";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Feature headers used by the two-predictor lot model.
pub const DEFAULT_FEATURE_NAMES: [&str; 2] = ["Cantidad de Productos", "Tiempo de Entrega"];

/// Outcome of classifying one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Defective,
    NotDefective,
}

impl Label {
    /// Class 1 is defective; anything at or above 0.5 counts as class 1.
    pub fn from_prediction(value: f64) -> Self {
        if value >= 0.5 {
            Label::Defective
        } else {
            Label::NotDefective
        }
    }

    /// Numeric class as stored in the log's prediction column.
    pub fn flag(&self) -> u8 {
        match self {
            Label::Defective => 1,
            Label::NotDefective => 0,
        }
    }

    /// Operator-facing text written to the log.
    pub fn interpretation(&self) -> &'static str {
        match self {
            Label::Defective => "Defectuoso",
            Label::NotDefective => "No defectuoso",
        }
    }

    pub fn is_defective(&self) -> bool {
        matches!(self, Label::Defective)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Defective => write!(f, "defective"),
            Label::NotDefective => write!(f, "not defective"),
        }
    }
}

/// One logged prediction. Timestamps have whole-second precision, which is
/// what the log stores.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub timestamp: NaiveDateTime,
    pub features: Vec<f64>,
    pub label: Label,
}

impl PredictionRecord {
    /// Record stamped with the current local time.
    pub fn now(features: Vec<f64>, label: Label) -> Self {
        let now = Local::now().naive_local();
        PredictionRecord {
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            features,
            label,
        }
    }
}

/// Everything read back from a log file.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub feature_names: Vec<String>,
    pub records: Vec<PredictionRecord>,
}

/// Class counts over a set of logged predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub total: usize,
    pub defective: usize,
    pub not_defective: usize,
}

/// Defective share above which the shell raises an alert.
pub const ATTENTION_THRESHOLD: f64 = 50.0;

impl LogSummary {
    pub fn defective_percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.defective as f64 * 100.0 / self.total as f64
        }
    }

    pub fn needs_attention(&self) -> bool {
        self.defective_percentage() > ATTENTION_THRESHOLD
    }
}

impl fmt::Display for LogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} defective / {} not defective ({:.2}%)",
            self.defective,
            self.not_defective,
            self.defective_percentage()
        )
    }
}

pub fn summarize(records: &[PredictionRecord]) -> LogSummary {
    let defective = records.iter().filter(|r| r.label.is_defective()).count();
    LogSummary {
        total: records.len(),
        defective,
        not_defective: records.len() - defective,
    }
}

/// Append-only CSV file of predictions, oldest first.
///
/// The header is written when the file is missing or empty. There is no
/// cross-process locking: two processes appending at once may interleave
/// rows or both write a header.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionLog {
    path: PathBuf,
    feature_names: Vec<String>,
}

impl PredictionLog {
    pub fn new(path: impl Into<PathBuf>, feature_names: Vec<String>) -> Self {
        PredictionLog {
            path: path.into(),
            feature_names,
        }
    }

    /// Log for the two-predictor model with the standard Spanish headers.
    pub fn with_default_features(path: impl Into<PathBuf>) -> Self {
        Self::new(path, DEFAULT_FEATURE_NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// Log whose feature headers are `Variable 1..n`.
    pub fn generic(path: impl Into<PathBuf>, n_features: usize) -> Self {
        Self::new(path, (1..=n_features).map(|i| format!("Variable {i}")).collect())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.feature_names.len() + 3);
        header.push(TIMESTAMP_COLUMN.to_string());
        header.extend(self.feature_names.iter().cloned());
        header.push(PREDICTION_COLUMN.to_string());
        header.push(INTERPRETATION_COLUMN.to_string());
        header
    }

    fn needs_header(&self) -> io::Result<bool> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// An existing log must carry exactly this log's columns, otherwise the
    /// appended rows would make the whole file unreadable.
    fn check_existing_header(&self) -> LotResult<()> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(csv_error)?;
        let found: Vec<String> = rdr.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
        let expected = self.header();
        if found != expected {
            return Err(LotError::schema(format!(
                "log {} has columns [{}], expected [{}]",
                self.path.display(),
                found.join(", "),
                expected.join(", ")
            )));
        }
        Ok(())
    }

    /// Stamp `features` with the current time and append them.
    pub fn append(&self, features: &[f64], label: Label) -> LotResult<PredictionRecord> {
        let record = PredictionRecord::now(features.to_vec(), label);
        self.append_record(&record)?;
        Ok(record)
    }

    pub fn append_record(&self, record: &PredictionRecord) -> LotResult<()> {
        if record.features.len() != self.feature_names.len() {
            return Err(LotError::schema(format!(
                "log expects {} features, got {}",
                self.feature_names.len(),
                record.features.len()
            )));
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let write_header = self.needs_header()?;
        if !write_header {
            self.check_existing_header()?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut wtr = csv::Writer::from_writer(file);
        if write_header {
            debug!("writing prediction log header to {}", self.path.display());
            wtr.write_record(self.header()).map_err(csv_error)?;
        }

        let mut row = Vec::with_capacity(self.feature_names.len() + 3);
        row.push(record.timestamp.format(TIMESTAMP_FORMAT).to_string());
        row.extend(record.features.iter().map(|v| v.to_string()));
        row.push(record.label.flag().to_string());
        row.push(record.label.interpretation().to_string());
        wtr.write_record(&row).map_err(csv_error)?;
        wtr.flush()?;
        Ok(())
    }

    /// Read every record back in file order. `None` when the log does not
    /// exist yet or holds no records.
    pub fn load_all(&self) -> LotResult<Option<PredictionTable>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut rdr = csv::Reader::from_reader(file);
        let header: Vec<String> = rdr.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
        if header.is_empty() || header.iter().all(String::is_empty) {
            return Ok(None);
        }
        if header.len() < 3 {
            return Err(corrupt(format!("log header has {} columns", header.len())));
        }
        let feature_names = header[1..header.len() - 2].to_vec();

        let mut records = Vec::new();
        for (line, row) in rdr.records().enumerate() {
            let row = row.map_err(csv_error)?;
            records.push(parse_row(&row, feature_names.len(), line + 2)?);
        }
        if records.is_empty() {
            return Ok(None);
        }
        info!("read {} predictions from {}", records.len(), self.path.display());
        Ok(Some(PredictionTable { feature_names, records }))
    }
}

fn parse_row(row: &csv::StringRecord, n_features: usize, line: usize) -> LotResult<PredictionRecord> {
    if row.len() != n_features + 3 {
        return Err(corrupt(format!("line {line}: expected {} fields, got {}", n_features + 3, row.len())));
    }
    let timestamp = NaiveDateTime::parse_from_str(&row[0], TIMESTAMP_FORMAT)
        .map_err(|e| corrupt(format!("line {line}: bad timestamp '{}': {e}", &row[0])))?;
    let features = (1..=n_features)
        .map(|j| {
            row[j]
                .parse::<f64>()
                .map_err(|_| corrupt(format!("line {line}: bad feature value '{}'", &row[j])))
        })
        .collect::<LotResult<Vec<_>>>()?;
    let label = match &row[n_features + 1] {
        "1" => Label::Defective,
        "0" => Label::NotDefective,
        other => return Err(corrupt(format!("line {line}: bad prediction '{other}'"))),
    };
    Ok(PredictionRecord { timestamp, features, label })
}

fn corrupt(msg: String) -> LotError {
    LotError::Io(io::Error::new(io::ErrorKind::InvalidData, msg))
}

fn csv_error(e: csv::Error) -> LotError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => LotError::Io(io),
        kind => corrupt(format!("invalid prediction log: {kind:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_sequential_appends_read_back_in_order() {
        let dir = tempdir().unwrap();
        let log = PredictionLog::with_default_features(dir.path().join("predicciones.csv"));

        let r1 = log.append(&[25.0, 12.0], Label::NotDefective).unwrap();
        let r2 = log.append(&[48.5, 30.0], Label::Defective).unwrap();

        let table = log.load_all().unwrap().unwrap();
        assert_eq!(table.records, vec![r1, r2]);
        assert_eq!(table.feature_names, vec!["Cantidad de Productos", "Tiempo de Entrega"]);

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.matches(TIMESTAMP_COLUMN).count(), 1);
        assert!(text.starts_with("Fecha y Hora,Cantidad de Productos,Tiempo de Entrega,Predicción,Interpretación"));
        assert!(text.contains(",48.5,30,1,Defectuoso"));
    }

    #[test]
    fn test_header_written_into_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        File::create(&path).unwrap();
        let log = PredictionLog::generic(&path, 3);
        let record = PredictionRecord {
            timestamp: at(9, 15, 0),
            features: vec![1.0, 2.0, 3.0],
            label: Label::Defective,
        };
        log.append_record(&record).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Fecha y Hora,Variable 1,Variable 2,Variable 3,Predicción,Interpretación"
        );
        assert_eq!(lines.next().unwrap(), "2024-03-01 09:15:00,1,2,3,1,Defectuoso");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_append_rejects_log_with_different_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("predicciones.csv");
        let first = PredictionLog::with_default_features(&path)
            .append(&[25.0, 12.0], Label::NotDefective)
            .unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let wider = PredictionLog::generic(&path, 3);
        let err = wider.append(&[1.0, 2.0, 3.0], Label::Defective).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Variable 1"));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        // same width, different names
        let renamed = PredictionLog::generic(&path, 2);
        assert!(renamed.append(&[1.0, 2.0], Label::Defective).unwrap_err().is_schema());

        let table = PredictionLog::with_default_features(&path).load_all().unwrap().unwrap();
        assert_eq!(table.records, vec![first]);
    }

    #[test]
    fn test_absent_or_header_only_log_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let log = PredictionLog::with_default_features(&path);
        assert!(log.load_all().unwrap().is_none());

        fs::write(&path, "Fecha y Hora,Cantidad de Productos,Tiempo de Entrega,Predicción,Interpretación\n").unwrap();
        assert!(log.load_all().unwrap().is_none());
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let dir = tempdir().unwrap();
        let log = PredictionLog::with_default_features(dir.path().join("log.csv"));
        assert!(log.append(&[1.0], Label::Defective).unwrap_err().is_schema());
        assert!(!log.path().exists());
    }

    #[test]
    fn test_corrupt_row_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.csv");
        fs::write(
            &path,
            "Fecha y Hora,A,Predicción,Interpretación\nyesterday,1,0,No defectuoso\n",
        )
        .unwrap();
        let err = PredictionLog::generic(&path, 1).load_all().unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempdir().unwrap();
        // a directory cannot be opened for appending
        let log = PredictionLog::generic(dir.path(), 1);
        assert!(log.append(&[1.0], Label::Defective).unwrap_err().is_io());
    }

    #[test]
    fn test_summary_of_empty_log() {
        let s = summarize(&[]);
        assert_eq!(s, LogSummary::default());
        assert_eq!(s.defective_percentage(), 0.0);
        assert!(!s.needs_attention());
    }

    #[test]
    fn test_summary_percentage() {
        let records: Vec<PredictionRecord> = (0..10)
            .map(|i| PredictionRecord {
                timestamp: at(10, 0, i),
                features: vec![i as f64],
                label: if i < 3 { Label::Defective } else { Label::NotDefective },
            })
            .collect();
        let s = summarize(&records);
        assert_eq!((s.total, s.defective, s.not_defective), (10, 3, 7));
        assert_eq!(s.to_string(), "3 defective / 7 not defective (30.00%)");
        assert!(!s.needs_attention());
    }

    #[test]
    fn test_label_text() {
        assert_eq!(Label::from_prediction(1.0).to_string(), "defective");
        assert_eq!(Label::from_prediction(0.0).to_string(), "not defective");
        assert_eq!(Label::NotDefective.interpretation(), "No defectuoso");
    }
}
