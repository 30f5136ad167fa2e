use lotguard::data::Table;
use lotguard::{Label, Session, SessionConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const LOTS_CSV: &str = "\
Productos-Lote,Tiempo-Entrega,Defectuoso
10,5,0
20,10,0
30,15,1
40,20,1
";

fn session_logging_to(path: &Path) -> Session {
    Session::new(SessionConfig {
        log_path: path.to_path_buf(),
        ..Default::default()
    })
}

#[test]
fn test_load_train_predict_logs_one_record() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("lotes.csv");
    fs::write(&data, LOTS_CSV).unwrap();
    let log_path = dir.path().join("registro_predicciones.csv");

    let mut session = session_logging_to(&log_path);
    assert_eq!(session.load_data(&data).unwrap().nrows(), 4);

    let report = session.train(0.01, 50).unwrap();
    assert_eq!(report.trace.len(), 50);
    assert_eq!((report.n_train, report.n_test), (3, 1));
    assert!(report.test_accuracy.is_some());
    assert!(report.trace.losses.iter().all(|l| l.is_finite() && *l >= 0.0));
    assert!(report.trace.accuracies.iter().all(|a| (0.0..=1.0).contains(a)));

    let outcome = session.predict(&[vec![25.0, 12.0]]).unwrap();
    assert_eq!(outcome.labels.len(), 1);
    assert!(["defective", "not defective"].contains(&outcome.labels[0].to_string().as_str()));
    assert!(outcome.warning.is_none());

    let history = session.history();
    let table = history.table.unwrap();
    assert_eq!(table.records.len(), 1);
    assert_eq!(table.records[0].features, vec![25.0, 12.0]);
    assert_eq!(table.records[0].label, outcome.labels[0]);
    assert_eq!(history.summary.total, 1);
}

#[test]
fn test_json_and_csv_inputs_train_the_same_model() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("lotes.csv");
    let json = dir.path().join("lotes.json");
    fs::write(&csv, LOTS_CSV).unwrap();
    fs::write(
        &json,
        r#"[
            {"Productos-Lote": 10, "Tiempo-Entrega": 5, "Defectuoso": 0},
            {"Productos-Lote": 20, "Tiempo-Entrega": 10, "Defectuoso": 0},
            {"Productos-Lote": 30, "Tiempo-Entrega": 15, "Defectuoso": 1},
            {"Productos-Lote": 40, "Tiempo-Entrega": 20, "Defectuoso": 1}
        ]"#,
    )
    .unwrap();

    let mut a = session_logging_to(&dir.path().join("a.csv"));
    a.load_data(&csv).unwrap();
    a.train(0.1, 100).unwrap();
    let mut b = session_logging_to(&dir.path().join("b.csv"));
    b.load_data(&json).unwrap();
    b.train(0.1, 100).unwrap();

    assert_eq!(a.trained().unwrap().model, b.trained().unwrap().model);
}

#[test]
fn test_failed_training_keeps_previous_model() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("lotes.csv");
    fs::write(&data, LOTS_CSV).unwrap();

    let mut session = session_logging_to(&dir.path().join("log.csv"));
    session.load_data(&data).unwrap();
    session.train(0.01, 50).unwrap();
    let before = session.trained().unwrap().model.clone();

    session.set_dataset(
        Table::from_columns(vec![
            ("Productos-Lote", vec![1.0, 2.0]),
            ("Tiempo-Entrega", vec![3.0, 4.0]),
        ])
        .unwrap(),
    );
    assert!(session.train(0.01, 50).unwrap_err().is_schema());
    assert_eq!(session.trained().unwrap().model, before);

    session.set_dataset(
        Table::from_columns(vec![
            ("Productos-Lote", vec![1.0, 2.0, 3.0, 4.0]),
            ("Tiempo-Entrega", vec![3.0, 4.0, 5.0, 6.0]),
            ("Defectuoso", vec![1.0, 1.0, 1.0, 1.0]),
        ])
        .unwrap(),
    );
    assert!(session.train(0.01, 50).unwrap_err().is_model());
    assert_eq!(session.trained().unwrap().model, before);
}

#[test]
fn test_non_finite_cells_do_not_replace_the_model() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("lotes.csv");
    let bad = dir.path().join("lotes_nan.csv");
    fs::write(&good, LOTS_CSV).unwrap();
    fs::write(
        &bad,
        "Productos-Lote,Tiempo-Entrega,Defectuoso\n10,5,0\nnan,10,0\n30,inf,1\n40,20,1\n",
    )
    .unwrap();

    let mut session = session_logging_to(&dir.path().join("log.csv"));
    session.load_data(&good).unwrap();
    session.train(0.5, 200).unwrap();
    let before = session.trained().unwrap().model.clone();
    let expected = session.predict(&[vec![40.0, 20.0]]).unwrap().labels;

    session.load_data(&bad).unwrap();
    let err = session.train(0.5, 200).unwrap_err();
    assert!(err.is_schema());
    assert!(err.to_string().contains("Productos-Lote"));

    let trained = session.trained().unwrap();
    assert_eq!(trained.model, before);
    assert!(trained.model.weights().iter().all(|w| w.is_finite()));
    assert_eq!(session.predict(&[vec![40.0, 20.0]]).unwrap().labels, expected);
    assert!(session.predict(&[vec![f64::NAN, 20.0]]).unwrap_err().is_schema());
}

#[test]
fn test_session_debug_output() {
    let dir = tempdir().unwrap();
    let session = session_logging_to(&dir.path().join("log.csv"));
    let shown = format!("{session:?}");
    assert!(shown.starts_with("Session"));
    assert!(shown.contains("log.csv"));
}

#[test]
fn test_unwritable_log_downgrades_to_warning() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("lotes.csv");
    fs::write(&data, LOTS_CSV).unwrap();

    // the log path is a directory, so appending fails
    let mut session = session_logging_to(dir.path());
    session.load_data(&data).unwrap();
    session.train(0.01, 50).unwrap();

    let outcome = session.predict(&[vec![25.0, 12.0], vec![45.0, 22.0]]).unwrap();
    assert_eq!(outcome.labels.len(), 2);
    assert!(outcome.warning.is_some());
}

#[test]
fn test_predictions_accumulate_in_order() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("lotes.csv");
    fs::write(&data, LOTS_CSV).unwrap();
    let log_path = dir.path().join("log.csv");

    let mut session = session_logging_to(&log_path);
    session.load_data(&data).unwrap();
    session.train(0.5, 200).unwrap();
    let first = session.predict(&[vec![12.0, 6.0]]).unwrap();
    let second = session.predict(&[vec![38.0, 19.0], vec![15.0, 7.0]]).unwrap();

    let history = session.history();
    let records = history.table.unwrap().records;
    let features: Vec<Vec<f64>> = records.iter().map(|r| r.features.clone()).collect();
    assert_eq!(features, vec![vec![12.0, 6.0], vec![38.0, 19.0], vec![15.0, 7.0]]);

    let labels: Vec<Label> = first.labels.into_iter().chain(second.labels).collect();
    assert_eq!(records.iter().map(|r| r.label).collect::<Vec<_>>(), labels);
    let defective = labels.iter().filter(|l| l.is_defective()).count();
    assert_eq!(history.summary.defective, defective);

    let text = fs::read_to_string(&log_path).unwrap();
    assert_eq!(text.matches("Fecha y Hora").count(), 1);
}
