use crossterm::{
    cursor,
    event::{read, Event, KeyCode, KeyEventKind},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use log::info;
use lotguard::linear::{TrainingParams, LEARNING_RATE_RANGE, MAX_ITER_RANGE};
use lotguard::{Session, SessionConfig};
use std::error::Error;
use std::io::{stdin, stdout, Stdout, Write};

type CliResult<T> = Result<T, Box<dyn Error>>;

const MENU: [&str; 5] = [
    "  Load data          ",
    "  Train model        ",
    "  Predict            ",
    "  Prediction log     ",
    "  Exit               ",
];

/// Rows of the log shown on the history screen.
const HISTORY_ROWS: usize = 10;

fn main() -> CliResult<()> {
    env_logger::init();

    let config = match std::env::var_os("LOTGUARD_CONFIG") {
        Some(path) => SessionConfig::from_json_file(&path)?,
        None => SessionConfig::default(),
    };
    info!("prediction log at {}", config.log_path.display());
    let mut session = Session::new(config);

    let mut stdout = stdout();
    enable_raw_mode()?;
    execute!(stdout, Clear(ClearType::All), cursor::Hide)?;
    let result = run_menu(&mut stdout, &mut session);

    session.end();
    disable_raw_mode()?;
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::Show,
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print("Session closed.\n"),
        ResetColor
    )?;
    result
}

fn run_menu(stdout: &mut Stdout, session: &mut Session) -> CliResult<()> {
    let mut selected = 0usize;
    loop {
        draw_menu(stdout, session, selected)?;

        if let Event::Key(key) = read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Up => selected = selected.checked_sub(1).unwrap_or(MENU.len() - 1),
                KeyCode::Down => selected = (selected + 1) % MENU.len(),
                KeyCode::Enter => {
                    match selected {
                        0 => load_screen(stdout, session)?,
                        1 => train_screen(stdout, session)?,
                        2 => predict_screen(stdout, session)?,
                        3 => history_screen(stdout, session)?,
                        _ => return Ok(()),
                    }
                    execute!(stdout, Clear(ClearType::All))?;
                }
                KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
                _ => {}
            }
        }
    }
}

fn draw_menu(stdout: &mut Stdout, session: &Session, selected: usize) -> CliResult<()> {
    let dataset = match session.dataset() {
        Some(t) => format!("{} rows loaded", t.nrows()),
        None => "no data".to_string(),
    };
    let model = if session.is_trained() { "model ready" } else { "no model" };
    execute!(
        stdout,
        cursor::MoveTo(4, 2),
        SetForegroundColor(Color::Cyan),
        Print("LotGuard: defective batch prediction"),
        cursor::MoveTo(4, 4),
        SetForegroundColor(Color::DarkGrey),
        Print(format!("{dataset} | {model}    ")),
        cursor::MoveTo(4, 5),
        Print("Use [Up/Down] to navigate, [Enter] to select"),
        ResetColor,
    )?;

    for (i, item) in MENU.iter().enumerate() {
        execute!(stdout, cursor::MoveTo(4, (8 + i * 2) as u16))?;
        if i == selected {
            execute!(
                stdout,
                SetForegroundColor(Color::Green),
                Print(" ► "),
                SetForegroundColor(Color::White),
                Print(item),
                ResetColor
            )?;
        } else {
            execute!(
                stdout,
                SetForegroundColor(Color::DarkGrey),
                Print("   "),
                Print(item),
                ResetColor
            )?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn title(stdout: &mut Stdout, text: &str) -> CliResult<()> {
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Magenta),
        Print(format!("--- {text} ---\r\n\r\n")),
        ResetColor
    )?;
    Ok(())
}

fn line(stdout: &mut Stdout, color: Color, text: impl std::fmt::Display) -> CliResult<()> {
    execute!(
        stdout,
        SetForegroundColor(color),
        Print(format!("{text}\r\n")),
        ResetColor
    )?;
    Ok(())
}

/// Read one line in cooked mode.
fn prompt(stdout: &mut Stdout, label: &str) -> CliResult<String> {
    execute!(stdout, cursor::Show, Print(label))?;
    disable_raw_mode()?;
    let mut buf = String::new();
    let read = stdin().read_line(&mut buf);
    enable_raw_mode()?;
    execute!(stdout, cursor::Hide, cursor::MoveToColumn(0))?;
    read?;
    Ok(buf.trim().to_string())
}

fn prompt_or<T: std::str::FromStr>(stdout: &mut Stdout, label: &str, default: T) -> CliResult<Option<T>>
where
    T: std::fmt::Display,
{
    let raw = prompt(stdout, &format!("{label} [{default}]: "))?;
    if raw.is_empty() {
        return Ok(Some(default));
    }
    Ok(raw.parse().ok())
}

fn wait_for_key(stdout: &mut Stdout) -> CliResult<()> {
    execute!(
        stdout,
        SetForegroundColor(Color::DarkGrey),
        Print("\r\nPress any key to return to the main menu..."),
        ResetColor
    )?;
    loop {
        if let Event::Key(key) = read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(());
            }
        }
    }
}

fn load_screen(stdout: &mut Stdout, session: &mut Session) -> CliResult<()> {
    title(stdout, "Load data")?;
    line(stdout, Color::DarkGrey, "Accepted formats: .csv, .xlsx, .json")?;
    let path = prompt(stdout, "File path: ")?;
    match session.load_data(&path) {
        Ok(table) => {
            line(stdout, Color::Green, format!("Loaded {} rows x {} columns", table.nrows(), table.ncols()))?;
            for row in table.head(5).to_string().lines() {
                line(stdout, Color::White, row)?;
            }
        }
        Err(e) => line(stdout, Color::Red, e)?,
    }
    wait_for_key(stdout)
}

fn train_screen(stdout: &mut Stdout, session: &mut Session) -> CliResult<()> {
    title(stdout, "Train model")?;
    let defaults = session.config().training_params();
    line(
        stdout,
        Color::DarkGrey,
        format!(
            "Learning rate in [{}, {}], iterations in [{}, {}]",
            LEARNING_RATE_RANGE.start(),
            LEARNING_RATE_RANGE.end(),
            MAX_ITER_RANGE.start(),
            MAX_ITER_RANGE.end()
        ),
    )?;
    let learning_rate = prompt_or(stdout, "Learning rate", defaults.learning_rate)?;
    let max_iter = prompt_or(stdout, "Max iterations", defaults.max_iter)?;
    let params = match (learning_rate, max_iter) {
        (Some(learning_rate), Some(max_iter)) => TrainingParams { learning_rate, max_iter },
        _ => {
            line(stdout, Color::Red, "Not a number.")?;
            return wait_for_key(stdout);
        }
    };
    if let Err(e) = params.validate() {
        line(stdout, Color::Red, e)?;
        return wait_for_key(stdout);
    }

    line(stdout, Color::DarkGrey, "Training...")?;
    match session.train(params.learning_rate, params.max_iter) {
        Ok(report) => {
            let trace = &report.trace;
            let every = (trace.len() / 10).max(1);
            for k in (0..trace.len()).filter(|k| (k + 1) % every == 0) {
                let progress = (k + 1) * 20 / trace.len();
                line(
                    stdout,
                    Color::Cyan,
                    format!(
                        "Iter {:5} [{}{}] accuracy {:.4}  loss {:.6}",
                        trace.iterations[k],
                        "█".repeat(progress),
                        " ".repeat(20 - progress),
                        trace.accuracies[k],
                        trace.losses[k]
                    ),
                )?;
            }
            line(
                stdout,
                Color::Green,
                format!(
                    "Trained on {} rows: accuracy {:.4}, loss {:.6}",
                    report.n_train, report.train_accuracy, report.train_loss
                ),
            )?;
            if let Some(acc) = report.test_accuracy {
                line(stdout, Color::Green, format!("Test accuracy on {} rows: {acc:.4}", report.n_test))?;
            }
            if report.step_size < params.learning_rate {
                line(
                    stdout,
                    Color::Yellow,
                    format!("Learning rate capped at {:.6} for stability", report.step_size),
                )?;
            }
        }
        Err(e) => line(stdout, Color::Red, e)?,
    }
    wait_for_key(stdout)
}

fn predict_screen(stdout: &mut Stdout, session: &mut Session) -> CliResult<()> {
    title(stdout, "Predict")?;
    let columns = match session.trained() {
        Some(t) => t.scaler.columns().to_vec(),
        None => {
            line(stdout, Color::Red, "Train a model first.")?;
            return wait_for_key(stdout);
        }
    };

    let mut row = Vec::with_capacity(columns.len());
    for name in &columns {
        match prompt(stdout, &format!("{name}: "))?.parse::<f64>() {
            Ok(v) => row.push(v),
            Err(_) => {
                line(stdout, Color::Red, format!("'{name}' must be a number."))?;
                return wait_for_key(stdout);
            }
        }
    }

    match session.predict(&[row]) {
        Ok(outcome) => {
            for label in &outcome.labels {
                let color = if label.is_defective() { Color::Red } else { Color::Green };
                line(stdout, color, format!("Prediction: {label}"))?;
            }
            if let Some(w) = outcome.warning {
                line(stdout, Color::Yellow, w)?;
            }
        }
        Err(e) => line(stdout, Color::Red, e)?,
    }
    wait_for_key(stdout)
}

fn history_screen(stdout: &mut Stdout, session: &Session) -> CliResult<()> {
    title(stdout, "Prediction log")?;
    let view = session.history();
    if let Some(w) = &view.warning {
        line(stdout, Color::Yellow, w)?;
    }
    match &view.table {
        None => line(stdout, Color::DarkGrey, "No predictions recorded yet.")?,
        Some(table) => {
            line(stdout, Color::White, format!("Time | {} | Prediction", table.feature_names.join(" | ")))?;
            let skip = table.records.len().saturating_sub(HISTORY_ROWS);
            for r in &table.records[skip..] {
                let values: Vec<String> = r.features.iter().map(|v| v.to_string()).collect();
                line(
                    stdout,
                    Color::White,
                    format!("{} | {} | {}", r.timestamp, values.join(" | "), r.label),
                )?;
            }
            line(stdout, Color::Cyan, format!("\r\n{}", view.summary))?;
            if view.summary.needs_attention() {
                line(stdout, Color::Red, "More than half of the logged batches are defective.")?;
            }
        }
    }
    wait_for_key(stdout)
}
