use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ecshell::cli::Cli;
use ecshell::console::{
    history_key, history_path, EditorInput, JsonHistoryStore, QueryConsole, ScriptedInput,
};
use ecshell::db::{DbHandle, OpenMode, StoreKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    let kind = cli.store_kind();
    let color = !cli.no_color && io::stdout().is_terminal();

    // Ask for the open mode only when it was not given and someone can answer
    let opened = match cli.mode {
        Some(mode) => DbHandle::open(&cli.path, kind, mode.into()).map(Some),
        None if cli.schemas => {
            DbHandle::open(&cli.path, kind, OpenMode::ReadOnly).map(Some)
        }
        None if io::stdin().is_terminal() => DbHandle::open_with(&cli.path, kind, prompt_mode),
        None => DbHandle::open(&cli.path, kind, OpenMode::ReadOnly).map(Some),
    };
    let db = match opened {
        Ok(Some(db)) => db,
        // Mode prompt was cancelled
        Ok(None) => return Ok(()),
        Err(e) => {
            report_error(&e.to_string(), color);
            std::process::exit(1);
        }
    };

    let label = format!("{} {}", db.kind(), cli.path.display());
    let mut console = QueryConsole::new(&db, label).with_color(color);
    if let Some(path) = resolve_history_file(cli.history_file.clone()) {
        console = console.with_history_store(
            Box::new(JsonHistoryStore::new(path)),
            history_key(&cli.path),
        );
    }

    let mut stdout = io::stdout().lock();
    if cli.schemas {
        console.list_schemas(&mut stdout)?;
    } else if let Some(query) = &cli.query {
        // Non-interactive mode
        console.run_statement(query, &mut stdout)?;
    } else if io::stdin().is_terminal() {
        // Interactive console
        let mut input = EditorInput::new()?;
        console.run(&mut input, &mut stdout)?;
    } else {
        // Piped input is replayed line by line
        let lines: Vec<String> = io::stdin().lock().lines().collect::<io::Result<_>>()?;
        let mut input = ScriptedInput::lines(lines);
        console.run(&mut input, &mut stdout)?;
    }
    stdout.flush()?;

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

/// `--history-file` wins over the environment; an empty path disables history.
fn resolve_history_file(flag: Option<PathBuf>) -> Option<PathBuf> {
    match flag {
        Some(path) if path.as_os_str().is_empty() => None,
        Some(path) => Some(path),
        None => history_path(),
    }
}

/// Asks which mode to open the file in. Ctrl+C or Ctrl+D backs out.
fn prompt_mode(kind: StoreKind, modes: &[OpenMode]) -> Option<OpenMode> {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            warn!(error = %e, "cannot start line editor");
            return None;
        }
    };

    println!("How should the {} file be opened?", kind);
    for (i, mode) in modes.iter().enumerate() {
        println!("  {}. {}", i + 1, mode.label());
    }

    loop {
        match editor.readline(&format!("Select [1-{}]: ", modes.len())) {
            Ok(line) => {
                let choice = line.trim().parse::<usize>().ok();
                match choice.and_then(|n| n.checked_sub(1)).and_then(|i| modes.get(i)) {
                    Some(mode) => return Some(*mode),
                    None => println!("Please enter a number between 1 and {}.", modes.len()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return None,
            Err(e) => {
                warn!(error = %e, "cannot read mode selection");
                return None;
            }
        }
    }
}

fn report_error(message: &str, color: bool) {
    if color {
        eprintln!("{}", format!("Error: {}", message).red().bold());
    } else {
        eprintln!("Error: {}", message);
    }
}
