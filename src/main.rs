//! polynotes - Command Line Entry Point
//!
//! Loads a note, runs one render pass with the caret at the requested offset
//! and prints the document as displayed, or the raw highlight classes.

use clap::Parser;
use log::{debug, error, info};
use polynotes::config::{load_config, load_config_from, save_config_silent, Settings};
use polynotes::markdown::highlight_document;
use polynotes::{Error, NoteEditor, Result, RopeSurface};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Application name constant.
const APP_NAME: &str = "polynotes";

/// polynotes CLI arguments
///
/// Examples:
///   polynotes todo.md                 # Render with the caret at the end
///   polynotes todo.md --cursor 0      # Caret at the start of the note
///   polynotes todo.md --highlight     # Raw highlight classes per line
///   polynotes todo.md --save-config   # Also write config.json with defaults filled in
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "polynotes",
    version,
    about = "Render markdown notes inline, the way the live editor shows them"
)]
struct CliArgs {
    /// Note file to render
    #[clap(help = "Markdown note to render")]
    file: PathBuf,

    /// Caret offset in characters
    ///
    /// Constructs containing the caret stay raw. Defaults to the end of the
    /// note.
    #[clap(long = "cursor", short = 'c', help = "Caret offset in characters")]
    cursor: Option<usize>,

    /// Print highlight classes instead of the rendered note
    #[clap(long = "highlight", help = "Print raw highlight classes per line")]
    highlight: bool,

    /// Use this config file instead of the default location
    #[clap(long = "config", help = "Path to a config.json to use")]
    config: Option<PathBuf>,

    /// Write the effective settings to the default config location
    #[clap(long = "save-config", help = "Persist the effective settings")]
    save_config: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    debug!("{} arguments: {:?}", APP_NAME, args);

    match run(&args) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}: {}", APP_NAME, e);
            ExitCode::from(1)
        }
    }
}

fn run(args: &CliArgs) -> Result<String> {
    let settings: Settings = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    if args.save_config {
        save_config_silent(&settings);
    }

    let text = fs::read_to_string(&args.file).map_err(|source| Error::NoteRead {
        path: args.file.clone(),
        source,
    })?;
    info!("Loaded {} ({} bytes)", args.file.display(), text.len());

    if args.highlight {
        return Ok(format_highlight(&text));
    }

    let mut note = NoteEditor::new(RopeSurface::from_str(&text), &settings)?;
    let cursor = args.cursor.unwrap_or_else(|| note.surface().len_chars());
    note.set_cursor_offset(cursor)?;
    note.pump_events();
    note.update_rendering();

    info!("{} decorations rendered", note.snapshot().len());
    Ok(note.surface().rendered_view())
}

/// One output line per source line: the line number, then each styled
/// column range with its classes.
fn format_highlight(text: &str) -> String {
    highlight_document(text)
        .into_iter()
        .map(|line| {
            let spans: Vec<String> = line
                .spans
                .iter()
                .map(|span| format!("{}..{} {}", span.start, span.end, span.style))
                .collect();
            format!("{}: {}\n", line.line + 1, spans.join(", "))
        })
        .collect()
}
