//! Markdown Bridge command line
//!
//! Entry point. Handles CLI argument parsing, logging initialization and
//! dispatch to the library.

use anyhow::{bail, Context};
use markdown_bridge::config::Config;
use markdown_bridge::file_handler::{read_file, write_file_atomic, FileWatcher, WatchEvent};
use markdown_bridge::persistence::{DocumentFile, PersistenceStore};
use markdown_bridge::session::Notice;
use markdown_bridge::{RenderPipeline, Session};
use std::path::PathBuf;

/// Application name for logging
const APP_NAME: &str = "markdown-bridge";

/// What the user asked for
#[derive(Debug)]
enum Command {
    /// Print the rendered HTML of a Markdown file
    Render { file: PathBuf },
    /// Open a Markdown file into a host document
    Open {
        file: PathBuf,
        document: PathBuf,
        watch: bool,
    },
    /// Print or write the Markdown stored in a host document
    Extract {
        document: PathBuf,
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let command = parse_args();
    let config = load_config();
    log::debug!("Running {:?}", command);

    match command {
        Command::Render { file } => render(&config, file).await,
        Command::Open {
            file,
            document,
            watch,
        } => open(config, file, document, watch).await,
        Command::Extract { document, output } => extract(&config, document, output).await,
    }
}

/// Initialize the logging system
fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,markdown_bridge=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

/// Load configuration, falling back to defaults
fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}; using default configuration", e);
            Config::default()
        }
    }
}

async fn render(config: &Config, file: PathBuf) -> anyhow::Result<()> {
    let source = read_file(&file, config.files.max_file_size)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("reading {}", file.display()))?;
    let html = RenderPipeline::new(&config.render).render(&source.content);
    print!("{}", html);
    Ok(())
}

async fn open(config: Config, file: PathBuf, document_path: PathBuf, watch: bool) -> anyhow::Result<()> {
    let document = DocumentFile::open(&document_path)
        .with_context(|| format!("opening document {}", document_path.display()))?;
    let watch_debounce = config.files.watch_debounce_ms;
    let watch = watch && config.files.watch_files;

    let (mut session, _surface) = Session::connect(config, Box::new(document))?;
    log::info!("Session {} started", session.id());

    session.open_file(&file).await?;
    session.refresh_body()?;
    println!(
        "Stored {} in {}",
        file.display(),
        document_path.display()
    );

    if !watch {
        return Ok(());
    }

    let mut watcher = FileWatcher::new(&file, watch_debounce)?;
    println!("Watching {} (Ctrl+C to stop)", watcher.target().display());

    loop {
        tokio::select! {
            change = watcher.next() => match change {
                Some(WatchEvent::Modified(_)) => {
                    session.reload_from_disk().await?;
                    session.refresh_body()?;
                }
                Some(WatchEvent::Removed(path)) => {
                    log::warn!("{} was removed; keeping the stored copy", path.display());
                }
                None => break,
            },
            alive = session.next_message() => {
                if !alive? {
                    bail!("preview surface stopped unexpectedly");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }

        while let Some(notice) = session.take_notice() {
            report(&notice);
        }
    }
    Ok(())
}

fn report(notice: &Notice) {
    match notice {
        Notice::InitFailed(message) => eprintln!("{}", message),
        Notice::ReloadedExternally(path) => println!("Reloaded {}", path.display()),
        Notice::ExternalConflict(path) => eprintln!(
            "{} changed on disk but has unsaved edits; keeping the current text",
            path.display()
        ),
    }
}

async fn extract(config: &Config, document_path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let document = DocumentFile::open(&document_path)
        .with_context(|| format!("opening document {}", document_path.display()))?;
    let store = PersistenceStore::new(&config.persistence);

    let Some(text) = store.load(&document) else {
        bail!("{} contains no stored Markdown", document_path.display());
    };

    match output {
        Some(path) => {
            write_file_atomic(&path, &text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Parse command line arguments
fn parse_args() -> Command {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut positional = Vec::new();
    let mut document = None;
    let mut output = None;
    let mut watch = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--document" => {
                document = Some(PathBuf::from(value_for(&args, i, "--document")));
                i += 1;
            }
            "-o" | "--output" => {
                output = Some(PathBuf::from(value_for(&args, i, "--output")));
                i += 1;
            }
            "-w" | "--watch" => watch = true,
            arg if arg.starts_with('-') => usage_error(&format!("Unknown option: {}", arg)),
            arg => positional.push(arg.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    match positional.next().as_deref() {
        Some("render") => Command::Render {
            file: positional
                .next()
                .map(PathBuf::from)
                .unwrap_or_else(|| usage_error("render requires a FILE")),
        },
        Some("open") => Command::Open {
            file: positional
                .next()
                .map(PathBuf::from)
                .unwrap_or_else(|| usage_error("open requires a FILE")),
            document: document.unwrap_or_else(|| usage_error("open requires --document DOC")),
            watch,
        },
        Some("extract") => Command::Extract {
            document: document.unwrap_or_else(|| usage_error("extract requires --document DOC")),
            output,
        },
        Some(other) => usage_error(&format!("Unknown command: {}", other)),
        None => {
            print_help();
            std::process::exit(1);
        }
    }
}

fn value_for<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value.as_str(),
        None => usage_error(&format!("{} requires a path argument", flag)),
    }
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    eprintln!("Use --help for usage information");
    std::process::exit(1);
}

/// Print help message
fn print_help() {
    println!(
        r#"Markdown Bridge - Markdown source of record for host documents

USAGE:
    markdown-bridge <COMMAND> [OPTIONS]

COMMANDS:
    render FILE                     Print FILE rendered to HTML
    open FILE --document DOC        Store FILE in DOC and refresh its rendered body
    extract --document DOC          Print the Markdown stored in DOC

OPTIONS:
    -d, --document DOC  Host document container (created if missing)
    -o, --output FILE   Write extracted Markdown to FILE instead of stdout
    -w, --watch         With open: follow external changes to FILE
    -h, --help          Show this help message
    -v, --version       Show version information

ENVIRONMENT:
    RUST_LOG            Log filter (default: info,markdown_bridge=debug)
"#
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
