use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use inkwell_core::{DocumentRecord, EngineConfig, Library, Session, TextDocument};

use crate::script::{self, Runner};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Library file holding documents and their undo history
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "INKWELL_STORE",
        default_value = "inkwell.json"
    )]
    pub store: PathBuf,

    /// Undo stack capacity; overrides the capacity stored with a document
    #[arg(long, global = true, value_name = "N", env = "INKWELL_MAX_STACK_SIZE")]
    pub max_stack_size: Option<usize>,

    /// Pause in milliseconds that ends a typing run
    #[arg(long, global = true, value_name = "MS")]
    pub idle_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Cmd {
    /// Create an empty document
    New { title: String },
    /// List documents in the library
    List,
    /// Replay an edit script against a document, then save
    Run {
        /// Document id or title
        document: String,
        /// Script file, or `-` for stdin
        script: String,
    },
    /// Print a document and its undo history
    Show { document: String },
    /// Forget a document's undo history
    ClearHistory { document: String },
}

impl Args {
    pub fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(size) = self.max_stack_size {
            config = config.with_max_stack_size(size);
        }
        if let Some(ms) = self.idle_ms {
            config = config.with_idle_timeout(Duration::from_millis(ms));
        }
        config
    }
}

pub fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run() -> Result<()> {
    run_with_args(Args::parse()).map(|_| ())
}

fn run_with_args(args: Args) -> Result<String> {
    init_logging();
    let output = dispatch(&args)?;
    println!("{}", output);
    Ok(output)
}

fn dispatch(args: &Args) -> Result<String> {
    let config = args.config();
    let path = args.store.as_path();
    match &args.command {
        Cmd::New { title } => {
            let mut library = Library::load(path)?;
            let id = library.create(title.as_str()).id;
            library.save(path)?;
            tracing::info!(%id, %title, "created document");
            Ok(id.to_string())
        }
        Cmd::List => {
            let library = Library::load(path)?;
            let lines: Vec<String> = library
                .documents
                .iter()
                .map(|record| {
                    let history = if record.undo.as_ref().is_some_and(|u| u.has_history()) {
                        "history"
                    } else {
                        "-"
                    };
                    format!("{}\t{}\t{}", record.id, record.title, history)
                })
                .collect();
            Ok(lines.join("\n"))
        }
        Cmd::Run {
            document,
            script: source,
        } => {
            let source = read_script(source)?;
            let actions = script::parse(&source)?;
            let mut library = Library::load(path)?;
            let record = find(&mut library, document)?;
            let mut runner = Runner::new(record, config);
            if let Some(capacity) = args.max_stack_size {
                runner.set_capacity(capacity);
            }
            let transcript = runner.run(&actions)?;
            library.save(path)?;
            Ok(transcript.join("\n"))
        }
        Cmd::Show { document } => {
            let mut library = Library::load(path)?;
            let record = find(&mut library, document)?;
            Ok(describe(record, config, args.max_stack_size))
        }
        Cmd::ClearHistory { document } => {
            let mut library = Library::load(path)?;
            let record = find(&mut library, document)?;
            record.clear_undo_state();
            let title = record.title.clone();
            library.save(path)?;
            Ok(format!("cleared history of {title}"))
        }
    }
}

fn find<'a>(library: &'a mut Library, key: &str) -> Result<&'a mut DocumentRecord> {
    library
        .find_mut(key)
        .ok_or_else(|| anyhow!("no document `{key}`"))
}

fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(Path::new(source))
        .with_context(|| format!("reading script {source}"))
}

fn describe(record: &mut DocumentRecord, config: EngineConfig, capacity: Option<usize>) -> String {
    let mut session = Session::open(record, config);
    if let Some(capacity) = capacity {
        session.set_capacity(capacity);
    }
    let doc = session.document();
    let mut out = vec![
        format!("{} ({})", record.title, record.id),
        doc.text(),
        String::new(),
    ];
    let styled: Vec<String> = doc
        .styles()
        .iter()
        .filter(|run| !run.attrs.is_empty())
        .map(|run| format!("{}({})", run.attrs.to_names().join("+"), run.len))
        .collect();
    if !styled.is_empty() {
        out.push(format!("styles: {}", styled.join(", ")));
    }
    let labels = session.engine().undo_labels();
    if labels.is_empty() {
        out.push("undo: (empty)".into());
    } else {
        out.push(format!("undo: {}", labels.join(", ")));
    }
    out.join("\n")
}
