//! # docrank CLI
//!
//! Ranks the sections of a document collection for a persona and a
//! job-to-be-done, and writes the top sections plus refined snippets as JSON.
//!
//! ## Usage
//!
//! ```bash
//! docrank [--config ./docrank.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docrank run` | Rank every document in the input directory and write the result |
//! | `docrank sections <file>` | Print the candidate sections of one document |
//! | `docrank models` | List the supported local embedding models |
//!
//! ## Examples
//!
//! ```bash
//! # Rank the PDFs in ./input with the default local model
//! docrank run --persona "Travel Planner" --job "Plan a 4-day trip for 10 friends"
//!
//! # Fully offline smoke run
//! docrank run --embedding-provider hash --output /tmp/result.json
//!
//! # Everything from a config file, one value overridden by the environment
//! DOCRANK_TOP_K=5 docrank --config ./docrank.toml run
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level, default `info`).
//! Fatal errors print one `error: ...` line and exit non-zero: 2 when no
//! readable input exists, 3 when the embedding model cannot be loaded, 1
//! otherwise.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use docrank::config::{self, Config, Overrides};
use docrank::embedding::LOCAL_MODELS;
use docrank::error::DocrankError;
use docrank::extract::{content_type_for_path, read_document, MIME_PDF};
use docrank::input::InputFile;
use docrank::pipeline;
use docrank::sections::{extract_sections, HeuristicSplitter};

/// docrank: persona-driven relevance ranking for document collections.
///
/// Settings come from `--config` (TOML), then flags or `DOCRANK_*`
/// environment variables, which win over the file.
#[derive(Parser)]
#[command(
    name = "docrank",
    about = "docrank: rank document sections by relevance to a persona and a job-to-be-done",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; built-in defaults apply
    /// to anything it leaves out.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank all input documents and write the JSON result.
    Run(RunArgs),

    /// Print the candidate sections extracted from one document.
    ///
    /// Useful for checking how a PDF is segmented before running a ranking.
    Sections {
        /// Path to a `.pdf` or `.txt` file.
        file: PathBuf,
    },

    /// List the local embedding models docrank can load.
    Models,
}

#[derive(Args)]
struct RunArgs {
    /// Directory scanned for input documents.
    #[arg(long, env = "DOCRANK_INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Where the JSON result is written.
    #[arg(long, env = "DOCRANK_OUTPUT")]
    output: Option<PathBuf>,

    /// Who the ranking is for, e.g. "Academic Researcher".
    #[arg(long, env = "DOCRANK_PERSONA")]
    persona: Option<String>,

    /// What the persona is trying to get done.
    #[arg(long, env = "DOCRANK_JOB")]
    job: Option<String>,

    /// Number of sections in `extracted_sections`.
    #[arg(long, env = "DOCRANK_TOP_K")]
    top_k: Option<usize>,

    /// Number of snippets in `subsection_analyses`.
    #[arg(long, env = "DOCRANK_TOP_M")]
    top_m: Option<usize>,

    /// Embedding backend: `local` (pretrained model) or `hash` (offline).
    #[arg(long = "embedding-provider", env = "DOCRANK_EMBEDDING_PROVIDER")]
    provider: Option<String>,

    /// Local model name (see `docrank models`).
    #[arg(long, env = "DOCRANK_MODEL")]
    model: Option<String>,

    /// Directory where model weights are cached.
    #[arg(long, env = "DOCRANK_MODEL_CACHE")]
    model_cache: Option<PathBuf>,
}

impl From<RunArgs> for Overrides {
    fn from(args: RunArgs) -> Self {
        Overrides {
            input_dir: args.input_dir,
            output: args.output,
            persona: args.persona,
            job: args.job,
            top_k: args.top_k,
            top_m: args.top_m,
            provider: args.provider,
            model: args.model,
            model_cache: args.model_cache,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<DocrankError>()
                .map(DocrankError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    if let Commands::Models = cli.command {
        print_models();
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Run(args) => {
            let cfg = cfg.apply(args.into());
            cfg.validate(true)?;
            let summary = pipeline::run(&cfg)?;
            println!("ranked {}", summary.output.display());
            println!(
                "  documents: {} read / {} found",
                summary.documents_read, summary.documents_found
            );
            println!("  sections:  {}", summary.sections);
            println!("  snippets:  {}", summary.snippets);
        }
        Commands::Sections { file } => {
            cfg.validate(false)?;
            print_sections(&cfg, &file)?;
        }
        Commands::Models => {}
    }

    Ok(())
}

fn print_sections(cfg: &Config, path: &Path) -> Result<()> {
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = InputFile {
        path: path.to_path_buf(),
        id,
        content_type: content_type_for_path(path).unwrap_or(MIME_PDF),
    };

    let doc = read_document(&file)?;
    let splitter = HeuristicSplitter::new(&cfg.extraction);
    let sections = extract_sections(&splitter, 0, &doc);

    println!(
        "{}: {} pages, {} sections",
        doc.id,
        doc.pages.len(),
        sections.len()
    );
    for s in &sections {
        println!(
            "  p{:<4} #{:<3} {}  ({} chars)",
            s.page_number,
            s.order.in_page_index,
            s.title,
            s.body.chars().count()
        );
    }
    Ok(())
}

fn print_models() {
    println!("{:<24} {:>5}  REPOSITORY", "MODEL", "DIMS");
    for (name, dims, repo) in LOCAL_MODELS {
        println!("{:<24} {:>5}  {}", name, dims, repo);
    }
}
