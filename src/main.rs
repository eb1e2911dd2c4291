//! CLI entry point for docent.
//!
//! Commands build the index from a document folder, query it, answer
//! questions with citations and serve the same operations over HTTP.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use docent::config::{CONFIG_DIR, SETTINGS_FILE};
use docent::display::{self, StageProgress, THEME};
use docent::io::{ExitCode, JsonResponse};
use docent::{
    AnswerGenerator, Answerer, ChatGenerator, DocumentLoader, EmbeddingClient, IndexHandle,
    IngestionPipeline, RagError, RagResult, RetrievalService, Settings,
};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Ask questions about your documents
#[derive(Parser)]
#[command(
    name = "docent",
    version = env!("CARGO_PKG_VERSION"),
    about = "Ask questions about a folder of documents",
    long_about = "Build a semantic index over PDF and text documents, then retrieve passages or get cited answers.",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ docent init\n  $ docent ingest data/docs\n  $ docent ask \"What is the notice period?\""
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create .docent/settings.toml with default configuration")]
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    #[command(about = "Display the effective settings")]
    Config,

    #[command(about = "Build the index from a document directory")]
    Ingest {
        /// Directory to ingest (defaults to ingest.source_dir)
        source: Option<PathBuf>,

        /// Include subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    #[command(
        about = "Show the chunks most similar to a query",
        after_help = "Examples:\n  docent retrieve \"termination clause\"\n  docent retrieve \"termination clause\" -k 8 --json"
    )]
    Retrieve {
        query: String,

        /// Number of chunks to return
        #[arg(short, long)]
        k: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Answer a question from the indexed documents (interactive without QUESTION)")]
    Ask {
        question: Option<String>,

        /// Number of chunks given to the model
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the retrieved chunks after the answer
        #[arg(long)]
        show_context: bool,
    },

    #[command(about = "Show statistics about the index")]
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    #[command(about = "Check connectivity to the embedding and chat endpoints")]
    Check,

    #[command(about = "Serve /ask, /retrieve and /health over HTTP")]
    Serve {
        /// Address to bind (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };
    init_tracing(settings.debug || cli.verbose);

    let code = match run(cli.command, settings) {
        Ok(code) => code,
        Err(e) => fail(&e),
    };
    code.exit();
}

fn load_settings(path: Option<&Path>) -> RagResult<Settings> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Prints the error with its suggestions and exits with its category code.
fn fail(error: &RagError) -> ! {
    eprintln!("{}", THEME.error_with_icon(&error.to_string()));
    for suggestion in error.recovery_suggestions() {
        eprintln!("  {}", THEME.apply(&THEME.dim, format!("hint: {suggestion}")));
    }
    ExitCode::from_error(error).exit()
}

fn run(command: Commands, settings: Settings) -> RagResult<ExitCode> {
    match command {
        Commands::Init { force } => {
            let cwd = std::env::current_dir().map_err(|e| RagError::io(".", e))?;
            let path = Settings::init_config_file(&cwd, force)?;
            println!(
                "{}",
                THEME.success_with_icon(&format!("Created configuration file at {}", path.display()))
            );
            println!("Set the API key variable named by embedding.api_key_env before ingesting.");
            Ok(ExitCode::Success)
        }
        Commands::Config => {
            if settings.workspace_root.is_none() {
                eprintln!(
                    "{}",
                    THEME.warning_with_icon(&format!(
                        "No {CONFIG_DIR}/{SETTINGS_FILE} found; showing defaults. Run 'docent init' to create one."
                    ))
                );
            }
            print!("{}", settings.to_toml()?);
            Ok(ExitCode::Success)
        }
        Commands::Ingest { source, recursive } => ingest(&settings, source, recursive),
        Commands::Retrieve { query, k, json } => retrieve(&settings, &query, k, json),
        Commands::Ask {
            question,
            k,
            show_context,
        } => ask(&settings, question, k, show_context),
        Commands::Info { json } => info(&settings, json),
        Commands::Check => check(&settings),
        Commands::Serve { bind } => serve(&settings, bind),
    }
}

fn ingest(settings: &Settings, source: Option<PathBuf>, recursive: bool) -> RagResult<ExitCode> {
    let source = source.unwrap_or_else(|| match &settings.workspace_root {
        Some(root) if settings.ingest.source_dir.is_relative() => {
            root.join(&settings.ingest.source_dir)
        }
        _ => settings.ingest.source_dir.clone(),
    });
    let index_path = settings.resolved_index_path();

    let client = EmbeddingClient::from_config(&settings.embedding)?;
    let mut pipeline = IngestionPipeline::from_settings(settings, client)?;
    if recursive {
        pipeline = pipeline.with_loader(
            DocumentLoader::from_config(&settings.ingest).recursive(true),
        );
    }

    let mut progress = StageProgress::new();
    let mut last = None;
    let result = pipeline.ingest_with_progress(&source, &index_path, &mut |report| {
        progress.update(report);
        last = Some(report.clone());
    });

    match result {
        Ok(report) => {
            println!("{}", display::ingest_report_table(&report));
            if !report.skipped.is_empty() {
                println!("{}", display::skipped_table(&report));
            }
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Indexed {} chunks into {}",
                    report.chunks,
                    index_path.display()
                ))
            );
            Ok(ExitCode::Success)
        }
        Err(e) => {
            progress.fail();
            if let Some(report) = last {
                eprintln!("{}", display::ingest_report_table(&report));
            }
            Err(e)
        }
    }
}

fn retrieval_service(settings: &Settings) -> RagResult<RetrievalService> {
    let client = EmbeddingClient::from_config(&settings.embedding)?;
    Ok(RetrievalService::from_settings(settings, client))
}

fn retrieve(settings: &Settings, query: &str, k: Option<usize>, json: bool) -> RagResult<ExitCode> {
    let service = retrieval_service(settings)?;
    let results = match service.retrieve(query, k) {
        Ok(results) => results,
        Err(e) if json => {
            JsonResponse::from_error(&e).print();
            return Ok(ExitCode::from_error(&e));
        }
        Err(e) => return Err(e),
    };

    let code = ExitCode::from_results(&results);
    if json {
        JsonResponse::success(&results, code).print();
    } else if results.is_empty() {
        println!("{}", THEME.warning_with_icon("The index is empty"));
    } else {
        println!("{}", display::results_table(&results));
    }
    Ok(code)
}

fn answerer(settings: &Settings) -> RagResult<Answerer> {
    let generator = ChatGenerator::from_config(&settings.generation)?;
    Ok(Answerer::new(retrieval_service(settings)?, Arc::new(generator)))
}

fn ask(
    settings: &Settings,
    question: Option<String>,
    k: Option<usize>,
    show_context: bool,
) -> RagResult<ExitCode> {
    let answerer = answerer(settings)?;

    if let Some(question) = question {
        answer_one(&answerer, &question, k, show_context)?;
        return Ok(ExitCode::Success);
    }

    let stdin = std::io::stdin();
    loop {
        print!("\nAsk a question (or 'exit'): ");
        std::io::stdout()
            .flush()
            .map_err(|e| RagError::io("<stdout>", e))?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| RagError::io("<stdin>", e))?;
        let question = line.trim();
        if read == 0 || matches!(question, "exit" | "quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        // A failed question does not end the session
        if let Err(e) = answer_one(&answerer, question, k, show_context) {
            eprintln!("{}", THEME.error_with_icon(&e.to_string()));
        }
    }
    Ok(ExitCode::Success)
}

fn answer_one(
    answerer: &Answerer,
    question: &str,
    k: Option<usize>,
    show_context: bool,
) -> RagResult<()> {
    let answer = display::with_spinner("Thinking", || answerer.ask(question, k))?;
    println!("\n{}", answer.answer);
    if show_context && !answer.chunks.is_empty() {
        println!("\n{}", THEME.apply(&THEME.header, "Retrieved context"));
        println!("{}", display::results_table(&answer.chunks));
    }
    Ok(())
}

fn info(settings: &Settings, json: bool) -> RagResult<ExitCode> {
    let handle = IndexHandle::new(settings.resolved_index_path());
    let stats = match handle.get() {
        Ok(index) => index.stats(),
        Err(e) if json => {
            JsonResponse::from_error(&e).print();
            return Ok(ExitCode::from_error(&e));
        }
        Err(e) => return Err(e),
    };

    if json {
        JsonResponse::success(&stats, ExitCode::Success).print();
    } else {
        println!(
            "{} {}",
            THEME.apply(&THEME.header, "Index"),
            THEME.apply(&THEME.source, handle.path().display())
        );
        println!("{}", display::index_stats_table(&stats));
        if let Some(expected) = settings.embedding.dimension {
            if expected != stats.dimension {
                println!(
                    "{}",
                    THEME.warning_with_icon(&format!(
                        "embedding.dimension is {expected} but the index holds {}-dimensional vectors",
                        stats.dimension
                    ))
                );
            }
        }
    }
    Ok(ExitCode::Success)
}

fn check(settings: &Settings) -> RagResult<ExitCode> {
    let mut failures: Vec<RagError> = Vec::new();

    print!("Embeddings ({}) ... ", settings.embedding.model);
    let embedded = EmbeddingClient::from_config(&settings.embedding)
        .and_then(|client| client.embed_one("test sentence for embedding"));
    match embedded {
        Ok(vector) => println!("{}", THEME.success_with_icon(&format!("OK (dim={})", vector.len()))),
        Err(e) => {
            println!("{}", THEME.error_with_icon(&e.to_string()));
            failures.push(e);
        }
    }

    print!("Chat ({}) ... ", settings.generation.model);
    let replied =
        ChatGenerator::from_config(&settings.generation).and_then(|generator| generator.ping());
    match replied {
        Ok(reply) => {
            let reply: String = reply.chars().take(50).collect();
            println!("{}", THEME.success_with_icon(&format!("OK (reply: {reply:?})")));
        }
        Err(e) => {
            println!("{}", THEME.error_with_icon(&e.to_string()));
            failures.push(e);
        }
    }

    Ok(failures
        .first()
        .map_or(ExitCode::Success, ExitCode::from_error))
}

#[cfg(feature = "http-server")]
fn serve(settings: &Settings, bind: Option<String>) -> RagResult<ExitCode> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
    let answerer = answerer(settings)?;

    // Surface a missing or mismatched index before accepting requests
    if let Err(e) = answerer.retrieval().stats() {
        eprintln!("{}", THEME.warning_with_icon(&e.to_string()));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| RagError::io("<runtime>", e))?;
    match runtime.block_on(docent::server::serve(answerer, &bind)) {
        Ok(()) => Ok(ExitCode::Success),
        Err(e) => match e.downcast::<RagError>() {
            Ok(rag) => Err(rag),
            Err(other) => {
                eprintln!("{}", THEME.error_with_icon(&format!("Server error: {other:#}")));
                Ok(ExitCode::GeneralError)
            }
        },
    }
}

#[cfg(not(feature = "http-server"))]
fn serve(_settings: &Settings, _bind: Option<String>) -> RagResult<ExitCode> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    Ok(ExitCode::GeneralError)
}
