//! # Tender Harness CLI (`tender`)
//!
//! Maintains the versioned tender documents and answers questions over
//! them.
//!
//! ## Usage
//!
//! ```bash
//! tender --config ./config/tender.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tender init` | Create the data directory layout and default document config |
//! | `tender update <type> <path>` | Normalize a raw file and make it the current version |
//! | `tender list` | Show current and archived versions per type |
//! | `tender info <type>` | Show configuration and status for one type |
//! | `tender search "<query>"` | Show the ranked chunks retrieval would use |
//! | `tender ask "<question>"` | Answer a question from the current documents |
//! | `tender serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! tender update faq "./raw/FAQs on Electronic Tender (E-Tender).docx"
//! tender update tender_notice "./raw/Aug 2024 Tender Notice.docx"
//! tender ask "What are the eligibility requirements?"
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change verbosity.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tender_harness::assistant::Assistant;
use tender_harness::config;
use tender_harness::server;
use tender_harness::versions::VersionStore;
use tender_harness_core::models::{DocType, SituationalFacts};

/// Tender Harness: versioned hawker-stall tender documents with
/// relevance-weighted question answering.
#[derive(Parser)]
#[command(
    name = "tender",
    about = "Tender Harness: versioned tender documents and question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tender.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create `current/`, `archive/`, and `document_config.json`.
    ///
    /// Idempotent; an existing configuration is kept.
    Init,

    /// Normalize a raw document and make it the current version.
    ///
    /// The previous current version, if any, is archived first.
    Update {
        /// Document type: `faq`, `tender_notice`, or `terms_and_conditions`.
        doc_type: String,
        /// Raw `.txt`, `.md`, or `.docx` file.
        path: PathBuf,
    },

    /// List current and archived versions of every document type.
    List,

    /// Show configuration and status for one document type.
    Info {
        doc_type: String,
    },

    /// Show the chunks retrieval ranks highest for a query.
    Search {
        query: String,

        /// Print the score factors for each result.
        #[arg(long)]
        explain: bool,
    },

    /// Answer a question from the current documents.
    Ask {
        question: String,

        /// Case-specific fact as `label=value` (repeatable).
        #[arg(long = "fact", value_name = "LABEL=VALUE")]
        facts: Vec<String>,
    },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tender_harness=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = VersionStore::open(&cfg.data.dir)?;
            println!("Initialized data directory: {}", store.data_dir().display());
            for doc_type in store.document_types() {
                println!("  {}", doc_type);
            }
        }
        Commands::Update { doc_type, path } => {
            let doc_type: DocType = doc_type.parse()?;
            let store = VersionStore::open(&cfg.data.dir)?;
            let processed = store.update_document(doc_type, &path)?;
            println!(
                "Updated {} from {} ({} bytes, dated {})",
                doc_type,
                path.display(),
                processed.content.len(),
                processed.metadata.date.as_deref().unwrap_or("unknown")
            );
        }
        Commands::List => {
            let store = VersionStore::open(&cfg.data.dir)?;
            for (doc_type, versions) in store.list_documents()? {
                println!("{}:", doc_type);
                match &versions.current {
                    Some(path) => println!("  current: {}", path.display()),
                    None => println!("  current: not available"),
                }
                if versions.archived.is_empty() {
                    println!("  no archived versions");
                } else {
                    println!("  archived:");
                    for path in versions.archived.iter().take(3) {
                        println!("    - {}", path.display());
                    }
                    if versions.archived.len() > 3 {
                        println!("    ... and {} more", versions.archived.len() - 3);
                    }
                }
            }
        }
        Commands::Info { doc_type } => {
            let doc_type: DocType = doc_type.parse()?;
            let store = VersionStore::open(&cfg.data.dir)?;
            let info = store.get_document_info(doc_type)?;
            println!("{}:", info.doc_type);
            println!("  preprocessor: {}", info.config.preprocessor);
            println!("  description: {}", info.config.description);
            println!("  current file: {}", info.config.current_file);
            println!("  current version exists: {}", info.current_version_exists);
            if let Some(updated) = &info.last_updated {
                println!("  last updated: {}", updated);
            }
        }
        Commands::Search { query, explain } => {
            let assistant = Assistant::new(cfg)?;
            let results = assistant.search(&query).await?;
            if results.is_empty() {
                println!("No relevant chunks found.");
            }
            for (i, candidate) in results.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} ({}) chunk {}",
                    i + 1,
                    candidate.composite_score,
                    candidate.chunk.source,
                    candidate.chunk.metadata.doc_type,
                    candidate.chunk.chunk_index
                );
                if explain {
                    let b = &candidate.breakdown;
                    println!(
                        "   similarity={:.3} type={:.2} recency={:.2} intent={:.2}",
                        b.similarity, b.type_weight, b.recency_weight, b.intent_boost
                    );
                }
                let preview: String = candidate.chunk.text.chars().take(160).collect();
                println!("   {}", preview.replace('\n', " "));
            }
        }
        Commands::Ask { question, facts } => {
            let situation = parse_facts(&facts)?;
            let assistant = Assistant::new(cfg)?;
            let answer = assistant.answer(&question, &[], situation.as_ref()).await;
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                println!("Sources:");
                for candidate in &answer.sources {
                    println!(
                        "  - {} ({}) chunk {}",
                        candidate.chunk.source,
                        candidate.chunk.metadata.doc_type,
                        candidate.chunk.chunk_index
                    );
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

fn parse_facts(facts: &[String]) -> anyhow::Result<Option<SituationalFacts>> {
    if facts.is_empty() {
        return Ok(None);
    }
    let mut parsed = Vec::with_capacity(facts.len());
    for fact in facts {
        let (label, value) = fact
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--fact must be LABEL=VALUE, got '{}'", fact))?;
        parsed.push((label.trim().to_string(), value.trim().to_string()));
    }
    Ok(Some(SituationalFacts {
        title: "Provided facts".to_string(),
        facts: parsed,
    }))
}
