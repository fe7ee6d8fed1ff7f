//! Verse Engine CLI
//!
//! Command-line access to reference parsing, search, layers and collection
//! import/export against one corpus file and an optional state file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verse_engine::collections::CardOutcome;
use verse_engine::corpus::CorpusIndex;
use verse_engine::persist::JsonFileBackend;
use verse_engine::render::{highlight_markup, MarkupConfig};
use verse_engine::search::{excerpt, SearchQuery, SearchScope};
use verse_engine::{CancellationFlag, EngineError, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "verse-engine", version, about = "Bible reference and annotation tools")]
struct Cli {
    /// Corpus JSON file (overrides VERSE_CORPUS)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// State file for layers, annotations and collections (overrides VERSE_STATE_FILE)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Emit JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a reference such as "John 3:16-18; 4:1"
    Parse { reference: String },

    /// Suggest book names for a prefix
    Suggest { prefix: String },

    /// Search verse text, or note text with --notes
    Search {
        query: String,
        /// Treat the query as a regular expression
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        case_sensitive: bool,
        /// Limit the search to a reference, e.g. "John" or "Psalm 23"
        #[arg(long)]
        within: Option<String>,
        #[arg(long)]
        notes: bool,
        /// Print matches as escaped HTML with <mark> around each hit
        #[arg(long)]
        html: bool,
    },

    /// Import an exported collection file
    Import { file: PathBuf },

    /// Print collections in export form
    Export {
        /// Only this collection
        #[arg(long)]
        id: Option<String>,
    },

    /// List annotation layers
    Layers,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "verse_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<EngineError>() {
            Some(engine) => eprintln!("{}", engine.user_message()),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = SessionConfig::from_env();
    if let Some(corpus) = cli.corpus.clone() {
        config.corpus_path = Some(corpus);
    }
    if let Some(state) = cli.state.clone() {
        config.persistence.state_path = Some(state);
    }

    let corpus_path = config
        .corpus_path
        .clone()
        .ok_or_else(|| anyhow!("no corpus file; pass --corpus or set VERSE_CORPUS"))?;
    let file = std::fs::File::open(&corpus_path)
        .with_context(|| format!("opening corpus {}", corpus_path.display()))?;
    let corpus = CorpusIndex::from_reader(std::io::BufReader::new(file)).map_err(EngineError::from)?;
    tracing::info!(
        translation = corpus.translation(),
        verses = corpus.len(),
        "Loaded corpus"
    );

    let corpus = Arc::new(corpus);
    let mut session = match config.persistence.state_path.clone() {
        Some(path) => Session::open(corpus, config, Arc::new(JsonFileBackend::new(path))).await?,
        None => Session::new(corpus, config)?,
    };

    let result = execute(&mut session, cli.command, cli.json);
    session.close().await?;
    result
}

fn execute(session: &mut Session, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Parse { reference } => {
            let ranges = session.parse(&reference)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ranges)?);
            } else {
                for range in ranges {
                    println!("{}", range);
                }
            }
        }

        Command::Suggest { prefix } => {
            for name in session.suggest_books(&prefix) {
                println!("{}", name);
            }
        }

        Command::Search {
            query,
            regex,
            case_sensitive,
            within,
            notes,
            html,
        } => {
            let mut query = if regex {
                SearchQuery::regex(&query)
            } else {
                SearchQuery::literal(&query)
            };
            query.case_sensitive = case_sensitive;

            if notes {
                let matches = session.search_notes(&query)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&matches)?);
                } else {
                    let snapshot = session.snapshot();
                    for found in matches {
                        let text = snapshot
                            .get(found.annotation_id)
                            .and_then(|a| a.payload().note_text())
                            .unwrap_or_default();
                        let preview = found
                            .spans
                            .first()
                            .map(|span| excerpt(text, *span, 40))
                            .unwrap_or_default();
                        println!("{}  {}", found.range, preview);
                    }
                }
                return Ok(());
            }

            let scope = match within {
                Some(reference) => SearchScope::Range(
                    verse_engine::reference::parse_range(session.corpus(), &reference)
                        .map_err(EngineError::from)?,
                ),
                None => SearchScope::Corpus,
            };
            let matches: Vec<_> = session.search(&query, &scope)?.collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
                return Ok(());
            }
            let markup = MarkupConfig::default();
            for found in &matches {
                let text = session.corpus().text(&found.address).unwrap_or_default();
                let line = if html {
                    highlight_markup(text, &found.spans, &markup).map_err(EngineError::from)?
                } else {
                    text.to_string()
                };
                println!("{}  {}", found.address, line);
            }
            eprintln!("{} verse(s)", matches.len());
        }

        Command::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let report = session.import_collection_json(&data, &CancellationFlag::new())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} added, {} updated, {} unchanged, {} rejected",
                    report.collection_id,
                    report.added(),
                    report.updated(),
                    report.unchanged(),
                    report.rejected()
                );
                for card in &report.cards {
                    if let CardOutcome::Rejected { reasons } = &card.outcome {
                        println!("  card {} rejected: {}", card.index, reasons.join("; "));
                    }
                }
            }
        }

        Command::Export { id } => {
            let exported = match id {
                Some(id) => vec![session
                    .collections()
                    .export_collection(&id.as_str().into())
                    .map_err(EngineError::from)?],
                None => session.collections().export_all(),
            };
            println!("{}", serde_json::to_string_pretty(&exported)?);
        }

        Command::Layers => {
            let snapshot = session.snapshot();
            for layer in snapshot.layers() {
                let count = snapshot.count_in_layer(layer.id);
                if json {
                    println!(
                        "{}",
                        serde_json::json!({ "layer": layer, "annotations": count })
                    );
                } else {
                    let hidden = if layer.visible { "" } else { " (hidden)" };
                    println!("{}  {} [{}] {} annotation(s){}", layer.id, layer.name, layer.color, count, hidden);
                }
            }
        }
    }
    Ok(())
}
