use std::io::Write;

use clap::Parser;
use clap::Subcommand;
use futures::StreamExt;
use shelterrag::api::server::build_state;
use shelterrag::api::server::serve_api;
use shelterrag::config::AppConfig;
use shelterrag::models::Language;
use shelterrag::models::StreamEvent;
use shelterrag::rag::ChatTurn;
use shelterrag::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "shelterrag")]
#[command(about = "Location-aware chat assistant for Uppsala emergency shelters")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Enable permissive CORS headers
        #[arg(long)]
        cors: bool,
    },
    /// Ask a single question and stream the answer to stdout
    Ask {
        /// The question to ask
        question: String,
        /// Response language (sv/en)
        #[arg(short, long, default_value = "sv")]
        language: String,
        /// Maximum number of context documents
        #[arg(long)]
        max_docs: Option<usize>,
    },
    /// Retrieve shelter records without generating an answer
    Search {
        /// Search text
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
    /// Geocode a place name within the configured region
    Geocode {
        /// Place name to resolve
        place: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    if cli.verbose {
        shelterrag::logging::init_logging_with_level("debug")?;
    } else {
        shelterrag::logging::init_logging(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Serve { host, port, cors } => {
            serve_api(&config, host, port, cors).await?;
        }
        Commands::Ask {
            question,
            language,
            max_docs,
        } => {
            handle_ask_command(&config, question, &language, max_docs).await?;
        }
        Commands::Search { query, limit } => {
            handle_search_command(&config, &query, limit).await?;
        }
        Commands::Geocode { place } => {
            handle_geocode_command(&config, &place).await?;
        }
    }

    Ok(())
}

async fn handle_ask_command(
    config: &AppConfig,
    question: String,
    language: &str,
    max_docs: Option<usize>,
) -> Result<()> {
    let state = build_state(config)?;
    let language = Language::from_code(language);

    let location = match state.extractor.extract(&question) {
        Some(place) => state.resolver.resolve(&place).await,
        None => None,
    };

    let turn = ChatTurn {
        question,
        history: Vec::new(),
        language,
        max_docs: max_docs.unwrap_or(state.default_max_docs),
        location,
    };

    let stream = state.rag.stream(turn);
    futures::pin_mut!(stream);

    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Context { message, .. } => {
                println!("{message}\n");
            }
            StreamEvent::Chunk { text } => {
                print!("{text}");
                stdout.flush()?;
            }
            StreamEvent::Sources { sources } => {
                println!("\n");
                for (index, source) in sources.iter().enumerate() {
                    let name = source.name.as_deref().unwrap_or(&source.id);
                    match source.distance_km {
                        Some(distance) => {
                            println!("  [{}] {} ({distance:.1} km)", index + 1, name);
                        }
                        None => println!("  [{}] {}", index + 1, name),
                    }
                }
            }
            StreamEvent::Error { message } => {
                eprintln!("{message}");
                break;
            }
            StreamEvent::Done => break,
        }
    }

    Ok(())
}

async fn handle_search_command(config: &AppConfig, query: &str, limit: usize) -> Result<()> {
    let state = build_state(config)?;
    let results = state.rag.search(query, limit, None).await;

    if results.is_empty() {
        println!("No matching shelters found.");
        return Ok(());
    }

    for (index, source) in results.iter().enumerate() {
        let name = source.name.as_deref().unwrap_or(&source.id);
        println!("[{}] {} (score: {:.3})", index + 1, name, source.score);
        if let Some(address) = &source.address {
            println!("    {address}");
        }
        if let Some(capacity) = source.capacity {
            println!("    Capacity: {capacity}");
        }
        println!("    {}", source.snippet);
    }

    Ok(())
}

async fn handle_geocode_command(config: &AppConfig, place: &str) -> Result<()> {
    let state = build_state(config)?;

    match state.resolver.resolve(place).await {
        Some(location) => {
            println!("{}", location.display_name);
            println!("  place:     {}", location.place_name);
            println!("  latitude:  {:.6}", location.latitude);
            println!("  longitude: {:.6}", location.longitude);
        }
        None => println!("No match for '{place}'."),
    }

    Ok(())
}
