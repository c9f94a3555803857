//! RAGex — retrieval-augmented document QA, as a CLI and HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use ragex_core::{ConfigOverrides, Provider, RagexConfig};
use ragex_retrieve::QueryIntent;
use state::AppState;

struct CliArgs {
    command: String,
    positional: Vec<String>,
    clear: bool,
    verbose: bool,
    intent: Option<String>,
    data_dir: Option<PathBuf>,
    overrides: ConfigOverrides,
}

fn print_usage() {
    println!("RAGex — retrieval-augmented document QA");
    println!();
    println!("Usage: ragex [options] <command> [args]");
    println!();
    println!("Commands:");
    println!("  serve                       Start the HTTP server");
    println!("  index <path>... [--clear]   Index files or directories");
    println!("  ask <question>              Answer a question from the index");
    println!("  clean                       Remove every chunk from the collection");
    println!("  config                      Show the effective configuration");
    println!("  help                        Show this help message");
    println!();
    println!("Options:");
    println!("  --data-dir <dir>            Data directory (default: $RAGEX_DATA_DIR or ./data)");
    println!("  --provider <groq|ollama>    Override the configured provider");
    println!("  --model <name>              Override the configured model");
    println!("  --offline                   Enable offline mode");
    println!("  --intent <kind>             Force ask intent (factual|summary|description)");
    println!("  --verbose                   Show diagnostic detail on errors");
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        command: String::new(),
        positional: Vec::new(),
        clear: false,
        verbose: false,
        intent: None,
        data_dir: None,
        overrides: ConfigOverrides::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--clear" => parsed.clear = true,
            "--verbose" | "-v" => parsed.verbose = true,
            "--offline" => parsed.overrides.offline_mode = Some(true),
            "--data-dir" => {
                let value = iter.next().ok_or("--data-dir requires a value")?;
                parsed.data_dir = Some(PathBuf::from(value));
            }
            "--provider" => {
                let value = iter.next().ok_or("--provider requires a value")?;
                let provider = Provider::parse(value)
                    .map_err(|_| format!("unknown provider: {}", value))?;
                parsed.overrides.provider = Some(provider);
            }
            "--model" => {
                let value = iter.next().ok_or("--model requires a value")?;
                parsed.overrides.model = Some(value.clone());
            }
            "--intent" => {
                let value = iter.next().ok_or("--intent requires a value")?;
                parsed.intent = Some(value.clone());
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option: {}", flag));
            }
            _ => {
                if parsed.command.is_empty() {
                    parsed.command = arg.clone();
                } else {
                    parsed.positional.push(arg.clone());
                }
            }
        }
    }

    if parsed.command.is_empty() {
        parsed.command = "help".to_string();
    }
    Ok(parsed)
}

fn resolve_data_dir(cli: &CliArgs) -> PathBuf {
    cli.data_dir.clone().unwrap_or_else(|| {
        std::env::var("RAGEX_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"))
    })
}

fn open_store(config: &RagexConfig) -> ragex_core::Result<ragex_store::ChunkStore> {
    ragex_store::ChunkStore::open(
        &config.data_paths.vectordb,
        &config.collection_name,
        config.embedding_dim,
    )
}

fn attach_store(config: &RagexConfig) -> ragex_core::Result<ragex_store::ChunkStore> {
    ragex_store::ChunkStore::attach(
        &config.data_paths.vectordb,
        &config.collection_name,
        config.embedding_dim,
    )
}

fn print_indexing_result(result: &ragex_ingest::IndexingResult) {
    println!("Documents indexed: {}", result.documents_indexed);
    println!("Chunks created:    {}", result.chunks_created);
    println!("Files skipped:     {}", result.files_skipped);
    println!("Cleared:           {}", result.cleared);
    println!("Chunks removed:    {}", result.chunks_removed);
    println!("Index size after:  {}", result.index_size_after);
}

async fn run(cli: &CliArgs) -> ragex_core::Result<()> {
    let data_dir = resolve_data_dir(cli);
    let config = RagexConfig::load(&data_dir, &cli.overrides)?;

    match cli.command.as_str() {
        "serve" => {
            let store = open_store(&config)?;
            let embedder =
                ragex_infer::create_embedder(&data_dir.join("models"), config.embedding_dim);
            let port = config.port;
            let state = Arc::new(AppState::new(config, store, embedder));
            let app = routes::build_router(state);

            let addr = format!("0.0.0.0:{}", port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("RAGex server listening on {}", addr);
            axum::serve(listener, app)
                .await
                .map_err(|e| ragex_core::Error::Internal(e.to_string()))?;
            Ok(())
        }
        "index" => {
            if cli.positional.is_empty() && !cli.clear {
                return Err(ragex_core::Error::Config(
                    "index requires at least one path (or --clear)".to_string(),
                ));
            }
            let store = open_store(&config)?;
            let embedder =
                ragex_infer::create_embedder(&data_dir.join("models"), config.embedding_dim);
            let paths: Vec<PathBuf> = cli.positional.iter().map(PathBuf::from).collect();
            let result =
                ragex_ingest::index_paths(&store, embedder.as_ref(), &paths, cli.clear)?;
            print_indexing_result(&result);
            Ok(())
        }
        "ask" => {
            let question = cli.positional.join(" ");
            if question.trim().is_empty() {
                return Err(ragex_core::Error::Config("ask requires a question".to_string()));
            }
            let store = attach_store(&config)?;
            let embedder =
                ragex_infer::create_embedder(&data_dir.join("models"), config.embedding_dim);

            let intent = cli
                .intent
                .as_deref()
                .and_then(QueryIntent::parse)
                .unwrap_or_else(|| ragex_retrieve::detect_intent(&question));

            let evidence =
                ragex_retrieve::retrieve(&store, embedder.as_ref(), &config, &question)?;
            let orchestrator = ragex_llm::Orchestrator::from_config(&config);
            let answer = ragex_answer::generate_answer(
                &orchestrator,
                &config,
                &question,
                &evidence,
                intent,
            )
            .await?;

            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!();
                println!("Sources:");
                for source in &answer.sources {
                    println!("  {}", source);
                }
            }
            Ok(())
        }
        "clean" => {
            let store = open_store(&config)?;
            let removed = ragex_ingest::clean_index(&store)?;
            println!("Index cleared ({} chunks removed)", removed);
            Ok(())
        }
        "config" => {
            let summary = config.summary();
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_else(|_| summary.to_string())
            );
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}. Use 'ragex help' for usage.", other);
            std::process::exit(2);
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            std::process::exit(2);
        }
    };

    if cli.command == "help" || cli.command == "--help" || cli.command == "-h" {
        print_usage();
        return;
    }

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("{}", e.canonical_message());
        if cli.verbose {
            eprintln!("detail: {}", e);
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_index_with_flags() {
        let cli = parse_args(&args(&["index", "docs/", "notes.txt", "--clear", "--verbose"]))
            .unwrap();
        assert_eq!(cli.command, "index");
        assert_eq!(cli.positional, vec!["docs/", "notes.txt"]);
        assert!(cli.clear);
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = parse_args(&args(&[
            "ask",
            "what is x",
            "--provider",
            "ollama",
            "--model",
            "llama3",
            "--offline",
        ]))
        .unwrap();
        assert_eq!(cli.overrides.provider, Some(Provider::Ollama));
        assert_eq!(cli.overrides.model.as_deref(), Some("llama3"));
        assert_eq!(cli.overrides.offline_mode, Some(true));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        assert!(parse_args(&args(&["serve", "--turbo"])).is_err());
        assert!(parse_args(&args(&["index", "--provider"])).is_err());
    }

    #[test]
    fn test_no_command_defaults_to_help() {
        let cli = parse_args(&[]).unwrap();
        assert_eq!(cli.command, "help");
    }
}
