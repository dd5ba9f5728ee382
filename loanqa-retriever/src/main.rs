use clap::{Parser, Subcommand};
use loanqa_retriever::config::{RagConfig, create_embedder};
use loanqa_retriever::retrieval::{
    AnswerComposer, IndexBuilder, OpenRouterCompletion, QueryPipeline, Retriever, load_corpus,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// A CLI for the loan-product QA pipeline: build the vector index from a
/// cleaned corpus, then ask questions against it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the pipeline configuration file. Defaults apply when the file
    /// does not exist.
    #[arg(short, long, default_value = "loanqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chunk and embed a cleaned corpus, writing the index artifacts
    Build {
        /// Cleaned corpus file: a JSON array of {url, content} records
        data: PathBuf,
    },
    /// Answer a single question and exit
    Ask {
        /// The question to answer
        question: String,
    },
    /// Interactive question-answering loop
    Chat,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        RagConfig::from_toml_file(&args.config)?
    } else {
        tracing::debug!(
            "Config file {} not found, using defaults",
            args.config.display()
        );
        RagConfig::default()
    }
    .resolve_api_keys_from_env();

    match args.command {
        Commands::Build { data } => {
            let documents = load_corpus(&data)?;
            let embedder = create_embedder(&config.embedding).await?;
            let builder = IndexBuilder::new(embedder, config.chunk_size);

            let (index, store) = builder.build(&documents).await?;
            IndexBuilder::persist(&index, &store, &config.index_path, &config.chunk_store_path)?;
            println!(
                "Indexed {} chunks from {} documents",
                store.len(),
                documents.len()
            );
            Ok(())
        }
        Commands::Ask { question } => {
            let pipeline = open_pipeline(&config).await?;
            let started = Instant::now();
            let answer = pipeline.answer(&question).await?;
            println!("{answer}");
            println!("(answered in {:.2}s)", started.elapsed().as_secs_f64());
            Ok(())
        }
        Commands::Chat => {
            let pipeline = open_pipeline(&config).await?;
            chat_loop(&pipeline).await
        }
    }
}

async fn open_pipeline(config: &RagConfig) -> anyhow::Result<QueryPipeline> {
    let embedder = create_embedder(&config.embedding).await?;
    let retriever = Retriever::load(embedder, &config.index_path, &config.chunk_store_path)?
        .with_max_distance(config.max_distance);

    let composer = match &config.completion {
        Some(completion) => {
            let service = OpenRouterCompletion::new(completion.clone())?;
            AnswerComposer::with_completion(Arc::new(service))
        }
        None => AnswerComposer::local(),
    };
    Ok(QueryPipeline::new(retriever, composer, config.top_k))
}

async fn chat_loop(pipeline: &QueryPipeline) -> anyhow::Result<()> {
    println!("Loan QA ready. Ask a question, or type 'exit' to quit.");
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        let started = Instant::now();
        match pipeline.answer(question).await {
            Ok(answer) => {
                println!("\n{answer}");
                println!("(answered in {:.2}s)\n", started.elapsed().as_secs_f64());
            }
            Err(e) => {
                // Embedding backend down: report and keep the loop alive.
                eprintln!("\nCould not answer: {e}\n");
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}
