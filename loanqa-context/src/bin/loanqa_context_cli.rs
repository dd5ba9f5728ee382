use clap::Parser;
use loanqa_context::text::TextChunker;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to chunk cleaned text files into JSON output using loanqa-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source URL to attach to each chunk.
    #[arg(short, long)]
    source_url: Option<String>,

    /// Maximum length for each chunk, in characters.
    #[arg(short, long, default_value_t = 1000)]
    chunk_size: usize,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let file_content = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunker = TextChunker::new(args.chunk_size);
    let chunks = chunker.chunk(&file_content);

    #[derive(Serialize)]
    struct SerializableChunk<'a> {
        sequence: usize,
        source_url: Option<&'a str>,
        text: &'a str,
    }

    let serializable_chunks: Vec<SerializableChunk> = chunks
        .iter()
        .enumerate()
        .map(|(sequence, text)| SerializableChunk {
            sequence,
            source_url: args.source_url.as_deref(),
            text,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&serializable_chunks)?;
    println!("{}", json_output);

    Ok(())
}
