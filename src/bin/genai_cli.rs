//! genai-cli: small command-line front end for smoke-testing a key and endpoint.
//!
//! Usage:
//!   genai-cli generate <model> <prompt>     One-shot generation
//!   genai-cli stream <model> <prompt>       Streamed generation, printed as it arrives
//!   genai-cli count <model> <prompt>        Token count for a prompt
//!   genai-cli embed <model> <text>          Embedding dimensionality and head
//!   genai-cli upload <path>                 Upload a file with the resumable protocol
//!   genai-cli files                         List uploaded files
//!   genai-cli batch <name>                  Show a batch job's state

use anyhow::{bail, Context};
use futures::StreamExt;
use genai_wire::types::{CountTokensRequest, Content, EmbedContentRequest, GenerateContentRequest, Model};
use genai_wire::upload::UploadSource;
use genai_wire::GenAiClient;
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genai_wire=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        std::process::exit(1);
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return Ok(());
    }
    if matches!(command.as_str(), "version" | "--version" | "-V") {
        println!("genai-cli {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let client = GenAiClient::from_env().context("building client from environment")?;
    let rest = &args[1..];
    match command.as_str() {
        "generate" => {
            let (model, prompt) = model_and_text(rest)?;
            let resp = client
                .generate_content(&Model::gemini(model), &GenerateContentRequest::user_text(prompt))
                .await?;
            println!("{}", resp.text().unwrap_or_default());
            if let Some(usage) = resp.usage_metadata {
                eprintln!("tokens: {} total", usage.total_token_count);
            }
        }
        "stream" => {
            let (model, prompt) = model_and_text(rest)?;
            let mut stream = client
                .stream_generate_content(&Model::gemini(model), &GenerateContentRequest::user_text(prompt))
                .await?;
            let mut out = std::io::stdout();
            while let Some(chunk) = stream.next().await {
                write!(out, "{}", chunk?.value.text().unwrap_or_default())?;
                out.flush()?;
            }
            writeln!(out)?;
        }
        "count" => {
            let (model, prompt) = model_and_text(rest)?;
            let resp = client
                .count_tokens(
                    &Model::gemini(model),
                    &CountTokensRequest {
                        contents: vec![Content::user(prompt)],
                    },
                )
                .await?;
            println!("{}", resp.total_tokens);
        }
        "embed" => {
            let (model, text) = model_and_text(rest)?;
            let resp = client
                .embed_content(&Model::embedding(model), &EmbedContentRequest::text(text))
                .await?;
            let values = &resp.embedding.values;
            println!("{} dims, head {:?}", values.len(), &values[..values.len().min(4)]);
        }
        "upload" => {
            let Some(path) = rest.first() else {
                bail!("usage: genai-cli upload <path>");
            };
            let file = client.files().upload(UploadSource::from_path(path).await?).await?;
            println!("{} {} {:?}", file.name, file.uri, file.state);
        }
        "files" => {
            let page = client.files().list(Some(50), None).await?;
            for file in page.items {
                println!(
                    "{}\t{:?}\t{}",
                    file.name,
                    file.state,
                    file.display_name.unwrap_or_default()
                );
            }
        }
        "batch" => {
            let Some(name) = rest.first() else {
                bail!("usage: genai-cli batch <name>");
            };
            let job = client.batches().poll(name).await?;
            println!("{}\t{}", job.name, job.state);
            if let Some(err) = job.error {
                println!("{}", err);
            }
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
    Ok(())
}

fn model_and_text(rest: &[String]) -> anyhow::Result<(&str, String)> {
    match rest {
        [model, words @ ..] if !words.is_empty() => Ok((model.as_str(), words.join(" "))),
        _ => bail!("expected <model> <text>"),
    }
}

fn print_usage() {
    println!(
        r#"genai-cli

USAGE:
    genai-cli <COMMAND> [ARGS]

COMMANDS:
    generate <model> <prompt>   One-shot generation
    stream <model> <prompt>     Streamed generation
    count <model> <prompt>      Count prompt tokens
    embed <model> <text>        Embed text
    upload <path>               Upload a file
    files                       List uploaded files
    batch <name>                Show a batch job
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    GEMINI_API_KEY              API key (or GOOGLE_API_KEY)
    GENAI_BASE_URL              REST base URL override
    RUST_LOG                    Log filter, e.g. genai_wire=debug"#
    );
}
