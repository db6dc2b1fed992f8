use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;
use relay_proxy::http::RELAY_PATH;
use relay_proxy::relay::{RequestDescriptor, ResponseSummary};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Submit one request to a running relay and print its summary", long_about = None)]
struct Cli {
    /// Base URL of the relay.
    #[arg(short, long, default_value = "http://localhost:8080")]
    relay: String,

    /// HTTP method for the outbound call.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Outbound header as "Name: value". Repeatable; a repeated name keeps
    /// its last value.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Target URL the relay should call.
    url: String,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let descriptor = RequestDescriptor {
        method: cli.method,
        url: cli.url,
        headers: cli.headers.into_iter().collect::<HashMap<_, _>>(),
    };

    let endpoint = format!("{}{}", cli.relay.trim_end_matches('/'), RELAY_PATH);
    let res = reqwest::Client::new()
        .post(&endpoint)
        .json(&descriptor)
        .send()
        .await?;

    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text.trim_end());
        }
        return Ok(ExitCode::FAILURE);
    }

    let summary: ResponseSummary = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}
