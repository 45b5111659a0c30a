use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    submit, ClientConfig, PredictionClient, PredictionSession, DEFAULT_ENDPOINT_URL,
};
use shared::{
    domain::{ValidationPolicy, View},
    protocol::PredictionReport,
    url_shape::is_valid_url,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "safeurl", about = "Ask a remote model whether a URL is malicious")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct EndpointArgs {
    #[arg(long, env = "SAFEURL_ENDPOINT", default_value = DEFAULT_ENDPOINT_URL)]
    endpoint: String,
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,
    #[arg(long, default_value = "off", value_parser = parse_policy)]
    policy: ValidationPolicy,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one URL and print the verdict.
    Predict {
        url: String,
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Only run the URL shape check. Exits non-zero when the shape is invalid.
    Check { url: String },
    /// Interactive session: `:info` and `:predict` switch views, any other
    /// line is submitted from the prediction view.
    Shell {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
}

fn parse_policy(raw: &str) -> Result<ValidationPolicy, String> {
    raw.parse().map_err(|e: shared::error::ApiError| e.message)
}

fn build_client(args: &EndpointArgs) -> Result<PredictionClient> {
    let config = ClientConfig {
        endpoint_url: args.endpoint.clone(),
        request_timeout: Duration::from_secs(args.timeout_secs),
        submit_delay: Duration::ZERO,
    };
    PredictionClient::new(config).context("failed to build prediction client")
}

fn print_report(report: &PredictionReport) {
    if let Some(warning) = &report.warning {
        println!("warning: {warning}");
    }
    println!("{}", report.message);
    println!(
        "Submitted URL: {}",
        serde_json::json!({ "url": report.submitted.url })
    );
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Predict {
            url,
            endpoint,
            json,
        } => {
            let client = build_client(&endpoint)?;
            let report = submit(&client, endpoint.policy, &url).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            let failed = report
                .outcome
                .as_ref()
                .map_or(true, |outcome| !outcome.is_verdict());
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Check { url } => {
            if is_valid_url(&url) {
                println!("valid");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("invalid");
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Shell { endpoint } => {
            let client = build_client(&endpoint)?;
            run_shell(&client, endpoint.policy).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_shell(client: &PredictionClient, policy: ValidationPolicy) -> Result<()> {
    let mut session = PredictionSession::new(policy);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{} (:info, :predict, :quit)", session.view());

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":info" => {
                session.navigate(View::ProjectInfo);
                println!("{}", session.view());
            }
            ":predict" => {
                session.navigate(View::UrlPrediction);
                println!("{}", session.view());
            }
            _ => match session.submit(client, line).await {
                Ok(report) => print_report(&report),
                Err(e) => println!("{e}"),
            },
        }
    }
    Ok(())
}
