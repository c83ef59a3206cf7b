use anyhow::Context;
use clap::{Parser, ValueEnum};
use selene::ephemeris::ChartCache;
use selene::{CycleError, CycleKind, CycleReport, CycleReporter, HttpOracle, IngressCache, ReportRequest};
use selene_config::SeleneSettings;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Output {
    /// `{ok, data}` object with the full report.
    Json,
    /// Pre-formatted summary only.
    Text,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Request file (JSON object or `key: value` lines). Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Config file (otherwise configs/selene.toml, then built-in defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cycle to report, overriding the request's `cycle` key.
    #[arg(long, value_parser = parse_cycle)]
    cycle: Option<CycleKind>,

    #[arg(long, value_enum, default_value_t = Output::Json)]
    output: Output,
}

fn parse_cycle(raw: &str) -> Result<CycleKind, String> {
    raw.parse::<CycleKind>().map_err(|e| e.to_string())
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Could not read request {}", p.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Could not read request from stdin")?;
            Ok(body)
        }
    }
}

async fn run(
    settings: &SeleneSettings,
    body: &str,
    cycle: Option<CycleKind>,
) -> selene::Result<CycleReport> {
    let mut request = ReportRequest::parse(body)?;
    if let Some(cycle) = cycle {
        request.cycle = cycle;
    }

    let chart_cache = settings.chart_ttl().map(|ttl| Arc::new(ChartCache::new(ttl)));
    let oracle = HttpOracle::new(&settings.oracle_settings(), chart_cache)?;
    log::info!("oracle endpoint {}", oracle.endpoint());

    let reporter = CycleReporter::new(
        Arc::new(oracle),
        Arc::new(IngressCache::new(settings.ingress_ttl())),
    )
    .with_search_configs(settings.lunation_search(), settings.ingress_search());

    reporter
        .build_cycle_report(request.birth, request.as_of, request.location, request.cycle)
        .await
}

fn error_payload(err: &CycleError) -> serde_json::Value {
    json!({
        "ok": false,
        "status": err.status_code(),
        "error": err.to_string(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let settings = selene_config::load_settings(args.config.as_deref())?;
    let body = read_input(args.input.as_deref())?;

    match run(&settings, &body, args.cycle).await {
        Ok(report) => {
            match args.output {
                Output::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "ok": true, "data": report }))?
                ),
                Output::Text => print!("{}", report.summary),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            log::error!("report failed: {}", err);
            println!("{}", serde_json::to_string_pretty(&error_payload(&err))?);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parse_cycle_alias() {
        let args = Args::try_parse_from(["cycle_report", "--cycle", "ingress", "--output", "text"])
            .unwrap();
        assert_eq!(args.cycle, Some(CycleKind::AriesIngress));
        assert_eq!(args.output, Output::Text);
        assert!(args.input.is_none());
    }

    #[test]
    fn unknown_cycle_is_usage_error() {
        assert!(Args::try_parse_from(["cycle_report", "--cycle", "eclipse"]).is_err());
    }

    #[test]
    fn error_payload_carries_status() {
        let err = CycleError::OracleUnavailable {
            message: "connection refused".into(),
        };
        let payload = error_payload(&err);
        assert_eq!(payload["ok"], false);
        assert_eq!(payload["status"], 502);
    }

    #[tokio::test]
    async fn bad_request_fails_before_contacting_oracle() {
        let settings = SeleneSettings::default();
        let err = run(&settings, "as_of_date: 2024-01-01", None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
