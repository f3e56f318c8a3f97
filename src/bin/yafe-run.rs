//! Run the engine over a JSON request and print the result.
//!
//! ```text
//! yafe-run request.json
//! cat request.json | yafe-run
//! ```
//!
//! The request is `{symbol, bars, aux?, plan?, config?}`; `plan` defaults
//! to every category. Logs go to stderr, as JSON when
//! `YAFE_LOG_FORMAT=json`; the filter comes from `RUST_LOG` (default
//! `info`).

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yafe::prelude::*;

#[derive(Debug, Deserialize)]
struct Request {
    symbol: String,
    bars: Vec<Bar>,
    #[serde(default)]
    aux: BTreeMap<String, Vec<f64>>,
    #[serde(default = "Plan::all")]
    plan: Plan,
    #[serde(default)]
    config: EngineConfig,
}

#[derive(Debug, Serialize)]
struct Response<'a> {
    result: &'a AnalysisResult,
    diagnostics: &'a Diagnostics,
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("YAFE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn read_request() -> std::result::Result<Request, Box<dyn std::error::Error>> {
    let raw = match std::env::args().nth(1) {
        Some(path) if path != "-" => std::fs::read_to_string(path)?,
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let request = read_request()?;
    tracing::info!(symbol = %request.symbol, bars = request.bars.len(), "request loaded");

    let mut series = TimeSeries::from_bars(request.symbol, &request.bars);
    for (name, values) in request.aux {
        series = series.with_aux(name, values)?;
    }

    let engine = EngineBuilder::new()
        .with_all_defaults()
        .config(request.config)
        .build()?;
    let (result, diagnostics) = engine.run(&series, &request.plan)?;

    let response = Response {
        result: &result,
        diagnostics: &diagnostics,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
