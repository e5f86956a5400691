use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use match_edge::payload::FixtureInput;
use match_edge::synthetic::synthetic_slate;
use match_edge::{analyze_slate, engine_config};

const DEMO_SEED: u64 = 2024;

enum Source {
    File(PathBuf),
    Demo(usize),
}

fn parse_args() -> Result<Source> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("--demo") => {
            let n = match args.next() {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("invalid fixture count {raw:?}"))?,
                None => 10,
            };
            Ok(Source::Demo(n))
        }
        Some(path) if !path.starts_with("--") => Ok(Source::File(PathBuf::from(path))),
        Some(flag) => bail!("unknown flag {flag}; usage: analyze <slate.json> | --demo [N]"),
        None => Ok(Source::File(PathBuf::from("tests/fixtures/slate.json"))),
    }
}

fn load_slate(path: &Path) -> Result<Vec<FixtureInput>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid slate json in {}", path.display()))
}

// Offline runner for tuning: no network, one slate in, JSON results out.
fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let slate = match parse_args()? {
        Source::File(path) => load_slate(&path)?,
        Source::Demo(n) => synthetic_slate(n, DEMO_SEED),
    };
    let cfg = engine_config();
    info!(fixtures = slate.len(), parallelism = cfg.parallelism, "analysing slate");

    let results = analyze_slate(&slate, cfg);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
