//! Emits simulated, rule-labelled training rows as JSON lines.
//!
//! Environment: `DATASET_SESSIONS` (default 500), `DATASET_SESSION_LENGTH`
//! (default 30), `DATASET_WINDOW` (default 3), `DATASET_SEED` (optional) and
//! `DATASET_OUT` (default stdout).

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;
use tracing_subscriber::fmt::init;

use adaptive_tutor_api::services::training::generate_dataset;

fn env_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

fn main() -> anyhow::Result<()> {
    init();

    let num_sessions: usize = env_or("DATASET_SESSIONS", 500)?;
    let session_length: usize = env_or("DATASET_SESSION_LENGTH", 30)?;
    let window_size: usize = env_or("DATASET_WINDOW", 3)?;
    anyhow::ensure!(window_size > 0, "DATASET_WINDOW must be positive");

    let mut rng = match std::env::var("DATASET_SEED") {
        Ok(seed) => StdRng::seed_from_u64(seed.parse().context("Invalid DATASET_SEED")?),
        Err(_) => StdRng::from_os_rng(),
    };

    let examples = generate_dataset(num_sessions, session_length, window_size, &mut rng);

    let mut out: Box<dyn Write> = match std::env::var("DATASET_OUT") {
        Ok(path) => Box::new(BufWriter::new(
            File::create(&path).with_context(|| format!("Failed to create {}", path))?,
        )),
        Err(_) => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for example in &examples {
        serde_json::to_writer(&mut out, example)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    tracing::info!(
        "Generated {} examples from {} sessions (window={}, length={})",
        examples.len(),
        num_sessions,
        window_size,
        session_length
    );

    Ok(())
}
