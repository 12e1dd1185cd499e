//! # DENSEPACK-RS
//!
//! Random dense packing of spheres inside bounding volumes.
//!
//! ```text
//! densepack [--seed N] [--json FILE | FILE]
//! ```
//!
//! Without a file the session is read interactively from stdin.

use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use densepack_rs::input::{read_config, TokenReader};
use densepack_rs::stochastic::time_seed;
use densepack_rs::*;

/// Where the session configuration comes from
enum Source {
    Interactive,
    Batch(PathBuf),
    Json(PathBuf),
}

struct Args {
    seed: Option<u64>,
    source: Source,
}

fn parse_args(args: &[String]) -> PackResult<Args> {
    let mut seed = None;
    let mut source = Source::Interactive;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--seed" => {
                let value = iter.next().ok_or_else(|| PackError::config("--seed needs a value"))?;
                seed = Some(parse_seed(value)?);
            }
            "--json" => {
                let value = iter.next().ok_or_else(|| PackError::config("--json needs a file"))?;
                source = Source::Json(PathBuf::from(value));
            }
            "-h" | "--help" => {
                println!("usage: densepack [--seed N] [--json FILE | FILE]");
                std::process::exit(0);
            }
            other if other.starts_with("--") => {
                return Err(PackError::config(format!("unknown option {}", other)));
            }
            file => source = Source::Batch(PathBuf::from(file)),
        }
    }
    Ok(Args { seed, source })
}

fn parse_seed(value: &str) -> PackResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| PackError::config(format!("invalid seed '{}'", value)))
}

/// `--seed`, then the environment, then the configuration, then the clock
fn resolve_seed(flag: Option<u64>, config: Option<u64>) -> PackResult<u64> {
    if let Some(seed) = flag {
        return Ok(seed);
    }
    if let Ok(value) = std::env::var(SEED_ENV_VAR) {
        return parse_seed(&value);
    }
    if let Some(seed) = config {
        return Ok(seed);
    }
    let seed = time_seed();
    log::info!("no seed given, using clock seed {} (pass --seed {} to repeat this run)", seed, seed);
    Ok(seed)
}

fn run(args: Args) -> PackResult<()> {
    let config = match &args.source {
        Source::Json(path) => PackingConfig::from_json_file(path)?,
        Source::Batch(path) => PackingConfig::from_batch_file(path)?,
        Source::Interactive => {
            let stdin = io::stdin();
            let mut tokens = TokenReader::interactive(BufReader::new(stdin.lock()), io::stdout());
            read_config(&mut tokens)?
        }
    };

    let seed = resolve_seed(args.seed, config.seed)?;
    log::info!("seed {}", seed);
    for group in &config.groups {
        log::info!(
            "group '{}': {} {} of radius {}",
            group.tag,
            if group.is_fraction() { "packing fraction" } else { "count" },
            group.amount,
            group.radius
        );
    }

    let mut packer = config.packer(seed)?;
    let report = packer.run()?;
    verify_packing(packer.state())?;
    write_distribution(&config.output, packer.registry())?;

    if let Some(refinement) = &report.refinement {
        log::info!(
            "grow-and-shake: {} sweeps, {} growths, {} shakes accepted",
            refinement.sweeps,
            refinement.accepted_growths,
            refinement.accepted_shakes
        );
    }
    log::debug!("{}", serde_json::to_string(&report)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("{}", info().replace('\n', " | "));

    let args: Vec<String> = std::env::args().collect();
    let result = parse_args(&args).and_then(run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
