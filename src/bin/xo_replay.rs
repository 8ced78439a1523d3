use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use xo_native::{EngineConfig, EngineSession, SessionError, SessionHost, SessionState};

#[derive(Parser, Debug)]
#[command(
    name = "xo_replay",
    about = "Replay a scripted platform callback sequence against a headless xo session"
)]
struct Cli {
    /// JSON array of calls to replay
    #[arg(long)]
    script: PathBuf,
    /// Cache directory handed to the session (snapshots, relative assets)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Engine config file; defaults to xo-config.json in the cache directory
    #[arg(long)]
    config: Option<PathBuf>,
    /// Exit with status 2 if any call fails
    #[arg(long)]
    strict: bool,
    /// Log session activity to stderr
    #[arg(long)]
    verbose: bool,
}

/// One platform callback
#[derive(Deserialize, Debug)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Call {
    Configure {
        scale: f32,
    },
    Initialize {
        width: i32,
        height: i32,
        #[serde(default)]
        scale: Option<f32>,
        #[serde(default)]
        cache_dir: Option<PathBuf>,
    },
    Input {
        #[serde(default = "default_kind")]
        kind: i32,
        xs: Vec<f32>,
        ys: Vec<f32>,
    },
    Step,
    SurfaceLost,
    Asset {
        key: String,
        path: PathBuf,
    },
    Wait {
        ms: u64,
    },
    Teardown {
        #[serde(default)]
        terminating: bool,
    },
}

fn default_kind() -> i32 {
    1
}

impl Call {
    fn name(&self) -> &'static str {
        match self {
            Call::Configure { .. } => "configure",
            Call::Initialize { .. } => "initialize",
            Call::Input { .. } => "input",
            Call::Step => "step",
            Call::SurfaceLost => "surface_lost",
            Call::Asset { .. } => "asset",
            Call::Wait { .. } => "wait",
            Call::Teardown { .. } => "teardown",
        }
    }
}

#[derive(Serialize)]
struct CallRecord<'a> {
    index: usize,
    op: &'a str,
    status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<SessionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        xo_native::init_logging();
    }

    let raw = fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    let calls: Vec<Call> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", cli.script.display()))?;

    let mut host = SessionHost::new();
    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("config file {} does not exist", path.display());
        }
        host = host.with_config(EngineConfig::load_from_file(path));
    }
    if cli.cache_dir.is_some() {
        host.configure(cli.cache_dir.clone(), 1.0)
            .context("configuring cache directory")?;
    }

    let mut failures = 0usize;
    for (index, call) in calls.into_iter().enumerate() {
        let op = call.name();
        let status = match apply(&host, &cli, call) {
            Ok(code) => code,
            Err(err) => {
                failures += 1;
                emit(&host, index, op, err.boundary_code(), Some(err.to_string()))?;
                continue;
            }
        };
        emit(&host, index, op, status, None)?;
    }

    eprintln!("replay finished: {failures} failed call(s)");
    if cli.strict && failures > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::from(0))
    }
}

/// Apply one call; `Ok` carries the boundary status code
fn apply(host: &SessionHost, cli: &Cli, call: Call) -> Result<i32, SessionError> {
    match call {
        Call::Configure { scale } => host.configure(cli.cache_dir.clone(), scale).map(|()| 0),
        Call::Initialize {
            width,
            height,
            scale,
            cache_dir,
        } => host
            .initialize(width, height, scale, cache_dir.as_deref())
            .map(|()| 0),
        Call::Input { kind, xs, ys } => host.submit_input(kind, &xs, &ys).map(|()| 0),
        Call::Step => host.step().map(|result| result.code()),
        Call::SurfaceLost => host.notify_surface_lost().map(|()| 0),
        Call::Asset { key, path } => host.request_asset(&key, &path).map(|()| 0),
        Call::Wait { ms } => {
            thread::sleep(Duration::from_millis(ms));
            Ok(0)
        }
        Call::Teardown { terminating } => host.teardown(i32::from(terminating)).map(|()| 0),
    }
}

fn emit(
    host: &SessionHost,
    index: usize,
    op: &str,
    status: i32,
    error: Option<String>,
) -> Result<()> {
    let (state, frame_count) = host
        .with_session(|session: &EngineSession| (session.state(), session.frame_count()))?
        .unzip();
    let record = CallRecord {
        index,
        op,
        status,
        state,
        frame_count,
        error,
    };
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}
