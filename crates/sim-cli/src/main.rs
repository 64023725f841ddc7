mod logging;

use clap::Parser;
use logging::{init_logging, LogArgs};
use sim_fetch::{Fetcher, LocalDirSource};
use sim_runner::{Runner, SimConfig};
use std::io::Write;
use std::path::PathBuf;

/// sim-run: fetch recorded fixtures, replay them against a candidate
/// service, diff the responses against the golden outputs, and report.
#[derive(Debug, clap::Parser)]
#[command(name = "sim-run", author, version)]
struct Cli {
    #[clap(flatten)]
    log_args: LogArgs,

    /// Path to the simulation configuration file.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Base URL of an already-running candidate service.
    #[arg(long = "local-app", conflicts_with = "candidate")]
    local_app: Option<String>,

    /// Alias for --local-app. Container orchestration is out of scope: both
    /// flags take a URL of an already-running service.
    #[arg(long = "candidate")]
    candidate: Option<String>,

    /// Directory holding recorded fixtures (local source).
    #[arg(long = "fixtures", default_value = "./fixtures")]
    fixtures: PathBuf,

    /// Directory to write the report(s) into.
    #[arg(long = "output", default_value = "./sim-report")]
    output: PathBuf,

    #[arg(long = "html")]
    html: bool,

    #[arg(long = "json")]
    json: bool,

    #[arg(long = "verbose")]
    verbose: bool,

    /// Restrict the run to these endpoint names.
    #[arg(long = "endpoints", num_args = 0..)]
    endpoints: Vec<String>,

    /// Write a default configuration file and exit.
    #[arg(long = "init")]
    init: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_args);
    std::process::exit(run(cli).await?);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let Some(config_path) = cli.config.clone() else {
        anyhow::bail!("--config is required unless --init is used with a target path");
    };

    if cli.init {
        return init_config(&config_path);
    }

    if !config_path.exists() {
        tracing::error!(path = %config_path.display(), "configuration file not found");
        return Ok(1);
    }

    let text = std::fs::read_to_string(&config_path)?;
    let config = match SimConfig::from_yaml(&text) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return Ok(1);
        }
    };

    let candidate_url = cli
        .local_app
        .clone()
        .or_else(|| cli.candidate.clone())
        .ok_or_else(|| anyhow::anyhow!("one of --local-app or --candidate is required"))?;

    let fetcher = Fetcher::new(LocalDirSource::new(&cli.fixtures), std::env::temp_dir().join("sim-run-cache"));
    let allowlist = if cli.endpoints.is_empty() { None } else { Some(cli.endpoints.as_slice()) };

    let runner = Runner::default();
    let report = runner.run(&config, &candidate_url, &fetcher, allowlist).await?;

    std::fs::create_dir_all(&cli.output)?;
    if cli.json {
        write_report(&cli.output.join("report.json"), report.to_json().to_string().as_bytes())?;
    }
    if cli.html {
        write_report(&cli.output.join("report.html"), report.render_html().as_bytes())?;
    }
    write_report(&cli.output.join("report.md"), report.render_markdown().as_bytes())?;

    if cli.verbose || !cli.json && !cli.html {
        println!("{}", report.render_markdown());
    }

    Ok(report.exit_code())
}

fn write_report(path: &std::path::Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}

fn init_config(path: &std::path::Path) -> anyhow::Result<i32> {
    if path.exists() {
        tracing::error!(path = %path.display(), "refusing to overwrite existing configuration file");
        return Ok(1);
    }
    let default_yaml = "service: my-service\n\
                         port: 8080\n\
                         endpoints:\n\
                         \x20\x20- name: example_endpoint\n\
                         \x20\x20\x20\x20method: GET\n\
                         \x20\x20\x20\x20path: /example\n\
                         ignore_paths: []\n\
                         money_paths: []\n\
                         money_tolerance: 0.01\n\
                         float_tolerance: 0.000000001\n";
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_yaml)?;
    Ok(0)
}
