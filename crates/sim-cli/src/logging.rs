//! Logging setup shared by `sim-run`'s subcommands, modeled on the flow CLIs'
//! shared `init_logging` helper.

#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// Log verbosity: trace|debug|info|warn|error.
    #[arg(long = "log-level", default_value = "warn", global = true)]
    pub level: String,

    /// Force a log format instead of auto-detecting from the terminal.
    #[arg(long = "log-format", value_enum, global = true)]
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
    Color,
}

fn default_log_format() -> LogFormat {
    use std::io::IsTerminal;
    if std::io::stderr().is_terminal() {
        LogFormat::Color
    } else {
        LogFormat::Json
    }
}

pub fn init_logging(args: &LogArgs) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(args.level.as_str())
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_target(false);

    match args.format.unwrap_or_else(default_log_format) {
        LogFormat::Json => {
            builder.json().flatten_event(true).with_current_span(true).with_span_list(false).init();
        }
        LogFormat::Text => {
            builder.compact().with_ansi(false).init();
        }
        LogFormat::Color => {
            builder.compact().with_ansi(true).init();
        }
    }
}
