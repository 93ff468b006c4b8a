use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "PLANBOARD_LOG";

pub fn default_filter(component: &str) -> String {
    format!("info,planboard=debug,{component}=debug")
}

pub fn init_tracing(component: &str) {
    let filter = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(component)));

    // stderr keeps stdout free for JSON output of the CLI.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .try_init();
}
