//! UberMelon server binary.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use tokio::net::TcpListener;

use ubermelon::telemetry::parse_level;
use ubermelon::{AppConfig, AppState};

#[derive(Parser, Debug)]
#[command(name = "ubermelon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "UberMelon - the most loved melons", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Testing mode: no request tracing, error details in responses.
    /// The env var accepts 1/0, yes/no, on/off as well as true/false.
    #[arg(long, env = "UBERMELON_TESTING", value_parser = BoolishValueParser::new())]
    testing: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    ubermelon::init_tracing(args.json, parse_level(&args.log_level));

    let config = if args.testing {
        AppConfig::testing()
    } else {
        AppConfig::default()
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    ubermelon::serve(listener, AppState::new(config))
        .await
        .context("UberMelon server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-driven parsing lives in one test so nothing else races on the variables.
    #[test]
    fn test_testing_flag_from_env() {
        std::env::remove_var("PORT");

        std::env::set_var("UBERMELON_TESTING", "1");
        let args = Args::try_parse_from(["ubermelon"]).unwrap();
        assert!(args.testing);

        std::env::set_var("UBERMELON_TESTING", "0");
        let args = Args::try_parse_from(["ubermelon"]).unwrap();
        assert!(!args.testing);

        std::env::set_var("UBERMELON_TESTING", "true");
        assert!(Args::try_parse_from(["ubermelon"]).unwrap().testing);

        std::env::remove_var("UBERMELON_TESTING");
        let args = Args::try_parse_from(["ubermelon"]).unwrap();
        assert!(!args.testing);
        assert_eq!(args.port, 5000);
    }

    #[test]
    fn test_testing_flag_on_command_line() {
        let args = Args::try_parse_from(["ubermelon", "--testing", "--port", "8080"]).unwrap();
        assert!(args.testing);
        assert_eq!(args.port, 8080);
    }
}
