//! Gotify Harmony Bridge CLI.
//!
//! This is the main binary entry point. See the `gotify_harmony_bridge`
//! library for the core functionality.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gotify_harmony_bridge::{
    Bridge, Config, CredentialSigner, InboundEvent, ServiceCredential, PLUGIN_INFO,
};

// CLI
#[derive(Parser)]
#[command(name = "gotify-harmony-bridge")]
#[command(version = PLUGIN_INFO.version)]
#[command(about = "Forwards Gotify notifications to a HarmonyOS device")]
struct Cli {
    /// JSON config file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward the Gotify stream until interrupted (default)
    Run,
    /// Print a freshly signed Push Kit assertion
    Token,
    /// Send one notification through Push Kit and exit
    SendTest {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        /// Application id used for the icon lookup and click action
        #[arg(long, default_value_t = 0)]
        app_id: u32,
    },
}

fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("BRIDGE_LOG_FILE") {
        let log_file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create log file at {path}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[Bridge] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("[Bridge] Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn run(config: Config) -> Result<()> {
    let mut bridge = Bridge::from_config(config).context("Failed to start bridge")?;
    bridge.enable().context("Failed to enable bridge")?;

    println!("{} v{} running. Press Ctrl-C to stop.", PLUGIN_INFO.name, PLUGIN_INFO.version);
    shutdown_signal().await;

    println!("Shutting down...");
    bridge.disable().await;
    Ok(())
}

fn print_token(config: &Config) -> Result<()> {
    let credential = ServiceCredential::load(&config.credential_path)
        .context("Failed to load service credential")?;
    let signer = CredentialSigner::new(&credential).context("Invalid signing key")?;
    let assertion = signer.sign(Utc::now()).context("Failed to sign assertion")?;

    println!("{}", assertion.token);
    eprintln!(
        "kid {} expires at {} (unix seconds)",
        signer.key_id(),
        assertion.expires_at
    );
    Ok(())
}

async fn send_test(config: Config, title: String, body: String, app_id: u32) -> Result<()> {
    let bridge = Bridge::from_config(config).context("Failed to start bridge")?;
    let mut pipeline = bridge.pipeline()?;

    let event = InboundEvent {
        id: 0,
        appid: app_id,
        message: body,
        title,
        priority: 0,
        date: Utc::now().to_rfc3339(),
    };
    let outcome = pipeline.handle(&event).await;

    println!("{outcome}");
    if !outcome.is_success() {
        anyhow::bail!("Test notification was not delivered");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = Config::load(path).context("Invalid configuration")?;
            run(config).await?;
        }
        Commands::Token => {
            let config = Config::resolve(path).context("Invalid configuration")?;
            print_token(&config)?;
        }
        Commands::SendTest {
            title,
            body,
            app_id,
        } => {
            let config = Config::load(path).context("Invalid configuration")?;
            send_test(config, title, body, app_id).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["gotify-harmony-bridge"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_send_test_args() {
        let cli = Cli::try_parse_from([
            "gotify-harmony-bridge",
            "send-test",
            "--title",
            "Hi",
            "--body",
            "There",
            "--config",
            "/etc/bridge.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/bridge.json")));
        match cli.command {
            Some(Commands::SendTest {
                title,
                body,
                app_id,
            }) => {
                assert_eq!(title, "Hi");
                assert_eq!(body, "There");
                assert_eq!(app_id, 0);
            }
            _ => panic!("expected send-test"),
        }
    }
}
