#![forbid(unsafe_code)]

mod accessory;
mod accessory_info;
mod cli;
mod constants;
mod handlers;
mod inputs;
mod ipc;
mod net;
mod process;
mod scheduler;
mod steam;
mod vdf;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use accessory::TelevisionAccessory;
use accessory_info::AccessoryInfo;
use cli::{Cli, Command, CtlAction, ServeArgs};
use constants::accessory::PAIRING_CODE;
use handlers::SteamHandlers;
use inputs::Catalog;
use ipc::{ControlClient, ControlResponse, ControlServer};
use steam::SteamConfig;

fn init_logging(debug: bool) -> Result<()> {
    // Parse log level from environment variable
    let log_level = if debug {
        TraceLevel::DEBUG
    } else {
        match std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => TraceLevel::TRACE,
            "debug" => TraceLevel::DEBUG,
            "warn" => TraceLevel::WARN,
            "error" => TraceLevel::ERROR,
            _ => TraceLevel::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")
}

fn steam_config(args: &ServeArgs) -> SteamConfig {
    let defaults = SteamConfig::default_paths();
    SteamConfig::new(
        args.login_users.clone().unwrap_or(defaults.login_users),
        args.registry.clone().unwrap_or(defaults.registry),
    )
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for SIGINT")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let steam = steam_config(&args);
    let labels = inputs::parse_labels(&args.inputs);
    let catalog = Catalog::build(&steam, &labels);

    let persist_dir = args.persist_dir();
    let info = AccessoryInfo::resolve(&persist_dir, &args.name, &args.info_overrides())?;
    info!(
        name = %info.name,
        manufacturer = %info.manufacturer,
        model = %info.model,
        serial = %info.serial_number,
        firmware = %info.firmware_revision,
        "Accessory information"
    );

    let address = net::resolve_bind(&args.bind)?;
    let socket = SocketAddr::new(address, args.port);
    info!(address = %socket, "Binding and advertising");

    let hooks = Arc::new(SteamHandlers::new(steam, args.restart_process.clone()));
    let tv = TelevisionAccessory::new(
        info.name.clone(),
        catalog.inputs.clone(),
        catalog.initial_identifier,
        hooks,
    );

    let server = ControlServer::bind(socket).await?;
    info!("Pairing code: {}", PAIRING_CODE);
    info!(
        name = tv.name(),
        port = args.port,
        active = tv.is_active(),
        active_identifier = tv.active_identifier(),
        "Starting TV with inputs: {}",
        catalog.labels().join(", ")
    );

    tokio::select! {
        res = server.serve(tv) => res?,
        res = shutdown_signal() => {
            res?;
            info!("Shutdown signal received, stopping");
        }
    }
    Ok(())
}

async fn ctl(args: &ServeArgs, addr: Option<String>, action: CtlAction) -> Result<()> {
    let addr = match addr {
        Some(addr) => addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid accessory address '{addr}'"))?,
        None => SocketAddr::new(net::resolve_bind(&args.bind)?, args.port),
    };

    let mut client = ControlClient::connect(addr).await?;
    match client.request(action.request()).await? {
        ControlResponse::State(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        ControlResponse::Inputs(inputs) => {
            for input in inputs {
                println!(
                    "{}\t{}\t{}\t{:?} ({})",
                    input.identifier,
                    input.label,
                    input.slug,
                    input.source_type,
                    input.source_type.code()
                );
            }
        }
        ControlResponse::Pong => println!("pong"),
        ControlResponse::Ready => println!("ok"),
        ControlResponse::Error(message) => anyhow::bail!("accessory returned error: {message}"),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.serve.debug)?;

    match cli.command {
        Some(Command::Ctl { addr, action }) => ctl(&cli.serve, addr, action).await,
        None => serve(cli.serve).await,
    }
}
