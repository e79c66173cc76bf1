//! Command handlers

use crate::attack::{ClassicFlood, GattFlood, PingFlood};
use crate::bluetooth::{self, open_adapter, parse_address, RadioMode, SCAN_DURATION};
use crate::cli::{Command, DeauthArgs, MassPingArgs};
use crate::display;
use crate::interactive;
use crate::mac;
use anyhow::Result;
use bleeding_core::{Job, Logger, PoolConfig, Protocol, Target, WorkerPool};
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;

pub async fn run(command: Command, logger: &Logger) -> Result<ExitCode> {
    match command {
        Command::Scan { ble } => scan(RadioMode::from_ble_flag(ble), logger).await,
        Command::Enum { target, ble } => {
            enumerate(&target, RadioMode::from_ble_flag(ble), logger).await
        }
        Command::Deauth(args) => deauth(args, logger).await,
        Command::Massping(args) => massping(args, logger).await,
        Command::RandomMac => Ok(random_mac(logger)),
        Command::Interactive { ble } => interactive::run(RadioMode::from_ble_flag(ble), logger).await,
    }
}

async fn scan(mode: RadioMode, logger: &Logger) -> Result<ExitCode> {
    let adapter = open_adapter().await?;

    logger.info(format!(
        "Scanning for {mode} devices ({} seconds)...",
        SCAN_DURATION.as_secs()
    ));
    let devices = bluetooth::scan(&adapter, mode, SCAN_DURATION).await?;

    if devices.is_empty() {
        logger.warn("Scan completed but no devices found");
    } else {
        logger.info(format!("Found {} {mode} device(s)", devices.len()));
        display::print_devices(logger, &devices);
    }
    Ok(ExitCode::SUCCESS)
}

async fn enumerate(target: &str, mode: RadioMode, logger: &Logger) -> Result<ExitCode> {
    let address = parse_address(target)?;
    let adapter = open_adapter().await?;

    logger.info(format!("Enumerating services for {}...", logger.good(address)));
    let services = match bluetooth::enumerate_services(&adapter, address, mode, logger).await {
        Ok(services) => services,
        Err(e) => {
            logger.warn(format!("Failed to enumerate services: {e:#}"));
            Vec::new()
        }
    };

    if services.is_empty() {
        logger.warn("No services found.");
    } else {
        display::print_services(logger, &services);
    }
    Ok(ExitCode::SUCCESS)
}

async fn deauth(args: DeauthArgs, logger: &Logger) -> Result<ExitCode> {
    let protocol = Protocol::from(args.protocol);
    let target = Target::new(&args.target, args.port, protocol, args.size)?;
    let timeout = PoolConfig::timeout_from_secs(args.timeout);

    let mut rows = vec![("Target", target.address().to_string())];
    if args.ble {
        logger.info("Initializing BLE DeAuth attack...");
    } else {
        logger.info("Initializing BR/EDR DeAuth attack...");
        rows.push(("Port", format!("{:#06x}", target.port())));
        rows.push(("Protocol", protocol.to_string()));
    }
    rows.push(("Packet size", target.payload_size().to_string()));
    rows.push(("Threads", args.threads.to_string()));
    if let Some(limit) = timeout {
        rows.push(("Duration", format!("{} seconds", limit.as_secs())));
    }
    display::print_parameters(logger, "  ", &rows);

    if args.ble {
        let adapter = open_adapter().await?;
        let job = GattFlood::new(adapter, &target)?;
        launch(job, target, args.threads, timeout, logger).await
    } else {
        let job = ClassicFlood::new(&target)?;
        // Raw sockets bypass the adapter object, but its absence is still fatal
        open_adapter().await?;
        launch(job, target, args.threads, timeout, logger).await
    }
}

async fn massping(args: MassPingArgs, logger: &Logger) -> Result<ExitCode> {
    let target = Target::new(&args.target, 0, Protocol::default(), args.size)?;
    let timeout = PoolConfig::timeout_from_secs(args.timeout);
    let job = PingFlood::new(args.interface.as_str(), &target)?;

    logger.info("Initializing l2ping flood...");
    let mut rows = vec![
        ("Target", target.address().to_string()),
        ("Interface", args.interface.clone()),
        ("Packet size", target.payload_size().to_string()),
        ("Threads", args.threads.to_string()),
    ];
    if let Some(limit) = timeout {
        rows.push(("Duration", format!("{} seconds", limit.as_secs())));
    }
    display::print_parameters(logger, "  ", &rows);

    launch(job, target, args.threads, timeout, logger).await
}

fn random_mac(logger: &Logger) -> ExitCode {
    logger.info("Generating random MAC addresses...");
    for (vendor, addr) in mac::random_mac_all_vendors(&mut rand::thread_rng()) {
        logger.info(format!(
            " {} {vendor:<10}\t{}",
            logger.dim("*"),
            logger.good(addr)
        ));
    }
    ExitCode::SUCCESS
}

/// Run `job` on a pool until timeout, Ctrl-C or a fatal error
pub(crate) async fn launch<J: Job>(
    job: J,
    target: Target,
    threads: usize,
    timeout: Option<Duration>,
    logger: &Logger,
) -> Result<ExitCode> {
    let config = PoolConfig::default()
        .with_threads(threads)
        .with_timeout(timeout);
    let pool = WorkerPool::new(config, logger.clone())?;

    let report = pool.run(job, target, interrupted()).await;
    display::print_report(logger, &report);

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C, run ends on timeout or failure only");
        std::future::pending::<()>().await;
    }
}
