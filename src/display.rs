//! Console presentation: banner, section headers, listings and summaries

use crate::bluetooth::{DiscoveredDevice, ServiceRecord};
use bleeding_core::{Logger, PoolReport, WorkerExit};
use colored::Color;

/// Inner width of a bordered header
pub const BORDERED_WIDTH: usize = 38;

const BANNER: &str = r"
    ▄▄▄▄    ██▓    ▓█████ ▓█████ ▓█████▄  ██▓ ███▄    █   ▄████
    ▓█████▄ ▓██▒    ▓█   ▀ ▓█   ▀ ▒██▀ ██▌▓██▒ ██ ▀█   █  ██▒ ▀█▒
    ▒██▒ ▄██▒██░    ▒███   ▒███   ░██   █▌▒██▒▓██  ▀█ ██▒▒██░▄▄▄░
    ▒██░█▀  ▒██░    ▒▓█  ▄ ▒▓█  ▄ ░▓█▄   ▌░██░▓██▒  ▐▌██▒░▓█  ██▓
    ░▓█  ▀█▓░██████▒░▒████▒░▒████▒░▒████▓ ░██░▒██░   ▓██░░▒▓███▀▒
    ░▒▓███▀▒░ ▒░▓  ░░░ ▒░ ░░░ ▒░ ░ ▒▒▓  ▒ ░▓  ░ ▒░   ▒ ▒  ░▒   ▒
    ▒░▒   ░ ░ ░ ▒  ░ ░ ░  ░ ░ ░  ░ ░ ▒  ▒  ▒ ░░ ░░   ░ ▒░  ░   ░
    ░    ░   ░ ░      ░      ░    ░ ░  ░  ▒ ░   ░   ░ ░ ░ ░   ░
    ░          ░  ░   ░  ░   ░  ░   ░     ░           ░       ░
        ░                        ░

                        Bluetooth/BLE jamming
";

pub fn print_banner(logger: &Logger) {
    logger.line(logger.paint(BANNER, Color::Red));
}

/// Three lines of box drawing around `text`, centered or truncated to fit
pub fn bordered(text: &str) -> [String; 3] {
    let len = text.chars().count();
    let inner = if len >= BORDERED_WIDTH {
        text.chars().take(BORDERED_WIDTH).collect()
    } else {
        let left = (BORDERED_WIDTH - len) / 2;
        let right = BORDERED_WIDTH - len - left;
        format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
    };
    let bar = "═".repeat(BORDERED_WIDTH);

    [
        format!("╔{bar}╗"),
        format!("║{inner}║"),
        format!("╚{bar}╝"),
    ]
}

pub fn print_bordered(logger: &Logger, text: &str, color: Color) {
    for line in bordered(text) {
        logger.line(logger.paint(line, color));
    }
}

/// Aligned `label: value` rows, as printed before an attack starts
pub fn print_parameters(logger: &Logger, indent: &str, rows: &[(&str, String)]) {
    for (label, value) in rows {
        let label = format!("{label}:");
        logger.info(format!("{indent}{label:<16}{}", logger.value(value)));
    }
}

pub fn device_line(logger: &Logger, device: &DiscoveredDevice) -> String {
    let mut line = format!(
        " {} {} {}",
        logger.dim("*"),
        device.address,
        logger.good(format!("({})", device.name))
    );
    if let Some(rssi) = device.rssi {
        line.push_str(&format!(" {}", logger.dim(format!("[RSSI: {rssi}]"))));
    } else if let Some(class) = device.class {
        line.push_str(&format!(" {}", logger.dim(format!("[Class: {class:#08x}]"))));
    }
    line
}

pub fn print_devices(logger: &Logger, devices: &[DiscoveredDevice]) {
    for device in devices {
        logger.info(device_line(logger, device));
    }
}

pub fn print_services(logger: &Logger, services: &[ServiceRecord]) {
    let bullet = logger.dim("*");
    logger.info("Services found:");
    for service in services {
        logger.info(format!("> {}", logger.accent(&service.name)));
        logger.info(format!(
            "    {bullet} Description: {}",
            logger.good(&service.description)
        ));
        logger.info(format!("    {bullet} Protocol: {}", logger.good(service.protocol)));
        if let Some(port) = service.port {
            logger.info(format!("    {bullet} Port: {}", logger.good(port)));
        }
        logger.info(format!("    {bullet} UUID: {}", logger.good(service.uuid)));

        if !service.characteristics.is_empty() {
            logger.info(format!("    {bullet} Characteristics:"));
            for ch in &service.characteristics {
                logger.info(format!(
                    "        {} {} {}",
                    logger.dim("-"),
                    ch.name,
                    logger.dim(format!("[{}]", ch.uuid))
                ));
                logger.info(format!(
                    "          {} {}",
                    logger.dim("Properties:"),
                    ch.properties.join(", ")
                ));
            }
        }
        logger.line("");
    }
}

/// Menu entry for a device
pub fn device_choice(logger: &Logger, device: &DiscoveredDevice) -> String {
    format!(
        "{} - {}",
        logger.good(device.address),
        logger.accent(&device.name)
    )
}

/// Menu entry for a service
pub fn service_choice(logger: &Logger, service: &ServiceRecord) -> String {
    let port = service
        .port
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} | Port: {} | Protocol: {}",
        logger.good(&service.name),
        logger.notice(port),
        logger.accent(service.protocol)
    )
}

/// Per-worker numbers once the pool is torn down
pub fn print_report(logger: &Logger, report: &PoolReport) {
    logger.info("");
    logger.info(format!(
        "Attack ended ({}) after {:.1}s: {} attempts, {} bytes sent",
        report.reason,
        report.elapsed.as_secs_f64(),
        logger.value(report.total_attempts()),
        logger.value(report.total_bytes_sent())
    ));

    for worker in &report.workers {
        let exit = match worker.exit {
            WorkerExit::Stopped => logger.good("stopped"),
            WorkerExit::Fatal => logger.bad("fatal"),
            WorkerExit::Aborted => logger.notice("aborted"),
            WorkerExit::Panicked => logger.bad("panicked"),
        };
        logger.info(format!(
            " {} {}  attempts {:>4}  ok {:>4}  failed {:>4}  bytes {:>8}  {}",
            logger.dim("*"),
            worker.id,
            worker.attempts,
            worker.successes,
            worker.failures,
            worker.bytes_sent,
            exit
        ));
    }

    if report.discarded_failures > 0 {
        logger.warn(format!(
            "{} more worker(s) failed fatally",
            report.discarded_failures
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluer::Address;

    #[test]
    fn test_bordered_centers_text() {
        let [top, middle, bottom] = bordered("Scanning for BLE devices...");
        assert_eq!(top.chars().count(), BORDERED_WIDTH + 2);
        assert_eq!(bottom.chars().count(), BORDERED_WIDTH + 2);
        assert_eq!(middle, "║     Scanning for BLE devices...      ║");
    }

    #[test]
    fn test_bordered_truncates_long_text() {
        let text = "x".repeat(50);
        let [_, middle, _] = bordered(&text);
        assert_eq!(middle, format!("║{}║", "x".repeat(BORDERED_WIDTH)));
    }

    #[test]
    fn test_device_line_headless() {
        let (logger, _) = Logger::buffered(true);
        let mut device = DiscoveredDevice {
            address: Address::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            name: "Speaker".to_string(),
            class: Some(0x240404),
            rssi: None,
        };
        assert_eq!(
            device_line(&logger, &device),
            " * 00:11:22:33:44:55 (Speaker) [Class: 0x240404]"
        );

        device.rssi = Some(-42);
        assert_eq!(
            device_line(&logger, &device),
            " * 00:11:22:33:44:55 (Speaker) [RSSI: -42]"
        );
    }

    #[test]
    fn test_parameters_alignment() {
        let (logger, buffer) = Logger::buffered(true);
        print_parameters(
            &logger,
            "  ",
            &[("Target", "00:11:22:33:44:55".to_string()), ("Threads", "4".to_string())],
        );
        assert_eq!(
            buffer.lines(),
            vec![
                "INFO   Target:         00:11:22:33:44:55",
                "INFO   Threads:        4",
            ]
        );
    }
}
