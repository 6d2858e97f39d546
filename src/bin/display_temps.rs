//! Prints every thermometer on the bus in Fahrenheit, forever.

use std::{process, thread, time::Duration};

use fermbot::{config::Config, core::cycle::display_pass, logger::LoggerManager, print_error};
use time::OffsetDateTime;
use tracing::{error, info};

fn main() {
    let cfg = Config::new().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });
    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    let interval = Duration::from_secs(cfg.display.interval_secs);
    info!(
        "Displaying {} every {}s",
        cfg.bus_master_path().display(),
        interval.as_secs()
    );

    loop {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        match display_pass(cfg.bus_master_path(), now) {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) => error!("Failed to read bus: {}", e),
        }
        thread::sleep(interval);
    }
}
