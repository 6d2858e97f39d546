use std::{process, sync::OnceLock};

use fermbot::{
    config::Config,
    core::{
        chain::{LoggerChain, SqlSink, TextSink},
        cycle::PollCycle,
    },
    logger::LoggerManager,
    print_error,
};
use tracing::{debug, error, info};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        })
    })
}

fn build_chain(cfg: &Config) -> LoggerChain {
    let sql = SqlSink::open(cfg.database_path()).unwrap_or_else(|e| {
        error!("Failed to open database: {}", e);
        process::exit(1);
    });

    let mut chain = LoggerChain::new(TextSink::new(cfg.channel()));
    chain.append(sql);
    chain.with_policy(cfg.chain.failure_policy)
}

fn main() {
    let cfg = config();
    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting fermbot version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    if cfg.debug.enabled {
        info!("Debug mode: using {}", cfg.bus_master_path().display());
    }
    debug!("{:#?}", cfg.controller);

    let chain = build_chain(cfg);
    info!("Logging chain: {}", chain.sink_names().join(" -> "));

    let mut device = cfg.controller.device.build();
    info!("Controller device: {}", device.name());

    let report = PollCycle::new(
        cfg.bus_master_path(),
        &chain,
        device.as_mut(),
        cfg.controller.settings(),
    )
    .run()
    .unwrap_or_else(|e| {
        error!("Poll cycle aborted: {}", e);
        process::exit(1);
    });

    if let Some(state) = report.controller_state {
        info!("Controller state: {}", state);
    }
    if !report.is_success() {
        for failure in &report.failures {
            error!(
                "{}: {}",
                failure.serial.as_deref().unwrap_or("cycle"),
                failure.error
            );
        }
        process::exit(1);
    }
}
