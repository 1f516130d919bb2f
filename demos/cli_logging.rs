use tracing::{error, info, warn};
use tracing_line_log::env::{LINE_LOG_FILE_ENV, LINE_LOG_LEVEL_ENV};
use tracing_line_log::{init_logging_or_exit, install_tracing, LoggingConfig};

/// Run with e.g. `LINE_LOG_LEVEL=DEBUG LINE_LOG_FILE=demo.log`, then look at
/// the file. With the default level `NONE` nothing is written.
fn main() {
    let config = LoggingConfig::from_env();
    let logger = init_logging_or_exit(&config);

    if let Err(e) = install_tracing(&logger) {
        eprintln!("{}", e);
    }

    logger.info("starting demo");
    logger.debug("multi\nline\tmessage");

    info!(repository = "grv", "loaded {} refs", 12);
    warn!("terminal is only {} columns wide", 40);
    load_repository(&logger);

    println!(
        "logged at {:?} to {} (set {} / {})",
        logger.level(),
        config.file.display(),
        LINE_LOG_LEVEL_ENV,
        LINE_LOG_FILE_ENV,
    );
}

fn load_repository(logger: &tracing_line_log::Logger) {
    logger.error("unable to open repository");
    error!(path = "/tmp/missing", "fallback failed");
}
