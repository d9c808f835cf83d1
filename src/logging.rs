// Logging setup
//
// env_logger behind the `log` facade. RUST_LOG still wins over the config
// level so a user can crank up verbosity without touching the file.

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::io::Write;

/// Initialize logging with optional file output
pub fn init_logging(config: &LoggingConfig) {
    use env_logger::{Builder, Target};

    let mut builder = Builder::new();
    builder.filter_level(config.level_filter());
    builder.parse_default_env();

    if config.log_to_file {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.log_file)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "=== Stereo Capture Layer Log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                let _ = writeln!(file);
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", config.log_file, e);
            }
        }
    }

    // The layer can be loaded more than once into the same process
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
