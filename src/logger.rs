use log::LevelFilter;
use std::io::Write;

/// Initialize the logging system.
///
/// Console verbosity is controlled via the `RUST_LOG` environment
/// variable (`error`, `warn`, `info`, `debug`, `trace`, `off`), defaulting
/// to `info`. Diagnostics go to stderr so they never mix with the summary
/// line on stdout.
///
/// ```bash
/// # Show per-file merge decisions
/// RUST_LOG=debug mcabber-hist-merge old/ new/ merged/
/// ```
pub fn init_logger() {
    let default_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level)
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok(); // Ignore error if logger is already initialized
}
