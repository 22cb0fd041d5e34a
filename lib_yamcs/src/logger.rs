use std::fs;
use std::path::Path;

use anyhow::Result;

/// How many dated log files to keep around.
const KEEP_LOGS: usize = 5;

/// Configures `fern` to log to stdout and, when a directory is given, to a
/// dated file in it.
pub fn setup_logging(log_dir: Option<&Path>, log_level: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_dir) = log_dir {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir)?;
        }
        prune_old_logs(log_dir)?;
        let file_name = format!(
            "yamcs_bridge_{}.log",
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        dispatch = dispatch.chain(fern::log_file(log_dir.join(file_name))?);
    }

    dispatch.apply()?;
    Ok(())
}

/// Deletes all but the `KEEP_LOGS` most recent `.log` files.
fn prune_old_logs(log_dir: &Path) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .collect();

    entries.sort_by_key(|e| {
        std::cmp::Reverse(e.metadata().and_then(|m| m.modified()).ok())
    });

    for entry in entries.iter().skip(KEEP_LOGS) {
        if let Err(e) = fs::remove_file(entry.path()) {
            log::warn!("Failed to delete old log file {:?}: {}", entry.path(), e);
        }
    }

    Ok(())
}
