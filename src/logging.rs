use crate::config::Config;
use color_eyre::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "INQUIRA_LOG";
const LOG_FILE: &str = "inquira.log";

/// Sends tracing output to `<data_dir>/inquira.log`; the terminal belongs to the UI.
///
/// `INQUIRA_LOG` overrides `logging.level` from the config.
pub fn init(config: &Config) -> Result<()> {
    let data_dir = config.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|err| color_eyre::eyre::eyre!("Could not initialize logging: {}", err))?;
    Ok(())
}
