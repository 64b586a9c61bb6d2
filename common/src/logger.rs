use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub fn default_logs_datetime_format() -> String {
    String::from("[%Y-%m-%d] (%H:%M:%S%.3f)")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerSettings<'a> {
    pub level: LogLevel,
    // Same as level when not set
    pub file_level: Option<LogLevel>,
    pub disable_file_logging: bool,
    pub disable_file_log_date_based: bool,
    pub disable_log_color: bool,
    pub filename_log: &'a str,
    pub logs_path: &'a str,
    pub datetime_format: &'a str,
    // Modules whose logs are too verbose below warn
    pub quiet_modules: &'a [&'a str],
}

pub fn setup_logger(settings: LoggerSettings<'_>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Cyan)
        .trace(Color::Magenta);

    let datetime_format = settings.datetime_format.to_owned();
    let disable_color = settings.disable_log_color;
    let mut console = fern::Dispatch::new()
        .level(settings.level.into())
        .format(move |out, message, record| {
            let now = chrono::Local::now().format(&datetime_format);
            if disable_color {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    now,
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "\x1B[90m{}\x1B[0m {} \x1B[90m[{}]\x1B[0m {}",
                    now,
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            }
        })
        .chain(std::io::stderr());
    for module in settings.quiet_modules {
        console = console.level_for(module.to_string(), LevelFilter::Warn);
    }

    let mut base = fern::Dispatch::new().chain(console);

    if !settings.disable_file_logging {
        let logs_path = Path::new(settings.logs_path);
        fs::create_dir_all(logs_path).with_context(|| {
            format!("Error while creating logs directory {}", settings.logs_path)
        })?;

        let datetime_format = settings.datetime_format.to_owned();
        let file_level = settings.file_level.unwrap_or(settings.level);
        let file = fern::Dispatch::new()
            .level(file_level.into())
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} {} [{}] {}",
                    chrono::Local::now().format(&datetime_format),
                    record.level(),
                    record.target(),
                    message
                ))
            });

        let file = if settings.disable_file_log_date_based {
            let path = logs_path.join(settings.filename_log);
            file.chain(
                fern::log_file(&path)
                    .with_context(|| format!("Error while opening log file {}", path.display()))?,
            )
        } else {
            file.chain(fern::DateBased::new(
                format!("{}/", settings.logs_path.trim_end_matches('/')),
                format!("%Y-%m-%d.{}", settings.filename_log),
            ))
        };
        base = base.chain(file);
    }

    base.apply().context("Error while setting up the logger")?;
    Ok(())
}
