use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Registry / entry errors
    #[error("Invalid entry code: {0}")]
    InvalidCodeFormat(String),

    #[error("Invalid hour range: start {start} end {end}")]
    InvalidHourRange { start: u32, end: u32 },

    #[error("Unknown weekday: {0}")]
    UnknownWeekday(String),

    #[error("Unknown alert group: {0}")]
    UnknownAlertGroup(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
