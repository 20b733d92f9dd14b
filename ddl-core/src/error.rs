use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("remote returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("catalog decoding error: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("recipient rejected message: {0}")]
    Rejected(String),
    #[error("delivery channel unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported back to whoever issued a command. These are user input
/// problems, not system faults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("no default source is loaded yet, use `sources` once data is available")]
    NoDefaultSource,
    #[error("source '{name}' does not exist, available sources: {}", .available.join(", "))]
    UnknownSource { name: String, available: Vec<String> },
    #[error("unknown tags: {}, use `tags` to see available tags", .0.join(", "))]
    InvalidTags(Vec<String>),
    #[error("please provide a search keyword")]
    EmptyKeyword,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
