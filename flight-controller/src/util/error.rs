use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("parameter storage identity mismatch: expected {expected:#08x}, found {found:#08x}")]
    StorageIdentity { expected: u32, found: u32 },
    #[error("write of {len} bytes to {key} exceeds the page capacity of {capacity} bytes")]
    WriteTooLarge {
        key: String,
        len: usize,
        capacity: usize,
    },
    #[error("no record stored under {0}")]
    RecordMissing(String),
    #[error("record {key} is invalid: {reason}")]
    RecordDecode { key: String, reason: &'static str },
    #[error("record keys are exactly 4 ASCII characters")]
    InvalidRecordKey,
    #[error("output driver failure: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stops the system on an unrecoverable configuration or hardware fault.
pub fn system_halt(error: &AppError) -> ! {
    log::error!("System halted: {}", error);
    std::process::abort()
}
