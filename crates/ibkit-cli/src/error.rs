use ibkit_core::{CoreError, ServiceError, UtcDateTime};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ibkit_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error("rate limit of {limit} requests exceeded, retry after {reset_at}")]
    RateLimited { limit: u32, reset_at: UtcDateTime },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ServiceError> for CliError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::RateLimited { limit, reset_at } => Self::RateLimited { limit, reset_at },
            ServiceError::Validation(error) => Self::Validation(error),
            ServiceError::Serialization(error) => Self::Serialization(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Serialization(_) | Self::Csv(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::RateLimited { .. } => 6,
            Self::Command(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_their_exit_codes() {
        let reset_at = UtcDateTime::parse("2024-01-02T14:31:00Z").expect("timestamp");
        let limited = CliError::from(ServiceError::RateLimited { limit: 60, reset_at });
        assert_eq!(limited.exit_code(), 6);

        let invalid = CliError::from(ServiceError::Validation(
            ibkit_core::ValidationError::NoInstruments,
        ));
        assert_eq!(invalid.exit_code(), 2);
    }
}
