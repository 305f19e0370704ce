//! Application error type.
//!
//! Every failure carries the process exit code it maps to:
//!
//! - `2` input or configuration problems (unreadable workbook, malformed header, bad flags)
//! - `3` no usable data (nothing left to fit after parsing/filtering)
//! - `4` numerical, fitting, or rendering failures

/// Exit code for malformed input and invalid configuration.
pub const EXIT_INPUT: u8 = 2;
/// Exit code when parsing succeeds but no usable data remains.
pub const EXIT_NO_DATA: u8 = 3;
/// Exit code for fit, numerical, and rendering failures.
pub const EXIT_NUMERIC: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERIC, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
