use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParseError(#[from] chrono::ParseError),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("SEC denied access (HTTP 403) for {url}")]
    SecAccessDenied { url: String },

    #[error("Upstream {service} returned HTTP {status}: {message}")]
    UpstreamError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("LLM request failed (status: {status:?}): {message}")]
    LlmError {
        status: Option<u16>,
        message: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Unknown job: {name}")]
    UnknownJob { name: String },
}

pub type Result<T> = std::result::Result<T, DigestError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DigestError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn llm(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::LlmError {
            status,
            message: message.into(),
        }
    }

    /// 是否為 429 (rate limit) 錯誤
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::LlmError { status, .. } => *status == Some(429),
            Self::UpstreamError { status, .. } => *status == 429,
            Self::HttpError(e) => e.status().map(|s| s.as_u16()) == Some(429),
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::SecAccessDenied { .. } | Self::UpstreamError { .. } | Self::LlmError { .. } => {
                ErrorCategory::Upstream
            }
            Self::DatabaseError(_) | Self::IoError(_) => ErrorCategory::Storage,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownJob { .. } => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::DateParseError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Data => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Storage => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::SecAccessDenied { .. } => {
                "Set SEC_COMPANY_NAME and SEC_EMAIL_ADDRESS to real values and retry in 1-2 hours"
            }
            Self::LlmError { status: Some(401), .. } => "Check OPENAI_API_KEY",
            Self::LlmError { .. } if self.is_rate_limited() => {
                "The model provider is rate limiting; lower the schedule frequency or budget"
            }
            Self::MissingConfigError { .. } => "Provide the missing value in the config file or environment",
            Self::DatabaseError(_) => "Check DATABASE_URL / DB_* settings and that the schema is migrated",
            _ => match self.category() {
                ErrorCategory::Network => "Check network connectivity and the upstream base URLs",
                ErrorCategory::Upstream => "Retry later; the upstream service rejected the request",
                ErrorCategory::Storage => "Check file permissions and database availability",
                ErrorCategory::Configuration => "Fix the configuration and restart",
                ErrorCategory::Data => "The input could not be processed; it will be skipped",
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Upstream => format!("Upstream service problem: {}", self),
            ErrorCategory::Storage => format!("Storage problem: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
        }
    }
}
