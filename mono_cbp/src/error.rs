//! Error types for the detection pipeline.
//!
//! Every failure carries an [`ErrorContext`] naming the operation and the light
//! curve involved, so a failed file in a large batch can be traced without
//! re-running it.

use std::fmt;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Structured context for pipeline errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "periodic_filter", "load_light_curve")
    pub operation: Option<String>,
    /// Object identifier of the light curve, if known
    pub object_id: Option<String>,
    /// Epoch (sector) identifier of the light curve, if known
    pub epoch_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the object identifier.
    pub fn with_object(mut self, object_id: impl ToString) -> Self {
        self.object_id = Some(object_id.to_string());
        self
    }

    /// Set the epoch identifier.
    pub fn with_epoch(mut self, epoch_id: impl ToString) -> Self {
        self.epoch_id = Some(epoch_id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref object) = self.object_id {
            parts.push(format!("object={}", object));
        }
        if let Some(ref epoch) = self.epoch_id {
            parts.push(format!("epoch={}", epoch));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed input: missing columns, mismatched lengths, unsorted time.
    /// Aborts the affected file only.
    #[error("Invalid input: {message} {context}")]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    /// The periodic-trend filter found no acceptable window length.
    /// Callers recover by falling back to the unfiltered flux.
    #[error("Filter did not converge: {message} {context}")]
    FilterNonConvergence {
        message: String,
        context: ErrorContext,
    },

    /// Too few usable points for a statistic or a detrending window.
    #[error("Insufficient data: {message} {context}")]
    InsufficientData {
        message: String,
        context: ErrorContext,
    },

    /// Configuration is out of range or could not be read.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// Filesystem error while loading or writing pipeline data.
    #[error("I/O error: {message} {context}")]
    Io {
        message: String,
        context: ErrorContext,
        #[source]
        source: std::io::Error,
    },

    /// Input file could not be deserialized.
    #[error("Parse error: {message} {context}")]
    Parse {
        message: String,
        context: ErrorContext,
    },

    /// The external classification collaborator failed.
    #[error("Classification error: {message} {context}")]
    Classification {
        message: String,
        context: ErrorContext,
    },
}

impl PipelineError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a filter non-convergence error.
    pub fn non_convergence(message: impl Into<String>) -> Self {
        Self::FilterNonConvergence {
            message: message.into(),
            context: ErrorContext::new("periodic_filter"),
        }
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an I/O error wrapping the underlying source.
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            context: ErrorContext::default(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a classification error.
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
            context: ErrorContext::new("classify"),
        }
    }

    /// Whether the caller is expected to recover locally and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FilterNonConvergence { .. } | Self::InsufficientData { .. }
        )
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidInput { context, .. }
            | Self::FilterNonConvergence { context, .. }
            | Self::InsufficientData { context, .. }
            | Self::Configuration { context, .. }
            | Self::Io { context, .. }
            | Self::Parse { context, .. }
            | Self::Classification { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidInput { context, .. }
            | Self::FilterNonConvergence { context, .. }
            | Self::InsufficientData { context, .. }
            | Self::Configuration { context, .. }
            | Self::Io { context, .. }
            | Self::Parse { context, .. }
            | Self::Classification { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Attach the light curve identity to the error context.
    pub fn with_series(mut self, object_id: &str, epoch_id: &str) -> Self {
        let context = self.context_mut();
        context.object_id = Some(object_id.to_string());
        context.epoch_id = Some(epoch_id.to_string());
        self
    }

    /// Set additional details in the error context.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.context_mut().details = Some(details.into());
        self
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::parse(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::configuration(format!("Failed to parse config: {}", err))
    }
}
