//! 合成流程的錯誤型別

use std::fmt;
use std::io;
use thiserror::Error;

pub type ComposeResult<T> = std::result::Result<T, ComposeError>;

/// 匯出管線的階段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preparing,
    RenderingVideo,
    SynthesizingAudio,
    Muxing,
    Persisting,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::RenderingVideo => "rendering-video",
            Self::SynthesizingAudio => "synthesizing-audio",
            Self::Muxing => "muxing",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported locator '{locator}': {reason}")]
    UnsupportedLocator { locator: String, reason: String },

    #[error("Preparation failed: {message}")]
    Preparation {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("Encoding engine failed during {stage}: {diagnostic}")]
    Engine { stage: Stage, diagnostic: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl ComposeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unsupported_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    pub fn preparation(message: impl Into<String>, source: io::Error) -> Self {
        Self::Preparation {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn preparation_msg(message: impl Into<String>) -> Self {
        Self::Preparation {
            message: message.into(),
            source: None,
        }
    }

    /// 將儲存層的 I/O 錯誤分成權限不足與一般失敗
    pub fn from_storage_io(context: impl Into<String>, err: &io::Error) -> Self {
        let context = context.into();
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(format!("{context}: {err}"))
        } else {
            Self::Persistence(format!("{context}: {err}"))
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_io_classification() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ComposeError::from_storage_io("commit", &denied),
            ComposeError::PermissionDenied(_)
        ));

        let other = io::Error::other("disk full");
        assert!(matches!(
            ComposeError::from_storage_io("commit", &other),
            ComposeError::Persistence(_)
        ));
    }

    #[test]
    fn test_engine_error_mentions_stage() {
        let err = ComposeError::Engine {
            stage: Stage::Muxing,
            diagnostic: "exit code 1".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("muxing"));
        assert!(text.contains("exit code 1"));
    }
}
