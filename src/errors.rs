use std::path::PathBuf;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("empty permission raw router line")]
    EmptyRouterLine,
    #[error("can not parse router comment \"{0}\"")]
    UnparsableRouterLine(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(String),
}

impl AppError {
    pub fn unparsable_router_line(line: impl Into<String>) -> Self {
        Self::UnparsableRouterLine(line.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }

    /// Stable label used when aggregating failures over a scan.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::EmptyRouterLine => "empty_router_line",
            AppError::UnparsableRouterLine(_) => "unparsable_router_line",
            AppError::Configuration(_) => "configuration",
            AppError::Io { .. } => "io",
            AppError::Json(_) => "json",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for AppError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self::Json(format!("at `{}`: {}", value.path(), value.inner()))
    }
}
