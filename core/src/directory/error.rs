use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectoryErrorKind {
    NotFound,
    Conflict,
    Authentication,
    InvalidRequest,
    Transport,
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryError {
    pub kind: DirectoryErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
}

impl DirectoryError {
    pub fn new(kind: DirectoryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DirectoryError {}

pub fn not_found(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::NotFound, message)
}

pub fn conflict(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::Conflict, message)
}

pub fn authentication(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::Authentication, message)
}

pub fn invalid_request(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::InvalidRequest, message)
}

pub fn transport(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::Transport, message)
}

pub fn protocol(message: impl Into<String>) -> DirectoryError {
    DirectoryError::new(DirectoryErrorKind::Protocol, message)
}

/// Maps a non-success Graph response to an error kind.
///
/// `message` is the OData error message when the body carried one, otherwise the raw body.
pub fn map_http_error(status: u16, message: &str) -> DirectoryError {
    let normalized = message.chars().take(240).collect::<String>();
    let lowered = normalized.to_ascii_lowercase();

    let mut err = if status == 404 {
        not_found(format!("directory returned status {status}"))
    } else if status == 401 || status == 403 {
        authentication(format!("directory returned status {status}"))
    } else if status == 409 || (status == 400 && lowered.contains("already exist")) {
        conflict(format!("directory returned status {status}"))
    } else if (400..500).contains(&status) && status != 408 && status != 429 {
        invalid_request(format!("directory returned status {status}"))
    } else {
        transport(format!("directory returned status {status}"))
    };
    err = err.with_http_status(status);

    if !normalized.is_empty() {
        err.message = format!("{}: {}", err.message, normalized);
    }

    err
}
