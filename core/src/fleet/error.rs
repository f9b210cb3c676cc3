use std::fmt;

use serde::Serialize;

use crate::directory::{DirectoryError, DirectoryErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetErrorKind {
    NotFound,
    NoLicenseAvailable,
    NoLicenseAssigned,
    NoDefaultGroupFound,
    InvalidCursor,
    TransportError,
}

impl FleetErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NoLicenseAvailable => "no_license_available",
            Self::NoLicenseAssigned => "no_license_assigned",
            Self::NoDefaultGroupFound => "no_default_group_found",
            Self::InvalidCursor => "invalid_cursor",
            Self::TransportError => "transport_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetError {
    pub kind: FleetErrorKind,
    pub message: String,
}

impl FleetError {
    pub fn new(kind: FleetErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FleetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FleetError {}

impl From<DirectoryError> for FleetError {
    fn from(err: DirectoryError) -> Self {
        let kind = match err.kind {
            DirectoryErrorKind::NotFound => FleetErrorKind::NotFound,
            _ => FleetErrorKind::TransportError,
        };
        Self::new(kind, err.message)
    }
}

pub fn not_found(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::NotFound, message)
}

pub fn no_license_available(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::NoLicenseAvailable, message)
}

pub fn no_license_assigned(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::NoLicenseAssigned, message)
}

pub fn no_default_group_found(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::NoDefaultGroupFound, message)
}

pub fn invalid_cursor(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::InvalidCursor, message)
}

pub fn transport_error(message: impl Into<String>) -> FleetError {
    FleetError::new(FleetErrorKind::TransportError, message)
}
