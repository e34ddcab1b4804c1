//! Poll-level failures surfaced to monitor consumers.
//!
//! Attribute-level problems (a single missing sysfs file, an unparsable
//! number) do not become a `PollError` on their own; readers degrade those
//! fields to `None`. Only when every field a derivation needs is missing
//! (`AttributeUnavailable`), or a sample cannot be taken at all, does a
//! poll fail.

use serde::{Deserialize, Serialize};

/// Category of a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollErrorKind {
    /// Battery or interface directory is gone (or was never there).
    ResourceNotFound,
    /// Interface flags could not be queried.
    SocketOrIoctl,
    /// `/proc/net/dev` unreadable, in an unknown format, or missing the interface.
    Statistics,
    /// `/proc/net/wireless` exists but could not be parsed.
    WirelessDetails,
    /// The device exists but none of the attributes a metric is derived
    /// from are readable.
    AttributeUnavailable,
}

impl PollErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollErrorKind::ResourceNotFound => "resource-not-found",
            PollErrorKind::SocketOrIoctl => "socket-or-ioctl",
            PollErrorKind::Statistics => "statistics",
            PollErrorKind::WirelessDetails => "wireless-details",
            PollErrorKind::AttributeUnavailable => "attribute-unavailable",
        }
    }
}

/// A failed poll: error kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollError {
    pub kind: PollErrorKind,
    pub message: String,
}

impl PollError {
    pub fn new(kind: PollErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(PollErrorKind::ResourceNotFound, message)
    }
}

impl std::fmt::Display for PollError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for PollError {}
