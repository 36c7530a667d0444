use std::fmt;

use serde::{Deserialize, Serialize};

/// Cloud-defined lifecycle state of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    /// Registered, bytes not yet uploaded.
    Queued,
    /// Bytes are being copied in.
    Saving,
    /// Usable.
    Active,
    /// Upload failed; the image will never become active.
    Killed,
    /// Removed from the catalog.
    Deleted,
    /// Scheduled for removal.
    PendingDelete,
    /// Generic failure reported by the service.
    Error,
    /// Any state this build does not know about.
    #[serde(other)]
    Unknown,
}

impl ImageStatus {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, ImageStatus::Active)
    }

    /// Returns `true` for states an image never leaves towards `active`.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ImageStatus::Killed
                | ImageStatus::Deleted
                | ImageStatus::PendingDelete
                | ImageStatus::Error
        )
    }

    /// Returns `true` while the image may still become active.
    pub fn is_pending(&self) -> bool {
        !self.is_active() && !self.is_failed()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Queued => "queued",
            ImageStatus::Saving => "saving",
            ImageStatus::Active => "active",
            ImageStatus::Killed => "killed",
            ImageStatus::Deleted => "deleted",
            ImageStatus::PendingDelete => "pending_delete",
            ImageStatus::Error => "error",
            ImageStatus::Unknown => "unknown",
        }
    }

    /// Lenient parse used for header-encoded statuses; never fails.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => ImageStatus::Queued,
            "saving" => ImageStatus::Saving,
            "active" => ImageStatus::Active,
            "killed" => ImageStatus::Killed,
            "deleted" => ImageStatus::Deleted,
            "pending_delete" => ImageStatus::PendingDelete,
            "error" => ImageStatus::Error,
            _ => ImageStatus::Unknown,
        }
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
