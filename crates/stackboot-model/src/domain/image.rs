use serde::{Deserialize, Serialize};

use crate::{ImageStatus, Series};

/// Image as reported by the image service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub status: ImageStatus,
}

impl Image {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: ImageStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
        }
    }
}

/// Resolved image together with the series it was requested for.
///
/// The status is owned by the cloud: the provisioner replaces a handle's
/// status only with a freshly fetched value, never sets it on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub series: Series,
    pub id: String,
    pub name: String,
    pub status: ImageStatus,
}

impl ImageHandle {
    pub fn from_image(series: impl Into<Series>, image: Image) -> Self {
        Self {
            series: series.into(),
            id: image.id,
            name: image.name,
            status: image.status,
        }
    }

    /// Replace cloud-observed fields with a fresh read of the same image.
    pub fn observe(&mut self, image: Image) {
        self.name = image.name;
        self.status = image.status;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
