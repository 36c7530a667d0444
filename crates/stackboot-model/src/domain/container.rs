use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Swift header controlling who may read a container's objects.
pub const CONTAINER_READ_HEADER: &str = "X-Container-Read";
/// Referrer ACL granting anonymous read access.
pub const PUBLIC_READ_ACL: &str = ".r:*";

/// Object-store container the published image metadata lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTarget {
    pub name: String,
    pub access_headers: BTreeMap<String, String>,
}

impl ContainerTarget {
    /// Container whose contents are publicly readable.
    pub fn public_read(name: impl Into<String>) -> Self {
        let mut access_headers = BTreeMap::new();
        access_headers.insert(CONTAINER_READ_HEADER.to_string(), PUBLIC_READ_ACL.to_string());
        Self {
            name: name.into(),
            access_headers,
        }
    }
}
