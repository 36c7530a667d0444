//! OpenStack adapters: Keystone v2.0 auth, Glance v1 images and Swift objects.

mod errors;
pub use errors::OpenStackError;

mod http;

pub mod keystone;
pub use keystone::{CatalogEntry, EndpointRecord, Session};

mod glance;
pub use glance::GlanceClient;

mod swift;
pub use swift::SwiftClient;

use std::time::Duration;

use stackboot_model::CloudConfig;
use tracing::info;

pub const IMAGE_SERVICE: &str = "image";
pub const OBJECT_STORE_SERVICE: &str = "object-store";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Authenticated clients for one tenant.
pub struct OpenStack {
    pub glance: GlanceClient,
    pub swift: SwiftClient,
}

impl OpenStack {
    /// Authenticate and resolve the image and object-store endpoints.
    pub async fn connect(cloud: &CloudConfig) -> Result<Self, OpenStackError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("stackboot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = keystone::authenticate(&http, cloud).await?;
        let region = cloud.region.as_deref();
        let image_url = session.endpoint(IMAGE_SERVICE, region)?;
        let storage_url = session.endpoint(OBJECT_STORE_SERVICE, region)?;
        info!(image = %image_url, storage = %storage_url, "authenticated");

        Ok(Self {
            glance: GlanceClient::new(http.clone(), &image_url, session.token.clone())?,
            swift: SwiftClient::new(http, &storage_url, session.token)?,
        })
    }
}
