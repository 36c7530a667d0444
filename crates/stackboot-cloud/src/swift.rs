use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use stackboot_core::{CloudError, ObjectStore};
use tracing::{debug, trace};

use crate::{
    errors::OpenStackError,
    http::{AUTH_TOKEN_HEADER, join, parse_json, parse_url, send},
};

/// Swift object storage for one account.
pub struct SwiftClient {
    http: Client,
    storage_url: String,
    base: Url,
    token: String,
}

#[derive(Deserialize)]
struct ObjectRecord {
    name: String,
}

impl SwiftClient {
    pub fn new(http: Client, storage_url: &str, token: impl Into<String>) -> Result<Self, OpenStackError> {
        let base = parse_url(storage_url)?;
        Ok(Self {
            http,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            base,
            token: token.into(),
        })
    }

    fn container_url(&self, container: &str) -> Url {
        join(&self.base, [container])
    }

    /// Object names keep `/` as path separators.
    fn object_url(&self, container: &str, object: &str) -> Url {
        join(&self.base, std::iter::once(container).chain(object.split('/')))
    }

    async fn put_container(
        &self,
        container: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), OpenStackError> {
        let mut req = self
            .http
            .put(self.container_url(container))
            .header(AUTH_TOKEN_HEADER, self.token.as_str());
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        send(req, &format!("container {container}")).await?;
        debug!(%container, "container created");
        Ok(())
    }

    async fn list(&self, container: &str) -> Result<Vec<String>, OpenStackError> {
        let resource = format!("container {container}");
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let url = listing_url(self.container_url(container), marker.as_deref());
            trace!(%url, "listing objects");
            let resp = send(
                self.http.get(url).header(AUTH_TOKEN_HEADER, self.token.as_str()),
                &resource,
            )
            .await?;
            let page = parse_listing(&resp.text().await?)?;
            if page.is_empty() {
                break;
            }
            marker = page.last().cloned();
            names.extend(page);
        }
        Ok(names)
    }

    async fn delete(&self, url: Url, resource: &str) -> Result<(), OpenStackError> {
        send(
            self.http.delete(url).header(AUTH_TOKEN_HEADER, self.token.as_str()),
            resource,
        )
        .await?;
        Ok(())
    }

    async fn put(&self, container: &str, object: &str, body: Vec<u8>) -> Result<(), OpenStackError> {
        send(
            self.http
                .put(self.object_url(container, object))
                .header(AUTH_TOKEN_HEADER, self.token.as_str())
                .body(body),
            &format!("object {container}/{object}"),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    fn endpoint(&self) -> &str {
        &self.storage_url
    }

    async fn create_container(
        &self,
        container: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(), CloudError> {
        Ok(self.put_container(container, headers).await?)
    }

    async fn list_objects(&self, container: &str) -> Result<Vec<String>, CloudError> {
        Ok(self.list(container).await?)
    }

    async fn delete_object(&self, container: &str, object: &str) -> Result<(), CloudError> {
        let url = self.object_url(container, object);
        Ok(self.delete(url, &format!("object {container}/{object}")).await?)
    }

    async fn delete_container(&self, container: &str) -> Result<(), CloudError> {
        let url = self.container_url(container);
        Ok(self.delete(url, &format!("container {container}")).await?)
    }

    async fn put_object(
        &self,
        container: &str,
        object: &str,
        body: Vec<u8>,
    ) -> Result<(), CloudError> {
        Ok(self.put(container, object, body).await?)
    }
}

fn listing_url(mut url: Url, marker: Option<&str>) -> Url {
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("format", "json");
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }
    url
}

/// An empty container may answer with no body at all.
fn parse_listing(body: &str) -> Result<Vec<String>, OpenStackError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<ObjectRecord> = parse_json(body)?;
    Ok(records.into_iter().map(|r| r.name).collect())
}
