use async_trait::async_trait;
use reqwest::{Client, Url, header::HeaderMap};
use serde::Deserialize;
use stackboot_core::{CloudError, ImageCatalog};
use stackboot_model::{Image, ImageSpec, ImageStatus};
use tracing::{debug, trace};

use crate::{
    errors::OpenStackError,
    http::{AUTH_TOKEN_HEADER, join, parse_url, read_json, send},
};

const PAGE_SIZE: usize = 100;
const META_PREFIX: &str = "x-image-meta-";
const COPY_FROM_HEADER: &str = "x-glance-api-copy-from";

/// Glance v1 image API.
pub struct GlanceClient {
    http: Client,
    base: Url,
    token: String,
}

#[derive(Deserialize)]
struct ImagePage {
    images: Vec<ImageRecord>,
}

#[derive(Deserialize)]
struct CreatedImage {
    image: ImageRecord,
}

#[derive(Deserialize)]
struct ImageRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    status: String,
}

impl From<ImageRecord> for Image {
    fn from(r: ImageRecord) -> Self {
        Image::new(r.id, r.name.unwrap_or_default(), ImageStatus::parse(&r.status))
    }
}

impl GlanceClient {
    /// `endpoint` is the catalog URL, with or without the `/v1` suffix.
    pub fn new(http: Client, endpoint: &str, token: impl Into<String>) -> Result<Self, OpenStackError> {
        Ok(Self {
            http,
            base: api_base(endpoint)?,
            token: token.into(),
        })
    }

    async fn list_images(&self) -> Result<Vec<Image>, OpenStackError> {
        let mut images = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let url = page_url(&self.base, marker.as_deref());
            trace!(%url, "listing images");
            let resp = send(self.http.get(url).header(AUTH_TOKEN_HEADER, self.token.as_str()), "images").await?;
            let page: ImagePage = read_json(resp).await?;

            let count = page.images.len();
            marker = page.images.last().map(|r| r.id.clone());
            images.extend(page.images.into_iter().map(Image::from));
            if count < PAGE_SIZE {
                break;
            }
        }

        debug!(count = images.len(), "images listed");
        Ok(images)
    }

    async fn create_image(&self, spec: &ImageSpec) -> Result<Image, OpenStackError> {
        let mut req = self
            .http
            .post(join(&self.base, ["images"]))
            .header(AUTH_TOKEN_HEADER, self.token.as_str());
        for (name, value) in create_headers(spec) {
            req = req.header(name, value);
        }

        let resp = send(req, &format!("image {}", spec.name)).await?;
        let created: CreatedImage = read_json(resp).await?;
        Ok(created.image.into())
    }

    async fn head_image(&self, id: &str) -> Result<Image, OpenStackError> {
        let resp = send(
            self.http
                .head(join(&self.base, ["images", id]))
                .header(AUTH_TOKEN_HEADER, self.token.as_str()),
            &format!("image {id}"),
        )
        .await?;
        image_from_headers(resp.headers())
    }

    async fn delete_image(&self, id: &str) -> Result<(), OpenStackError> {
        send(
            self.http
                .delete(join(&self.base, ["images", id]))
                .header(AUTH_TOKEN_HEADER, self.token.as_str()),
            &format!("image {id}"),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ImageCatalog for GlanceClient {
    async fn list(&self) -> Result<Vec<Image>, CloudError> {
        Ok(self.list_images().await?)
    }

    async fn create(&self, spec: &ImageSpec) -> Result<Image, CloudError> {
        Ok(self.create_image(spec).await?)
    }

    async fn get(&self, id: &str) -> Result<Image, CloudError> {
        Ok(self.head_image(id).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), CloudError> {
        Ok(self.delete_image(id).await?)
    }
}

fn api_base(endpoint: &str) -> Result<Url, OpenStackError> {
    let url = parse_url(endpoint)?;
    if url.path_segments().and_then(|mut s| s.next_back()) == Some("v1") {
        return Ok(url);
    }
    Ok(join(&url, ["v1"]))
}

fn page_url(base: &Url, marker: Option<&str>) -> Url {
    let mut url = join(base, ["images", "detail"]);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("limit", &PAGE_SIZE.to_string());
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }
    url
}

/// Metadata headers of a create request; the bytes are copied from the source URL.
fn create_headers(spec: &ImageSpec) -> Vec<(String, String)> {
    let meta = |key: &str| format!("{META_PREFIX}{key}");
    vec![
        (meta("name"), spec.name.clone()),
        (meta("disk_format"), spec.disk_format.clone()),
        (meta("container_format"), spec.container_format.clone()),
        (meta("min_disk"), spec.min_disk.to_string()),
        (meta("min_ram"), spec.min_ram.to_string()),
        (meta("is_public"), "false".to_string()),
        (COPY_FROM_HEADER.to_string(), spec.source_url.clone()),
    ]
}

fn image_from_headers(headers: &HeaderMap) -> Result<Image, OpenStackError> {
    let field = |key: &str| -> Result<String, OpenStackError> {
        let name = format!("{META_PREFIX}{key}");
        headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| OpenStackError::InvalidResponse(format!("missing header {name}")))
    };

    Ok(Image::new(
        field("id")?,
        field("name").unwrap_or_default(),
        ImageStatus::parse(&field("status")?),
    ))
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;
    use crate::http::parse_json;

    #[test]
    fn base_gets_version_suffix_once() {
        assert_eq!(
            api_base("http://glance:9292").unwrap().as_str(),
            "http://glance:9292/v1"
        );
        assert_eq!(
            api_base("http://glance:9292/v1/").unwrap().as_str(),
            "http://glance:9292/v1"
        );
    }

    #[test]
    fn page_url_carries_marker() {
        let base = api_base("http://glance:9292").unwrap();
        assert_eq!(
            page_url(&base, None).as_str(),
            "http://glance:9292/v1/images/detail?limit=100"
        );
        assert_eq!(
            page_url(&base, Some("img-9")).as_str(),
            "http://glance:9292/v1/images/detail?limit=100&marker=img-9"
        );
    }

    #[test]
    fn create_request_copies_from_source() {
        let spec = ImageSpec::new("trusty-image", "http://example/trusty.img");
        let headers = create_headers(&spec);
        let get = |k: &str| {
            headers
                .iter()
                .find(|(name, _)| name == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("x-image-meta-name"), Some("trusty-image"));
        assert_eq!(get("x-image-meta-disk_format"), Some("qcow2"));
        assert_eq!(get("x-image-meta-container_format"), Some("bare"));
        assert_eq!(get("x-image-meta-min_disk"), Some("8"));
        assert_eq!(get("x-image-meta-min_ram"), Some("256"));
        assert_eq!(get("x-image-meta-is_public"), Some("false"));
        assert_eq!(get("x-glance-api-copy-from"), Some("http://example/trusty.img"));
    }

    #[test]
    fn head_response_becomes_image() {
        let mut headers = HeaderMap::new();
        headers.insert("x-image-meta-id", HeaderValue::from_static("img-1"));
        headers.insert("x-image-meta-name", HeaderValue::from_static("trusty-image"));
        headers.insert("x-image-meta-status", HeaderValue::from_static("saving"));

        let image = image_from_headers(&headers).unwrap();
        assert_eq!(image, Image::new("img-1", "trusty-image", ImageStatus::Saving));
    }

    #[test]
    fn head_response_without_status_is_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-image-meta-id", HeaderValue::from_static("img-1"));
        assert!(matches!(
            image_from_headers(&headers),
            Err(OpenStackError::InvalidResponse(_))
        ));
    }

    #[test]
    fn listing_page_parses_statuses() {
        let page: ImagePage = parse_json(
            r#"{"images": [
                {"id": "a", "name": "trusty-image", "status": "active", "size": 1},
                {"id": "b", "name": null, "status": "killed"}
            ]}"#,
        )
        .unwrap();
        let images: Vec<Image> = page.images.into_iter().map(Image::from).collect();

        assert_eq!(images[0].status, ImageStatus::Active);
        assert_eq!(images[1].name, "");
        assert!(images[1].status.is_failed());
    }
}
