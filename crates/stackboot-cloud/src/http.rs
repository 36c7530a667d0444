use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::errors::OpenStackError;

pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Send `req`; any non-2xx answer becomes [`OpenStackError::Status`].
pub(crate) async fn send(req: RequestBuilder, resource: &str) -> Result<Response, OpenStackError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(OpenStackError::Status {
        resource: resource.to_string(),
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, OpenStackError> {
    let body = resp.text().await?;
    parse_json(&body)
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, OpenStackError> {
    serde_json::from_str(body).map_err(|e| {
        OpenStackError::InvalidResponse(format!("failed to parse response: {e}, body: {body}"))
    })
}

pub(crate) fn parse_url(raw: &str) -> Result<Url, OpenStackError> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| OpenStackError::InvalidResponse(format!("endpoint '{raw}': {e}")))?;
    if url.cannot_be_a_base() {
        return Err(OpenStackError::InvalidResponse(format!(
            "endpoint '{raw}' is not a base url"
        )));
    }
    Ok(url)
}

/// `base` with `segments` appended as path segments.
pub(crate) fn join<I, S>(base: &Url, segments: I) -> Url
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
