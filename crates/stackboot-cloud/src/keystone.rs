//! Keystone v2.0 password authentication and service catalog lookup.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use stackboot_model::CloudConfig;
use tracing::debug;

use crate::{
    errors::OpenStackError,
    http::{read_json, send},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    tenant_name: &'a str,
    password_credentials: PasswordCredentials<'a>,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a CloudConfig> for AuthRequest<'a> {
    fn from(cloud: &'a CloudConfig) -> Self {
        Self {
            auth: AuthBody {
                tenant_name: &cloud.tenant_name,
                password_credentials: PasswordCredentials {
                    username: &cloud.username,
                    password: &cloud.password,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Access {
    token: Token,
    #[serde(default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct Token {
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointRecord {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

/// Token plus the catalog it was issued with.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub catalog: Vec<CatalogEntry>,
}

impl Session {
    /// Public URL of `service_type`, restricted to `region` when given.
    pub fn endpoint(&self, service_type: &str, region: Option<&str>) -> Result<String, OpenStackError> {
        let missing = || OpenStackError::MissingEndpoint {
            service: service_type.to_string(),
            region: region.map(str::to_string),
        };

        let entry = self
            .catalog
            .iter()
            .find(|e| e.service_type == service_type)
            .ok_or_else(missing)?;

        let endpoint = match region {
            Some(region) => entry
                .endpoints
                .iter()
                .find(|e| e.region.as_deref() == Some(region)),
            None => entry.endpoints.first(),
        };
        endpoint.map(|e| e.public_url.clone()).ok_or_else(missing)
    }
}

/// `POST {auth-url}/tokens` with the tenant's password credentials.
pub async fn authenticate(http: &Client, cloud: &CloudConfig) -> Result<Session, OpenStackError> {
    let url = format!("{}/tokens", cloud.auth_url.trim_end_matches('/'));
    debug!(%url, tenant = %cloud.tenant_name, user = %cloud.username, "requesting token");

    let resp = send(http.post(&url).json(&AuthRequest::from(cloud)), "tokens")
        .await
        .map_err(|e| match e {
            OpenStackError::Status { status, body, .. } if status == 401 || status == 403 => {
                OpenStackError::Auth(format!("identity service answered {status}: {body}"))
            }
            other => other,
        })?;

    let parsed: AuthResponse = read_json(resp).await?;
    Ok(session_from(parsed))
}

fn session_from(resp: AuthResponse) -> Session {
    Session {
        token: resp.access.token.id,
        catalog: resp.access.service_catalog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parse_json;

    const RESPONSE: &str = r#"{
        "access": {
            "token": {"id": "tok-123", "expires": "2030-01-01T00:00:00Z"},
            "serviceCatalog": [
                {
                    "type": "image",
                    "name": "glance",
                    "endpoints": [
                        {"region": "RegionOne", "publicURL": "http://glance-one:9292"},
                        {"region": "RegionTwo", "publicURL": "http://glance-two:9292"}
                    ]
                },
                {
                    "type": "object-store",
                    "name": "swift",
                    "endpoints": [
                        {"region": "RegionOne", "publicURL": "http://swift:8080/v1/AUTH_demo"}
                    ]
                }
            ]
        }
    }"#;

    fn session() -> Session {
        session_from(parse_json(RESPONSE).unwrap())
    }

    #[test]
    fn parses_token_and_catalog() {
        let s = session();
        assert_eq!(s.token, "tok-123");
        assert_eq!(s.catalog.len(), 2);
        assert_eq!(s.catalog[0].name, "glance");
    }

    #[test]
    fn selects_endpoint_by_region() {
        let s = session();
        assert_eq!(
            s.endpoint("image", Some("RegionTwo")).unwrap(),
            "http://glance-two:9292"
        );
        assert_eq!(s.endpoint("image", None).unwrap(), "http://glance-one:9292");
        assert_eq!(
            s.endpoint("object-store", Some("RegionOne")).unwrap(),
            "http://swift:8080/v1/AUTH_demo"
        );
    }

    #[test]
    fn missing_service_or_region_is_an_error() {
        let s = session();
        assert!(matches!(
            s.endpoint("compute", None),
            Err(OpenStackError::MissingEndpoint { ref service, .. }) if service == "compute"
        ));
        assert!(matches!(
            s.endpoint("object-store", Some("RegionTwo")),
            Err(OpenStackError::MissingEndpoint { region: Some(ref r), .. }) if r == "RegionTwo"
        ));
    }

    #[test]
    fn request_body_shape() {
        let cloud = CloudConfig {
            auth_url: "https://keystone.example:5000/v2.0".into(),
            tenant_name: "demo".into(),
            username: "admin".into(),
            password: "secret".into(),
            region: None,
            use_floating_ip: false,
        };
        let body = serde_json::to_value(AuthRequest::from(&cloud)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "auth": {
                    "tenantName": "demo",
                    "passwordCredentials": {"username": "admin", "password": "secret"}
                }
            })
        );
    }
}
