//! Hydra API discovery and the HTTP transport behind it.
//!
//! Discovery fetches the API entrypoint, follows its `apiDocumentation` link and
//! maps the documented collections to [`ResourceDescription`]s. A 401 from the
//! remote at any step is not an error: it becomes [`Discovery::LoginRequired`]
//! so the caller can redirect to the login route.
use crate::schema::{ApiDescription, FieldDescription, ResourceDescription};
use serde_json::Value;
use std::sync::RwLock;
use thiserror::Error;

/// Link relation pointing from the entrypoint to the API documentation.
pub const API_DOCUMENTATION_REL: &str = "http://www.w3.org/ns/hydra/core#apiDocumentation";
const DEFAULT_DOCS_PATH: &str = "/docs.jsonld";
const ENTRYPOINT_CLASS_SUFFIX: &str = "#Entrypoint";
const XMLS_PREFIX: &str = "xmls:";
const XMLS_IRI: &str = "http://www.w3.org/2001/XMLSchema#";

/// Source of the bearer token attached to outgoing requests.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

/// In-memory session credentials: set on login, cleared on authorization failure.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    token: RwLock<Option<String>>,
}

impl SessionCredentials {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialProvider for SessionCredentials {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn set_token(&self, token: String) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

/// A JSON document fetched from the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub body: Value,
    /// Raw `Link` header, if the response carried one.
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request was not authorized")]
    Unauthorized,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(String),
}

/// Issues GET requests for JSON documents.
pub trait Transport {
    fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<FetchedDocument, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<FetchedDocument, TransportError> {
        let mut request = ureq::get(url).header("Accept", "application/ld+json");
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let mut response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(401)) => return Err(TransportError::Unauthorized),
            Err(ureq::Error::StatusCode(status)) => return Err(TransportError::Status(status)),
            Err(err) => return Err(TransportError::Request(err.to_string())),
        };
        let link = response
            .headers()
            .get("link")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .body_mut()
            .read_json::<Value>()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(FetchedDocument { body, link })
    }
}

/// Outcome of schema discovery that the annotator knows how to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    Api(ApiDescription),
    /// The remote refused the credentials. `api` holds anything discovered before that.
    LoginRequired { api: Option<ApiDescription> },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },
    #[error("malformed API documentation: {0}")]
    Malformed(String),
}

/// Fetch and parse the API description behind `entrypoint`.
pub fn discover(
    transport: &dyn Transport,
    credentials: &dyn CredentialProvider,
    entrypoint: &str,
) -> Result<Discovery, DiscoveryError> {
    let entrypoint = entrypoint.trim_end_matches('/');
    let entry_url = format!("{entrypoint}/");
    let entry_doc = match fetch(transport, credentials, &entry_url)? {
        Some(doc) => doc,
        None => return Ok(Discovery::LoginRequired { api: None }),
    };
    let docs_url = entry_doc
        .link
        .as_deref()
        .and_then(api_documentation_link)
        .map(|target| resolve_url(entrypoint, &target))
        .unwrap_or_else(|| format!("{entrypoint}{DEFAULT_DOCS_PATH}"));
    tracing::debug!(url = %docs_url, "fetching api documentation");
    let api_doc = match fetch(transport, credentials, &docs_url)? {
        Some(doc) => doc,
        None => return Ok(Discovery::LoginRequired { api: None }),
    };
    let api = parse_hydra_documentation(entrypoint, &entry_doc.body, &api_doc.body)?;
    tracing::info!(
        entrypoint,
        resources = api.resources.len(),
        "api documentation parsed"
    );
    Ok(Discovery::Api(api))
}

/// `Ok(None)` means the remote answered 401; credentials are cleared.
fn fetch(
    transport: &dyn Transport,
    credentials: &dyn CredentialProvider,
    url: &str,
) -> Result<Option<FetchedDocument>, DiscoveryError> {
    let token = credentials.token();
    match transport.get_json(url, token.as_deref()) {
        Ok(doc) => Ok(Some(doc)),
        Err(TransportError::Unauthorized) => {
            tracing::warn!(url, "unauthorized; clearing credentials");
            credentials.clear();
            Ok(None)
        }
        Err(source) => Err(DiscoveryError::Fetch {
            url: url.to_string(),
            source,
        }),
    }
}

/// Extract the `apiDocumentation` target from a `Link` header value.
pub fn api_documentation_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';').map(str::trim);
        let target = parts.next()?.strip_prefix('<')?.strip_suffix('>')?;
        let is_docs = parts.any(|param| {
            param
                .strip_prefix("rel=")
                .is_some_and(|rel| rel.trim_matches('"') == API_DOCUMENTATION_REL)
        });
        is_docs.then(|| target.to_string())
    })
}

fn resolve_url(base: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    let origin = origin_of(base);
    if target.starts_with('/') {
        format!("{origin}{target}")
    } else {
        format!("{}/{target}", base.trim_end_matches('/'))
    }
}

fn origin_of(url: &str) -> &str {
    let after_scheme = url.find("://").map(|idx| idx + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(idx) => &url[..after_scheme + idx],
        None => url,
    }
}

/// Build an [`ApiDescription`] from an entrypoint document and its Hydra documentation.
///
/// Each property of the documented `Entrypoint` class is a collection. The
/// resource name is the last path segment of the matching link in the
/// entrypoint document, and the fields come from the collection member class.
pub fn parse_hydra_documentation(
    entrypoint: &str,
    entry_doc: &Value,
    api_doc: &Value,
) -> Result<ApiDescription, DiscoveryError> {
    let classes = api_doc
        .get("hydra:supportedClass")
        .and_then(Value::as_array)
        .ok_or_else(|| DiscoveryError::Malformed("missing hydra:supportedClass".to_string()))?;
    let entry_class = classes
        .iter()
        .find(|class| {
            class
                .get("@id")
                .and_then(Value::as_str)
                .is_some_and(|id| id.ends_with(ENTRYPOINT_CLASS_SUFFIX))
        })
        .ok_or_else(|| DiscoveryError::Malformed("missing Entrypoint class".to_string()))?;

    let mut resources = Vec::new();
    for property in supported_properties(entry_class) {
        let Some(inner) = property.get("hydra:property") else {
            continue;
        };
        let Some(key) = inner
            .get("@id")
            .and_then(Value::as_str)
            .and_then(|id| id.rsplit('/').next())
        else {
            continue;
        };
        let Some(member_class) = collection_member_class(inner) else {
            continue;
        };
        let Some(link) = entry_doc.get(key).and_then(Value::as_str) else {
            tracing::debug!(key, "entrypoint has no link for collection");
            continue;
        };
        let name = link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(key)
            .to_string();
        let class = classes
            .iter()
            .find(|class| class.get("@id").and_then(Value::as_str) == Some(member_class))
            .ok_or_else(|| {
                DiscoveryError::Malformed(format!("unknown member class {member_class}"))
            })?;
        resources.push(ResourceDescription {
            name,
            fields: class_fields(class),
        });
    }

    let title = api_doc
        .get("hydra:title")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(ApiDescription {
        entrypoint: entrypoint.to_string(),
        title,
        resources,
    })
}

fn supported_properties(class: &Value) -> impl Iterator<Item = &Value> {
    class
        .get("hydra:supportedProperty")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn collection_member_class(property: &Value) -> Option<&str> {
    let ranges = property
        .get("rdfs:range")
        .or_else(|| property.get("range"))?
        .as_array()?;
    ranges.iter().find_map(|range| {
        range
            .get("owl:equivalentClass")?
            .get("owl:allValuesFrom")?
            .get("@id")?
            .as_str()
    })
}

fn class_fields(class: &Value) -> Vec<FieldDescription> {
    let mut fields: Vec<FieldDescription> = Vec::new();
    for property in supported_properties(class) {
        let inner = property.get("hydra:property");
        let name = property
            .get("hydra:title")
            .or_else(|| inner.and_then(|p| p.get("rdfs:label")))
            .and_then(Value::as_str);
        let Some(name) = name else {
            continue;
        };
        if fields.iter().any(|field| field.name == name) {
            continue;
        }
        let range = inner
            .and_then(|p| p.get("range").or_else(|| p.get("rdfs:range")))
            .and_then(Value::as_str)
            .map(expand_range);
        fields.push(FieldDescription::new(name, range));
    }
    fields
}

fn expand_range(range: &str) -> String {
    match range.strip_prefix(XMLS_PREFIX) {
        Some(local) => format!("{XMLS_IRI}{local}"),
        None => range.to_string(),
    }
}

#[cfg(test)]
#[path = "hydra_tests.rs"]
mod tests;
