use super::*;
use crate::schema::XSD_STRING;
use serde_json::json;
use std::cell::RefCell;
use std::collections::BTreeMap;

const ENTRYPOINT: &str = "https://catalog.example.org";

/// Serves canned responses and records the bearer token seen per URL.
#[derive(Default)]
struct FakeTransport {
    responses: BTreeMap<String, Result<FetchedDocument, TransportError>>,
    seen: RefCell<Vec<(String, Option<String>)>>,
}

impl FakeTransport {
    fn respond(mut self, url: &str, response: Result<FetchedDocument, TransportError>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }
}

impl Transport for FakeTransport {
    fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<FetchedDocument, TransportError> {
        self.seen
            .borrow_mut()
            .push((url.to_string(), bearer.map(str::to_string)));
        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(TransportError::Status(404)))
    }
}

fn entry_doc() -> Value {
    json!({
        "@context": "/contexts/Entrypoint",
        "@id": "/",
        "@type": "Entrypoint",
        "person": "/people",
        "manuscript": "/manuscripts"
    })
}

fn collection_property(key: &str, class: &str) -> Value {
    json!({
        "@type": "hydra:SupportedProperty",
        "hydra:property": {
            "@id": format!("#Entrypoint/{key}"),
            "@type": "hydra:Link",
            "domain": "#Entrypoint",
            "rdfs:range": [
                {"@id": "hydra:Collection"},
                {"owl:equivalentClass": {
                    "owl:onProperty": {"@id": "hydra:member"},
                    "owl:allValuesFrom": {"@id": class}
                }}
            ]
        },
        "hydra:title": format!("The collection of {class} resources")
    })
}

fn field_property(name: &str, range: &str) -> Value {
    json!({
        "@type": "hydra:SupportedProperty",
        "hydra:property": {
            "@id": format!("#Thing/{name}"),
            "@type": "rdf:Property",
            "rdfs:label": name,
            "range": range
        },
        "hydra:title": name,
        "hydra:readable": true,
        "hydra:writeable": true
    })
}

fn api_doc() -> Value {
    json!({
        "@id": "/docs.jsonld",
        "hydra:title": "Manuscript catalog",
        "hydra:entrypoint": "/",
        "hydra:supportedClass": [
            {
                "@id": "#Person",
                "hydra:title": "Person",
                "hydra:supportedProperty": [
                    field_property("name", "xmls:string"),
                    field_property("dateBirth", "xmls:string"),
                    field_property("works", "#Work")
                ]
            },
            {
                "@id": "#Manuscript",
                "hydra:title": "Manuscript",
                "hydra:supportedProperty": [
                    field_property("date", "xmls:string"),
                    field_property("date", "xmls:string")
                ]
            },
            {
                "@id": "#Entrypoint",
                "hydra:title": "The API entrypoint",
                "hydra:supportedProperty": [
                    collection_property("person", "#Person"),
                    collection_property("manuscript", "#Manuscript")
                ]
            }
        ]
    })
}

fn doc(body: Value, link: Option<&str>) -> Result<FetchedDocument, TransportError> {
    Ok(FetchedDocument {
        body,
        link: link.map(str::to_string),
    })
}

fn docs_link() -> String {
    format!("<{ENTRYPOINT}/docs.jsonld>; rel=\"{API_DOCUMENTATION_REL}\"")
}

#[test]
fn parses_collections_from_entrypoint_class() {
    let api = parse_hydra_documentation(ENTRYPOINT, &entry_doc(), &api_doc())
        .expect("parse documentation");
    assert_eq!(api.title.as_deref(), Some("Manuscript catalog"));
    let names: Vec<&str> = api.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["people", "manuscripts"]);

    let people = &api.resources[0];
    let name = people.field("name").expect("name field");
    assert_eq!(name.range.as_deref(), Some(XSD_STRING));
    assert_eq!(
        people.field("works").and_then(|f| f.range.as_deref()),
        Some("#Work")
    );
    assert_eq!(api.resources[1].fields.len(), 1, "duplicate fields collapse");
}

#[test]
fn parse_rejects_documentation_without_classes() {
    let err = parse_hydra_documentation(ENTRYPOINT, &entry_doc(), &json!({}))
        .expect_err("reject empty documentation");
    assert!(matches!(err, DiscoveryError::Malformed(_)));
}

#[test]
fn link_header_selects_api_documentation() {
    let header = format!(
        "</contexts/Entrypoint>; rel=\"http://www.w3.org/ns/json-ld#context\", </docs.jsonld>; rel=\"{API_DOCUMENTATION_REL}\""
    );
    assert_eq!(
        api_documentation_link(&header).as_deref(),
        Some("/docs.jsonld")
    );
    assert_eq!(api_documentation_link("</other>; rel=\"next\""), None);
}

#[test]
fn relative_links_resolve_against_origin() {
    assert_eq!(
        resolve_url("https://host.example/api", "/docs.jsonld"),
        "https://host.example/docs.jsonld"
    );
    assert_eq!(
        resolve_url("https://host.example/api", "docs.jsonld"),
        "https://host.example/api/docs.jsonld"
    );
    assert_eq!(
        resolve_url("https://host.example", "https://cdn.example/docs"),
        "https://cdn.example/docs"
    );
}

#[test]
fn discover_attaches_bearer_token_and_follows_link() {
    let transport = FakeTransport::default()
        .respond(&format!("{ENTRYPOINT}/"), doc(entry_doc(), Some(docs_link().as_str())))
        .respond(&format!("{ENTRYPOINT}/docs.jsonld"), doc(api_doc(), None));
    let credentials = SessionCredentials::with_token("secret");

    let discovery = discover(&transport, &credentials, ENTRYPOINT).expect("discover api");
    let Discovery::Api(api) = discovery else {
        panic!("expected discovered api");
    };
    assert_eq!(api.resources.len(), 2);
    let seen = transport.seen.borrow();
    assert_eq!(seen.len(), 2);
    assert!(seen
        .iter()
        .all(|(_, bearer)| bearer.as_deref() == Some("secret")));
}

#[test]
fn discover_falls_back_to_default_docs_path() {
    let transport = FakeTransport::default()
        .respond(&format!("{ENTRYPOINT}/"), doc(entry_doc(), None))
        .respond(&format!("{ENTRYPOINT}/docs.jsonld"), doc(api_doc(), None));
    let credentials = SessionCredentials::default();

    let discovery = discover(&transport, &credentials, &format!("{ENTRYPOINT}/"))
        .expect("discover api");
    assert!(matches!(discovery, Discovery::Api(_)));
    assert_eq!(transport.seen.borrow()[0].1, None);
}

#[test]
fn unauthorized_yields_login_required_and_clears_token() {
    let transport = FakeTransport::default()
        .respond(&format!("{ENTRYPOINT}/"), doc(entry_doc(), Some(docs_link().as_str())))
        .respond(
            &format!("{ENTRYPOINT}/docs.jsonld"),
            Err(TransportError::Unauthorized),
        );
    let credentials = SessionCredentials::with_token("expired");

    let discovery = discover(&transport, &credentials, ENTRYPOINT).expect("login is not an error");
    assert_eq!(discovery, Discovery::LoginRequired { api: None });
    assert_eq!(credentials.token(), None);
}

#[test]
fn other_failures_propagate_with_url() {
    let transport = FakeTransport::default().respond(
        &format!("{ENTRYPOINT}/"),
        Err(TransportError::Status(503)),
    );
    let credentials = SessionCredentials::default();

    let err = discover(&transport, &credentials, ENTRYPOINT).expect_err("propagate 503");
    match err {
        DiscoveryError::Fetch { url, source } => {
            assert_eq!(url, format!("{ENTRYPOINT}/"));
            assert_eq!(source, TransportError::Status(503));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn session_credentials_lifecycle() {
    let credentials = SessionCredentials::default();
    assert_eq!(credentials.token(), None);
    credentials.set_token("t1".to_string());
    assert_eq!(credentials.token().as_deref(), Some("t1"));
    credentials.clear();
    assert_eq!(credentials.token(), None);
}
