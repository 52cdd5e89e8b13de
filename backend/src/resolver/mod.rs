//! Contributor term resolution against the repository taxonomy.
//!
//! A contributor cell names a person or corporate body. Resolution finds the
//! matching taxonomy term, creating it when it does not exist yet, and
//! rewrites the contributor as `namespace:role:tid`.
//!
//! ## Person lookup precedence
//!
//! Only one discriminator is sent with the name: email, else ORCID, else the
//! institution (resolved to its own term first and sent as `works_for`).
//! Results are cached per resolver, so a resolver must live no longer than
//! one batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::logs::{log_info, log_success};
use crate::config::Settings;
use crate::error::{ResolverError, ResolverResult};
use crate::gazetteer::excerpt;
use crate::models::{Contributor, ContributorName, Vocabulary};

/// Relationship type linking a person to the institution they work for.
pub const WORKS_FOR: &str = "schema:worksFor";

const LOOKUP_PATH: &str = "/term_from_term_name";
const CREATE_PATH: &str = "/entity/taxonomy_term?_format=json";

/// Looks up and creates taxonomy terms, caching results for one batch.
#[derive(Debug)]
pub struct TermResolver {
    base_url: String,
    username: String,
    password: Option<String>,
    client: reqwest::Client,
    people: HashMap<String, u64>,
    institutions: HashMap<String, u64>,
}

impl TermResolver {
    pub fn new(settings: &Settings, client: reqwest::Client) -> Self {
        Self {
            base_url: settings.term_lookup_url.trim_end_matches('/').to_string(),
            username: settings.drupal_username.clone(),
            password: settings.drupal_password.clone(),
            client,
            people: HashMap::new(),
            institutions: HashMap::new(),
        }
    }

    /// Resolve a contributor to `namespace:role:tid`.
    pub async fn resolve(&mut self, contributor: &Contributor) -> ResolverResult<String> {
        let name = ContributorName::parse(&contributor.name)
            .ok_or_else(|| ResolverError::MalformedName(contributor.name.clone()))?;

        let tid = match Vocabulary::from_id(&name.vocabulary) {
            Some(Vocabulary::Person) => self.ensure_person(contributor, &name.display_name).await?,
            Some(Vocabulary::CorporateBody) => self.ensure_institution(&name.display_name).await?,
            None => return Err(ResolverError::UnknownVocabulary(name.vocabulary)),
        };

        Ok(format!("{}:{}", name.relator(), tid))
    }

    /// Resolve a person by display name plus whichever attributes are known.
    pub async fn resolve_person(
        &mut self,
        name: &str,
        institution: Option<&str>,
        orcid: Option<&str>,
        email: Option<&str>,
    ) -> ResolverResult<u64> {
        let owned = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let contributor = Contributor {
            name: name.to_string(),
            orcid: owned(orcid),
            institution: owned(institution),
            email: owned(email),
            status: None,
        };
        self.ensure_person(&contributor, name).await
    }

    async fn ensure_person(
        &mut self,
        contributor: &Contributor,
        name: &str,
    ) -> ResolverResult<u64> {
        let key = person_cache_key(name, contributor);
        if let Some(tid) = self.people.get(&key) {
            return Ok(*tid);
        }

        let mut params = vec![
            ("name", name.to_string()),
            ("vocab", Vocabulary::Person.id().to_string()),
        ];
        let mut institution_id = None;
        if let Some(email) = &contributor.email {
            params.push(("email", email.clone()));
        } else if let Some(orcid) = &contributor.orcid {
            params.push(("orcid", orcid.clone()));
        } else if let Some(institution) = &contributor.institution {
            let id = self.ensure_institution(institution).await?;
            params.push(("works_for", id.to_string()));
            institution_id = Some(id);
        }

        if let Some(tid) = self.lookup_term(&params, name).await? {
            self.people.insert(key, tid);
            return Ok(tid);
        }

        if institution_id.is_none() {
            if let Some(institution) = &contributor.institution {
                institution_id = Some(self.ensure_institution(institution).await?);
            }
        }

        let term = NewTerm::person(
            name,
            contributor.email.as_deref(),
            contributor.orcid.as_deref(),
            institution_id,
        );
        let tid = self.create_term(&term, name).await?;
        self.people.insert(key, tid);
        Ok(tid)
    }

    async fn ensure_institution(&mut self, name: &str) -> ResolverResult<u64> {
        let key = name.trim().to_lowercase();
        if let Some(tid) = self.institutions.get(&key) {
            return Ok(*tid);
        }

        let params = vec![
            ("name", name.to_string()),
            ("vocab", Vocabulary::CorporateBody.id().to_string()),
        ];
        let tid = match self.lookup_term(&params, name).await? {
            Some(tid) => tid,
            None => self.create_term(&NewTerm::corporate_body(name), name).await?,
        };

        self.institutions.insert(key, tid);
        Ok(tid)
    }

    /// Find a term; a hit whose name differs from `expected_name` is a miss.
    async fn lookup_term(
        &self,
        params: &[(&str, String)],
        expected_name: &str,
    ) -> ResolverResult<Option<u64>> {
        let url = format!("{}{}", self.base_url, LOOKUP_PATH);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let body = read_success(response, &url).await?;
        let Some(term) = first_term(&body).map_err(|message| invalid(&url, message))? else {
            return Ok(None);
        };

        if let Some(found) = term.name() {
            if !same_name(found, expected_name) {
                log_info(format!(
                    "Term name {found:?} does not match {expected_name:?}, creating a new term"
                ));
                return Ok(None);
            }
        }
        term.tid().map_err(|message| invalid(&url, message))
    }

    async fn create_term(&self, term: &NewTerm<'_>, name: &str) -> ResolverResult<u64> {
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| ResolverError::MissingCredentials { name: name.to_string() })?;

        let url = format!("{}{}", self.base_url, CREATE_PATH);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(term)
            .send()
            .await?;

        let body = read_success(response, &url).await?;
        let tid = first_term(&body)
            .and_then(|term| match term {
                Some(term) => term.tid(),
                None => Ok(None),
            })
            .map_err(|message| invalid(&url, message))?
            .ok_or_else(|| {
                invalid(&url, "term create response did not include a term id".to_string())
            })?;

        log_success(format!("Created {} term {tid} for {name:?}", term.vocabulary()));
        Ok(tid)
    }
}

fn person_cache_key(name: &str, contributor: &Contributor) -> String {
    let field = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
    [
        name.trim().to_string(),
        field(&contributor.email),
        field(&contributor.orcid),
        field(&contributor.institution),
    ]
    .join("|")
    .to_lowercase()
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn invalid(url: &str, message: String) -> ResolverError {
    ResolverError::InvalidResponse {
        url: url.to_string(),
        message,
    }
}

async fn read_success(response: reqwest::Response, url: &str) -> ResolverResult<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ResolverError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: excerpt(&body),
        });
    }
    Ok(body)
}

// =============================================================================
// Wire formats
// =============================================================================

/// One `{ "value": ... }` entry of a Drupal field.
#[derive(Debug, Deserialize)]
struct FieldItem {
    value: Value,
}

/// The parts of a term record this resolver reads.
#[derive(Debug, Deserialize)]
struct TermRecord {
    #[serde(default)]
    tid: Vec<FieldItem>,
    #[serde(default)]
    name: Vec<FieldItem>,
}

impl TermRecord {
    fn tid(&self) -> Result<Option<u64>, String> {
        let Some(item) = self.tid.first() else {
            return Ok(None);
        };
        match &item.value {
            Value::Number(n) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| format!("term id {n} is not a positive integer")),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| format!("term id {s:?} is not a positive integer")),
            other => Err(format!("unexpected term id {other}")),
        }
    }

    fn name(&self) -> Option<&str> {
        self.name.first().and_then(|item| item.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TermBody {
    Many(Vec<TermRecord>),
    One(TermRecord),
}

/// First term of a lookup or create response; both list and object bodies occur.
fn first_term(body: &str) -> Result<Option<TermRecord>, String> {
    let parsed: TermBody = serde_json::from_str(body).map_err(|e| e.to_string())?;
    Ok(match parsed {
        TermBody::Many(terms) => terms.into_iter().next(),
        TermBody::One(term) => Some(term),
    })
}

#[derive(Debug, Serialize)]
struct TargetId<T> {
    target_id: T,
}

#[derive(Debug, Serialize)]
struct TextValue<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct TypedIdentifier<'a> {
    attr0: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Relationship {
    target_id: u64,
    rel_type: &'static str,
}

/// Payload for creating a taxonomy term.
#[derive(Debug, Serialize)]
struct NewTerm<'a> {
    vid: [TargetId<&'static str>; 1],
    name: [TextValue<'a>; 1],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_email: Vec<TextValue<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_identifier: Vec<TypedIdentifier<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_relationships: Vec<Relationship>,
}

impl<'a> NewTerm<'a> {
    fn corporate_body(name: &'a str) -> Self {
        Self::new(Vocabulary::CorporateBody, name)
    }

    fn person(
        name: &'a str,
        email: Option<&'a str>,
        orcid: Option<&'a str>,
        institution: Option<u64>,
    ) -> Self {
        let mut term = Self::new(Vocabulary::Person, name);
        term.field_email = email.map(|value| TextValue { value }).into_iter().collect();
        term.field_identifier = orcid
            .map(|value| TypedIdentifier { attr0: "orcid", value })
            .into_iter()
            .collect();
        term.field_relationships = institution
            .map(|target_id| Relationship { target_id, rel_type: WORKS_FOR })
            .into_iter()
            .collect();
        term
    }

    fn new(vocabulary: Vocabulary, name: &'a str) -> Self {
        Self {
            vid: [TargetId { target_id: vocabulary.id() }],
            name: [TextValue { value: name }],
            field_email: Vec::new(),
            field_identifier: Vec::new(),
            field_relationships: Vec::new(),
        }
    }

    fn vocabulary(&self) -> &'static str {
        self.vid[0].target_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use axum::extract::{Query, State};
    use axum::{routing::get, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    fn resolver(base: &str) -> TermResolver {
        let settings = Settings {
            term_lookup_url: base.to_string(),
            drupal_password: Some("secret".to_string()),
            ..Settings::default()
        };
        TermResolver::new(&settings, reqwest::Client::new())
    }

    fn query_string(q: &HashMap<String, String>) -> String {
        let mut pairs: Vec<String> = q.iter().map(|(k, v)| format!("{k}={v}")).collect();
        pairs.sort();
        pairs.join("&")
    }

    /// Taxonomy fake: answers lookups from `hits` (keyed by sorted query
    /// string) and creates terms starting at 1000.
    async fn taxonomy(hits: Vec<(&'static str, Value)>) -> (String, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let hits: Arc<HashMap<String, Value>> =
            Arc::new(hits.into_iter().map(|(k, v)| (k.to_string(), v)).collect());

        let lookup = {
            let calls = calls.clone();
            move |Query(q): Query<HashMap<String, String>>| {
                let calls = calls.clone();
                let hits = hits.clone();
                async move {
                    let key = query_string(&q);
                    calls.lock().unwrap().push(format!("GET {key}"));
                    Json(hits.get(&key).cloned().unwrap_or_else(|| json!([])))
                }
            }
        };
        let create = move |State(calls): State<Calls>, Json(payload): Json<Value>| async move {
            let mut calls = calls.lock().unwrap();
            calls.push(format!("POST {payload}"));
            Json(json!({"tid": [{"value": 1000 + calls.len()}]}))
        };

        let router = Router::new()
            .route("/term_from_term_name", get(lookup))
            .route("/entity/taxonomy_term", post(create))
            .with_state(calls.clone());
        (spawn(router).await, calls)
    }

    fn calls(c: &Calls) -> Vec<String> {
        c.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_email_takes_precedence_over_orcid_and_institution() {
        let (base, log) = taxonomy(vec![(
            "email=person@example.edu&name=Smith, Sam&vocab=person",
            json!([{"tid": [{"value": 12345}]}]),
        )])
        .await;
        let mut r = resolver(&base);

        let contributor = Contributor {
            name: "relators:cre:person:Smith, Sam".into(),
            email: Some("person@example.edu".into()),
            orcid: Some("0000-0000-0000-0000".into()),
            institution: Some("Lehigh University".into()),
            status: None,
        };
        assert_eq!(r.resolve(&contributor).await.unwrap(), "relators:cre:12345");
        assert_eq!(calls(&log).len(), 1);

        // Cached: no second round trip.
        assert_eq!(r.resolve(&contributor).await.unwrap(), "relators:cre:12345");
        assert_eq!(calls(&log).len(), 1);
    }

    #[tokio::test]
    async fn test_orcid_used_without_email() {
        let (base, log) = taxonomy(vec![(
            "name=Smith, Sam&orcid=0000-0000-0000-0001&vocab=person",
            json!({"tid": [{"value": "77"}]}),
        )])
        .await;
        let mut r = resolver(&base);
        let tid = r
            .resolve_person(
                "Smith, Sam",
                Some("Lehigh University"),
                Some("0000-0000-0000-0001"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(tid, 77);
        assert_eq!(calls(&log), vec!["GET name=Smith, Sam&orcid=0000-0000-0000-0001&vocab=person"]);
    }

    #[tokio::test]
    async fn test_institution_lookup_then_person_create() {
        let (base, log) = taxonomy(vec![(
            "name=Lehigh University&vocab=corporate_body",
            json!([{"tid": [{"value": 62}]}]),
        )])
        .await;
        let mut r = resolver(&base);

        let contributor = Contributor {
            name: "relators:cre:person:Smith, Sam".into(),
            institution: Some("Lehigh University".into()),
            ..Default::default()
        };
        assert_eq!(r.resolve(&contributor).await.unwrap(), "relators:cre:1003");

        let log = calls(&log);
        assert_eq!(log[0], "GET name=Lehigh University&vocab=corporate_body");
        assert_eq!(log[1], "GET name=Smith, Sam&vocab=person&works_for=62");
        let payload: Value = serde_json::from_str(log[2].trim_start_matches("POST ")).unwrap();
        assert_eq!(payload["vid"][0]["target_id"], "person");
        assert_eq!(payload["name"][0]["value"], "Smith, Sam");
        assert_eq!(payload["field_relationships"][0]["target_id"], 62);
        assert_eq!(payload["field_relationships"][0]["rel_type"], "schema:worksFor");
        assert!(payload.get("field_email").is_none());
    }

    #[tokio::test]
    async fn test_institution_resolved_after_miss_when_email_used() {
        let (base, log) = taxonomy(vec![]).await;
        let mut r = resolver(&base);

        let contributor = Contributor {
            name: "relators:aut:person:Doe, Jane".into(),
            email: Some("jd@example.edu".into()),
            institution: Some("Acme".into()),
            ..Default::default()
        };
        r.resolve(&contributor).await.unwrap();

        let log = calls(&log);
        assert_eq!(log.len(), 4);
        assert!(log[0].contains("email=jd@example.edu"));
        assert_eq!(log[1], "GET name=Acme&vocab=corporate_body");
        assert!(log[2].starts_with("POST ") && log[2].contains("corporate_body"));
        let payload: Value = serde_json::from_str(log[3].trim_start_matches("POST ")).unwrap();
        assert_eq!(payload["field_email"][0]["value"], "jd@example.edu");
        assert_eq!(payload["field_relationships"][0]["target_id"], 1003);
    }

    #[tokio::test]
    async fn test_name_mismatch_creates_new_term() {
        let (base, log) = taxonomy(vec![(
            "email=person@example.edu&name=Smith, Sam&vocab=person",
            json!([{
                "tid": [{"value": 321}],
                "name": [{"value": "Smith, Sam - Lehigh University"}]
            }]),
        )])
        .await;
        let mut r = resolver(&base);
        let contributor = Contributor {
            name: "relators:cre:person:Smith, Sam".into(),
            email: Some("person@example.edu".into()),
            ..Default::default()
        };
        assert_eq!(r.resolve(&contributor).await.unwrap(), "relators:cre:1002");
        assert!(calls(&log)[1].starts_with("POST "));
    }

    #[tokio::test]
    async fn test_corporate_body_cached_case_insensitively() {
        let (base, log) = taxonomy(vec![(
            "name=The Valley Voice&vocab=corporate_body",
            json!([{"tid": [{"value": 155683}]}]),
        )])
        .await;
        let mut r = resolver(&base);
        let first = Contributor {
            name: "relators:cre:corporate_body:The Valley Voice".into(),
            ..Default::default()
        };
        let second = Contributor {
            name: "relators:pbl:corporate_body:the valley voice ".into(),
            ..Default::default()
        };
        assert_eq!(r.resolve(&first).await.unwrap(), "relators:cre:155683");
        assert_eq!(r.resolve(&second).await.unwrap(), "relators:pbl:155683");
        assert_eq!(calls(&log).len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_reported_distinctly() {
        let (base, log) = taxonomy(vec![]).await;
        let settings = Settings {
            term_lookup_url: base,
            drupal_password: None,
            ..Settings::default()
        };
        let mut r = TermResolver::new(&settings, reqwest::Client::new());
        let err = r.resolve_person("Nobody", None, None, None).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(calls(&log).len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_names_rejected() {
        let mut r = resolver("http://127.0.0.1:9");
        let err = r
            .resolve(&Contributor { name: "bad-format".into(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::MalformedName(_)));

        let err = r
            .resolve(&Contributor {
                name: "relators:cre:family:Smiths".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::UnknownVocabulary(v) if v == "family"));
    }

    #[tokio::test]
    async fn test_lookup_error_status_propagates() {
        let base = spawn(Router::new().route(
            "/term_from_term_name",
            get(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;
        let mut r = resolver(&base);
        let err = r.resolve_person("Smith, Sam", None, None, Some("a@b.c")).await.unwrap_err();
        assert!(matches!(err, ResolverError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unparseable_lookup_body_propagates() {
        let base =
            spawn(Router::new().route("/term_from_term_name", get(|| async { "<html>" }))).await;
        let mut r = resolver(&base);
        let err = r.resolve_person("Smith, Sam", None, None, None).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidResponse { .. }));
    }

    #[test]
    fn test_first_term_accepts_object_and_array() {
        let one = first_term(r#"{"tid":[{"value":5}]}"#).unwrap().unwrap();
        assert_eq!(one.tid().unwrap(), Some(5));
        let many = first_term(r#"[{"tid":[{"value":6}]},{"tid":[{"value":7}]}]"#).unwrap().unwrap();
        assert_eq!(many.tid().unwrap(), Some(6));
        assert!(first_term("[]").unwrap().is_none());
        assert!(first_term("nope").is_err());
    }

    #[test]
    fn test_person_cache_key_normalizes() {
        let c = Contributor {
            email: Some("X@Y.EDU".into()),
            ..Default::default()
        };
        assert_eq!(person_cache_key(" Smith", &c), "smith|x@y.edu||");
    }
}
