//! Geographic hierarchy resolution against a linked-data gazetteer.
//!
//! A place record carries a `_label` and at most one parent in `part_of`.
//! The chain is walked upward from the requested place; the parentless root
//! is the country, and the places beneath it are assigned by their distance
//! from the requested (leaf) place: 0 city, 1 county, 2 state, 3 country.
//!
//! No caching happens here. Callers memoize per URI for the lifetime of one
//! batch.

use serde::Deserialize;

use crate::error::{ResolverError, ResolverResult};
use crate::models::Location;

/// Longest parent chain followed before giving up.
pub const MAX_HIERARCHY_DEPTH: usize = 16;

/// A gazetteer place record.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "_label", default)]
    pub label: String,
    #[serde(default)]
    pub part_of: Vec<PlaceRef>,
}

/// Reference to a parent place.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceRef {
    pub id: String,
    #[serde(rename = "_label", default)]
    pub label: String,
}

/// Client for gazetteer place records.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    client: reqwest::Client,
}

impl Gazetteer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve the administrative hierarchy of the place at `uri`.
    pub async fn resolve(&self, uri: &str) -> ResolverResult<Location> {
        let mut chain = vec![self.fetch_place(uri).await?];

        while let Some(parent) = chain.last().and_then(|p| p.part_of.first()) {
            if chain.len() >= MAX_HIERARCHY_DEPTH {
                return Err(ResolverError::HierarchyTooDeep(uri.to_string(), MAX_HIERARCHY_DEPTH));
            }
            let parent_uri = format!("{}.json", parent.id);
            chain.push(self.fetch_place(&parent_uri).await?);
        }

        Ok(location_from_chain(&chain))
    }

    async fn fetch_place(&self, uri: &str) -> ResolverResult<Place> {
        let response = self
            .client
            .get(uri)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ResolverError::Status {
                url: uri.to_string(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ResolverError::InvalidResponse {
            url: uri.to_string(),
            message: e.to_string(),
        })
    }
}

/// Assign labels from a leaf-first chain of places.
///
/// The root fills `country` first; places closer to the leaf then take the
/// slot for their depth, so a chain deeper than four levels lets the place at
/// depth 3 override the root.
pub fn location_from_chain(chain: &[Place]) -> Location {
    let mut location = Location::default();
    let Some((root, rest)) = chain.split_last() else {
        return location;
    };

    location.country = root.label.clone();
    for (depth, place) in rest.iter().enumerate().rev() {
        let label = place.label.clone();
        match depth {
            0 => location.city = label,
            1 => location.county = label,
            2 => location.state = label,
            3 => location.country = label,
            _ => {}
        }
    }
    location
}

pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_with;
    use axum::extract::{Path, State};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    fn place(label: &str, parent: Option<&str>) -> Place {
        Place {
            id: String::new(),
            label: label.to_string(),
            part_of: parent
                .map(|p| vec![PlaceRef { id: p.to_string(), label: String::new() }])
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_single_place_is_country() {
        let loc = location_from_chain(&[place("Peru", None)]);
        assert_eq!(loc.country, "Peru");
        assert!(loc.city.is_empty());
    }

    #[test]
    fn test_two_levels() {
        let loc = location_from_chain(&[place("Ontario", Some("x")), place("Canada", None)]);
        assert_eq!(loc.city, "Ontario");
        assert_eq!(loc.country, "Canada");
        assert!(loc.county.is_empty());
        assert!(loc.state.is_empty());
    }

    #[test]
    fn test_five_levels_depth_three_wins_country() {
        let chain = [
            place("Bethlehem", Some("a")),
            place("Northampton", Some("b")),
            place("Pennsylvania", Some("c")),
            place("United States", Some("d")),
            place("North and Central America", None),
        ];
        let loc = location_from_chain(&chain);
        assert_eq!(loc.country, "United States");
        assert_eq!(loc.state, "Pennsylvania");
        assert_eq!(loc.county, "Northampton");
        assert_eq!(loc.city, "Bethlehem");
    }

    async fn tgn(
        State(base): State<String>,
        Path(id): Path<String>,
    ) -> Result<Json<Value>, StatusCode> {
        let parent = |id: &str| json!([{"id": format!("{base}/tgn/{id}")}]);
        let body = match id.as_str() {
            "7013416" => {
                json!({"id": "7013416", "_label": "Bethlehem", "part_of": parent("1002147")})
            }
            "1002147.json" => json!({"_label": "Northampton", "part_of": parent("7007710")}),
            "7007710.json" => json!({"_label": "Pennsylvania", "part_of": parent("7012149")}),
            "7012149.json" => json!({"_label": "United States", "part_of": []}),
            "1000080" => json!({"_label": "Italy"}),
            "loop" | "loop.json" => json!({"_label": "Loop", "part_of": parent("loop")}),
            "broken" => json!({"_label": "Broken", "part_of": parent("garbage")}),
            "garbage.json" => return Ok(Json(json!(["not", "a", "place"]))),
            _ => return Err(StatusCode::NOT_FOUND),
        };
        Ok(Json(body))
    }

    async fn resolve(id: &str) -> ResolverResult<Location> {
        let base =
            spawn_with(|base| Router::new().route("/tgn/{id}", get(tgn)).with_state(base)).await;
        Gazetteer::new(reqwest::Client::new())
            .resolve(&format!("{base}/tgn/{id}"))
            .await
    }

    #[tokio::test]
    async fn test_resolve_four_levels() {
        let loc = resolve("7013416").await.unwrap();
        assert_eq!(
            loc,
            Location {
                country: "United States".into(),
                state: "Pennsylvania".into(),
                county: "Northampton".into(),
                city: "Bethlehem".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_parentless_place_is_country() {
        let loc = resolve("1000080").await.unwrap();
        assert_eq!(loc.country, "Italy");
        assert!(loc.city.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_an_error() {
        let err = resolve("0").await.unwrap_err();
        assert!(matches!(err, ResolverError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_malformed_parent_record_is_an_error() {
        let err = resolve("broken").await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_cycle_is_bounded() {
        let err = resolve("loop").await.unwrap_err();
        assert!(matches!(err, ResolverError::HierarchyTooDeep(_, MAX_HIERARCHY_DEPTH)));
    }
}
