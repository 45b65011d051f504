//! Catalog implementation backed by the OpenERZ REST API.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use openerz_core::{
    model::{DateRange, Jurisdiction, PickupOccurrence, StreamKey},
    ports::{CatalogPort, PortError},
};

/// Public OpenERZ endpoint.
pub const BASE_URL: &str = "https://openerz.metaodi.ch/api";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Envelope shared by all OpenERZ responses.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Vec<T>,
    // `_metadata` carries paging info we never need
}

/// Single entry of /calendar.json
#[derive(Debug, Deserialize)]
struct CalendarEntry {
    date: String, // "YYYY-MM-DD"

    #[serde(default)]
    station: Option<String>,
    #[serde(default)]
    description: Option<String>,
    // waste_type, zip, area and region echo the query
}

/// Catalog port talking to an OpenERZ server.
pub struct OpenErzCatalog {
    client: Client,
    base_url: String,
}

impl OpenErzCatalog {
    /// Create a catalog for the public OpenERZ API.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    /// Create a catalog for another server, e.g. a mirror or a test double.
    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    async fn parameter(&self, name: &str, region: Option<&str>) -> Result<Vec<String>, PortError> {
        let mut req = self
            .client
            .get(format!("{}/parameter/{name}", self.base_url));
        if let Some(region) = region {
            req = req.query(&[("region", region)]);
        }

        let envelope = fetch_json::<Envelope<String>>(req).await?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl CatalogPort for OpenErzCatalog {
    #[instrument(skip(self))]
    async fn regions(&self) -> Result<Vec<String>, PortError> {
        self.parameter("regions", None).await
    }

    #[instrument(skip(self))]
    async fn areas(&self, region: &str) -> Result<Vec<String>, PortError> {
        self.parameter("areas", Some(region)).await
    }

    #[instrument(skip(self))]
    async fn waste_types(&self, region: &str) -> Result<Vec<String>, PortError> {
        self.parameter("types", Some(region)).await
    }

    #[instrument(skip(self))]
    async fn occurrences(
        &self,
        jurisdiction: &Jurisdiction,
        stream: &StreamKey,
        range: DateRange,
    ) -> Result<Vec<PickupOccurrence>, PortError> {
        let start = range.start.format(DATE_FORMAT).to_string();
        let end = range.end.format(DATE_FORMAT).to_string();

        let mut req = self
            .client
            .get(format!("{}/calendar.json", self.base_url))
            .query(&[
                ("region", jurisdiction.region.as_str()),
                ("types", stream.as_str()),
                ("start", &start),
                ("end", &end),
                ("sort", "date"),
            ]);

        if let Some(area) = jurisdiction.area.as_deref().filter(|area| !area.is_empty()) {
            req = req.query(&[("area", area)]);
        }

        let calendar = fetch_json::<Envelope<CalendarEntry>>(req).await?;
        debug!(count = calendar.result.len(), "calendar entries received");

        let mut occurrences = Vec::with_capacity(calendar.result.len());
        for entry in calendar.result {
            let date = NaiveDate::parse_from_str(&entry.date, DATE_FORMAT).map_err(PortError::from)?;

            if !range.contains(date) {
                continue;
            }

            occurrences.push(PickupOccurrence {
                date,
                station: non_empty(entry.station),
                description: non_empty(entry.description),
            });
        }

        occurrences.sort_by_key(|occurrence| occurrence.date);

        Ok(occurrences)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    req.send()
        .await
        .map_err(PortError::from)?
        .error_for_status()
        .map_err(PortError::from)?
        .json()
        .await
        .map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn catalog(server: &MockServer) -> OpenErzCatalog {
        OpenErzCatalog::with_base_url(Client::new(), format!("{}/api/", server.uri()))
    }

    fn zurich(area: Option<&str>) -> Jurisdiction {
        Jurisdiction {
            region: "zurich".to_owned(),
            area: area.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn lists_regions() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/parameter/regions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_metadata": { "total_count": 3 },
                "result": ["zurich", "basel", "st_gallen"]
            })))
            .mount(&server)
            .await;

        // Act
        let regions = catalog(&server).regions().await.unwrap();

        // Assert
        assert_eq!(regions, ["zurich", "basel", "st_gallen"]);
    }

    #[tokio::test]
    async fn lists_areas_and_types_for_region() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/parameter/areas"))
            .and(query_param("region", "uster"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/parameter/types"))
            .and(query_param("region", "uster"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "result": ["paper", "waste"] })),
            )
            .mount(&server)
            .await;
        let catalog = catalog(&server);

        let areas = catalog.areas("uster").await.unwrap();
        let types = catalog.waste_types("uster").await.unwrap();

        assert!(areas.is_empty(), "uster has no areas");
        assert_eq!(types, ["paper", "waste"]);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/parameter/regions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = catalog(&server).regions().await;

        assert!(matches!(result, Err(PortError::Network(_))), "{result:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/parameter/regions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let result = catalog(&server).regions().await;

        assert!(result.is_err(), "{result:?}");
    }

    #[tokio::test]
    async fn fetches_calendar_for_window() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/calendar.json"))
            .and(query_param("region", "zurich"))
            .and(query_param("area", "8001"))
            .and(query_param("types", "cargotram"))
            .and(query_param("start", "2024-03-01"))
            .and(query_param("end", "2024-04-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_metadata": { "total_count": 2 },
                "result": [
                    {
                        "date": "2024-03-21",
                        "waste_type": "cargotram",
                        "zip": 8001,
                        "area": "8001",
                        "station": "",
                        "region": "zurich",
                        "description": ""
                    },
                    {
                        "date": "2024-03-06",
                        "waste_type": "cargotram",
                        "zip": 8001,
                        "area": "8001",
                        "station": "Zürich, Hauptbahnhof",
                        "region": "zurich",
                        "description": "16:00 - 20:00"
                    }
                ]
            })))
            .mount(&server)
            .await;
        let range = DateRange::forward(date(2024, 3, 1), 31);

        // Act
        let occurrences = catalog(&server)
            .occurrences(&zurich(Some("8001")), &StreamKey::from("cargotram"), range)
            .await
            .unwrap();

        // Assert
        assert_eq!(occurrences.len(), 2);
        assert_eq!(
            occurrences[0],
            PickupOccurrence {
                date: date(2024, 3, 6),
                station: Some("Zürich, Hauptbahnhof".to_owned()),
                description: Some("16:00 - 20:00".to_owned()),
            }
        );
        assert_eq!(occurrences[1].date, date(2024, 3, 21));
        assert_eq!(occurrences[1].station, None);
        assert_eq!(occurrences[1].description, None);
    }

    #[tokio::test]
    async fn omits_absent_area_and_drops_dates_outside_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/calendar.json"))
            .and(query_param("region", "zurich"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    { "date": "2024-02-28" },
                    { "date": "2024-03-02", "station": null }
                ]
            })))
            .mount(&server)
            .await;
        let range = DateRange::forward(date(2024, 3, 1), 31);

        let occurrences = catalog(&server)
            .occurrences(&zurich(None), &StreamKey::from("paper"), range)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(
            !requests[0].url.query_pairs().any(|(key, _)| key == "area"),
            "area must not be sent"
        );
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].date, date(2024, 3, 2));
    }

    #[tokio::test]
    async fn invalid_date_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/calendar.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "result": [{ "date": "31.03.2024" }] })),
            )
            .mount(&server)
            .await;
        let range = DateRange::forward(date(2024, 3, 1), 31);

        let result = catalog(&server)
            .occurrences(&zurich(None), &StreamKey::from("paper"), range)
            .await;

        assert!(matches!(result, Err(PortError::Parse(_))), "{result:?}");
    }
}
