//! Telematics API client.

use color_eyre::eyre::WrapErr as _;
use fleet_core::{Driver, DriverVehicleAssignment};

use crate::{Telematics, check};

const SERVICE: &str = "telematics";

/// Default telematics API base URL.
pub const DEFAULT_TELEMATICS_URL: &str = "https://api.samsara.com";

/// Telematics client authenticated with a static bearer token.
#[derive(Clone)]
pub struct TelematicsClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl TelematicsClient {
    /// Create a new client.
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> color_eyre::eyre::Result<Vec<T>> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_token)
            .query(query)
            .send()
            .await
            .wrap_err_with(|| format!("telematics request to {path} failed"))?;

        let envelope: Envelope<T> = check(SERVICE, response)
            .await?
            .json()
            .await
            .wrap_err_with(|| format!("invalid JSON from telematics {path}"))?;

        Ok(envelope.data)
    }
}

impl Telematics for TelematicsClient {
    async fn list_drivers(&self) -> color_eyre::eyre::Result<Vec<Driver>> {
        self.get("/fleet/drivers", &[("limit", "100".to_string())])
            .await
    }

    async fn list_assignments(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> color_eyre::eyre::Result<Vec<DriverVehicleAssignment>> {
        let mut query = vec![
            ("filterBy", "drivers".to_string()),
            ("assignmentType", "HOS".to_string()),
        ];
        if let Some(since) = since {
            query.push((
                "startTime",
                since.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ));
        }

        let assignments: Vec<DriverVehicleAssignment> = self
            .get("/fleet/driver-vehicle-assignments", &query)
            .await?;
        tracing::debug!(count = assignments.len(), "fetched HOS assignments");

        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_drivers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fleet/drivers")
            .match_query(mockito::Matcher::UrlEncoded("limit".into(), "100".into()))
            .match_header("authorization", "Bearer samsara-token")
            .with_status(200)
            .with_body(r#"{"data":[{"id":"d1","name":"Test Driver"},{"id":"d2","name":"Jane Roe"}]}"#)
            .create_async()
            .await;

        let client = TelematicsClient::new(reqwest::Client::new(), server.url(), "samsara-token");
        let drivers = client.list_drivers().await.unwrap();

        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].name, "Test Driver");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_assignments_filters_hos() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fleet/driver-vehicle-assignments")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("filterBy".into(), "drivers".into()),
                mockito::Matcher::UrlEncoded("assignmentType".into(), "HOS".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"data":[{"driver":{"id":"d1","name":"Test Driver"},
                    "vehicle":{"id":"v1","name":"Truck 1577","externalIds":{"assetId":"1577"}},
                    "assignmentType":"HOS"}]}"#,
            )
            .create_async()
            .await;

        let client = TelematicsClient::new(reqwest::Client::new(), server.url(), "samsara-token");
        let assignments = client.list_assignments(None).await.unwrap();

        let vehicle = assignments[0].vehicle.as_ref().unwrap();
        assert_eq!(vehicle.truck_number(), "1577");
    }

    #[tokio::test]
    async fn test_list_assignments_since_sends_start_time() {
        use chrono::TimeZone as _;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fleet/driver-vehicle-assignments")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("filterBy".into(), "drivers".into()),
                mockito::Matcher::UrlEncoded("assignmentType".into(), "HOS".into()),
                mockito::Matcher::UrlEncoded("startTime".into(), "2026-03-04T05:06:07.000Z".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let since = chrono::Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let client = TelematicsClient::new(reqwest::Client::new(), server.url(), "samsara-token");
        assert!(client.list_assignments(Some(since)).await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fleet/drivers")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = TelematicsClient::new(reqwest::Client::new(), server.url(), "t");
        assert!(client.list_drivers().await.unwrap().is_empty());
    }
}
