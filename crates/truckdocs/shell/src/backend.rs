//! Truck documents API as seen from the shell.

use color_eyre::eyre::WrapErr as _;
use fleet_core::{
    AssignRequest, AssignmentStatus, DeviceRequest, ErrorBody, TruckDocument, UnassignResponse,
};

/// Default API base.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";

/// The server refused a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejected {
    pub status: u16,
    pub message: String,
}

/// Whether `err` means the server could not be reached at all, as opposed to
/// the server answering with an error.
pub fn is_unreachable(err: &color_eyre::eyre::Report) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_connect() || e.is_timeout())
}

/// Server operations the shell relies on.
#[trait_variant::make(Send)]
pub trait ShellBackend: Send + Sync {
    async fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<AssignmentStatus>;

    async fn assign(
        &self,
        device_id: &str,
        truck: &str,
        pin: Option<&str>,
    ) -> color_eyre::eyre::Result<AssignmentStatus>;

    async fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignResponse>;

    async fn documents(&self, truck: &str) -> color_eyre::eyre::Result<Vec<TruckDocument>>;

    /// Raw content of a document.
    async fn content(&self, drive_item_id: &str) -> color_eyre::eyre::Result<Vec<u8>>;
}

/// HTTP client for the truck documents API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    async fn post<B, T>(&self, route: &str, body: &B) -> color_eyre::eyre::Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(route))
            .json(body)
            .send()
            .await
            .wrap_err_with(|| format!("{route} request failed"))?;

        accept(response)
            .await?
            .json()
            .await
            .wrap_err_with(|| format!("invalid {route} response"))
    }

    async fn get(
        &self,
        route: &str,
        query: &[(&str, &str)],
    ) -> color_eyre::eyre::Result<reqwest::Response> {
        let response = self
            .http
            .get(self.url(route))
            .query(query)
            .send()
            .await
            .wrap_err_with(|| format!("{route} request failed"))?;

        accept(response).await
    }
}

/// Turn a non-success response into [`Rejected`] with the server's message.
async fn accept(response: reqwest::Response) -> color_eyre::eyre::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| match text.trim() {
            "" => status.to_string(),
            text => text.to_string(),
        });

    Err(Rejected {
        status: status.as_u16(),
        message,
    }
    .into())
}

impl ShellBackend for ApiClient {
    async fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<AssignmentStatus> {
        let body = DeviceRequest {
            device_install_id: Some(device_id.into()),
        };
        self.post("resolveDeviceTruck", &body).await
    }

    async fn assign(
        &self,
        device_id: &str,
        truck: &str,
        pin: Option<&str>,
    ) -> color_eyre::eyre::Result<AssignmentStatus> {
        let body = AssignRequest {
            device_install_id: Some(device_id.into()),
            truck_number: Some(truck.into()),
            pin: pin.map(Into::into),
        };
        self.post("assignDeviceTruck", &body).await
    }

    async fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignResponse> {
        let body = DeviceRequest {
            device_install_id: Some(device_id.into()),
        };
        self.post("unassignDevice", &body).await
    }

    async fn documents(&self, truck: &str) -> color_eyre::eyre::Result<Vec<TruckDocument>> {
        self.get("getTruckDocuments", &[("truck", truck)])
            .await?
            .json()
            .await
            .wrap_err("invalid document list")
    }

    async fn content(&self, drive_item_id: &str) -> color_eyre::eyre::Result<Vec<u8>> {
        let bytes = self
            .get("viewTruckDocument", &[("itemId", drive_item_id)])
            .await?
            .bytes()
            .await
            .wrap_err("failed to read document content")?;
        Ok(bytes.to_vec())
    }
}
