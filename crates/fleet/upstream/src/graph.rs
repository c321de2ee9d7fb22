//! Graph document API clients.

use color_eyre::eyre::WrapErr as _;
use fleet_core::{DriveItem, ListItem, Permission, TruckFolder};
use reqwest::header::LOCATION;

use crate::{AccessToken, DocumentLibrary, TruckFolders, UpstreamError, check};

const SERVICE: &str = "graph";

/// Default graph API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

/// Root folder holding one sub-folder per truck.
pub const TRUCK_DOCS_FOLDER: &str = "TruckDocs";

/// Low-level graph access shared by the library and folder clients.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    no_redirect: reqwest::Client,
    base_url: String,
}

#[derive(serde::Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

impl GraphClient {
    /// Create a client against a graph base URL such as
    /// `https://graph.microsoft.com/v1.0`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> color_eyre::eyre::Result<Self> {
        let no_redirect = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .wrap_err("failed to build graph download client")?;

        Ok(Self {
            http,
            no_redirect,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        url: &str,
    ) -> color_eyre::eyre::Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await
            .wrap_err_with(|| format!("graph request to {url} failed"))?;

        check(SERVICE, response)
            .await?
            .json()
            .await
            .wrap_err_with(|| format!("invalid JSON from {url}"))
    }

    /// Fetch every page of a collection, following `@odata.nextLink`.
    async fn get_all<T: serde::de::DeserializeOwned>(
        &self,
        token: &AccessToken,
        path: &str,
    ) -> color_eyre::eyre::Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(self.url(path));

        while let Some(url) = next {
            let page: Page<T> = self.get_json(token, &url).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    /// Download content, following a redirect to a signed URL without the bearer token.
    async fn download(&self, token: &AccessToken, path: &str) -> color_eyre::eyre::Result<Vec<u8>> {
        let url = self.url(path);
        let response = self
            .no_redirect
            .get(&url)
            .bearer_auth(token.secret())
            .send()
            .await
            .wrap_err("content request failed")?;

        let response = if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    color_eyre::eyre::eyre!("missing redirect location from graph content endpoint")
                })?
                .to_string();

            self.http
                .get(&location)
                .send()
                .await
                .wrap_err("signed content download failed")?
        } else {
            response
        };

        let bytes = check(SERVICE, response)
            .await?
            .bytes()
            .await
            .wrap_err("failed to read content body")?;

        Ok(bytes.to_vec())
    }
}

/// Client for the document library of one site drive.
#[derive(Clone)]
pub struct LibraryClient {
    graph: GraphClient,
    site_id: String,
    drive_id: String,
}

impl LibraryClient {
    /// Create a library client.
    pub fn new(graph: GraphClient, site_id: impl Into<String>, drive_id: impl Into<String>) -> Self {
        Self {
            graph,
            site_id: site_id.into(),
            drive_id: drive_id.into(),
        }
    }

    fn drive_path(&self) -> String {
        format!("/sites/{}/drives/{}", self.site_id, self.drive_id)
    }
}

impl DocumentLibrary for LibraryClient {
    async fn list_items(&self, token: &AccessToken) -> color_eyre::eyre::Result<Vec<ListItem>> {
        let path = format!("{}/list/items?expand=fields", self.drive_path());
        self.graph
            .get_all(token, &path)
            .await
            .wrap_err("failed to list library items")
    }

    async fn drive_item_for(
        &self,
        token: &AccessToken,
        list_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem> {
        let url = self.graph.url(&format!(
            "{}/list/items/{}/driveItem",
            self.drive_path(),
            urlencoding::encode(list_item_id)
        ));
        self.graph.get_json(token, &url).await
    }

    async fn item_metadata(
        &self,
        token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem> {
        let url = self.graph.url(&format!(
            "{}/items/{}?select=id,name,file",
            self.drive_path(),
            urlencoding::encode(drive_item_id)
        ));
        self.graph.get_json(token, &url).await
    }

    async fn download(
        &self,
        token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<Vec<u8>> {
        let path = format!(
            "{}/items/{}/content",
            self.drive_path(),
            urlencoding::encode(drive_item_id)
        );
        self.graph.download(token, &path).await
    }
}

/// Client for the per-truck folder tree in one user's drive.
#[derive(Clone)]
pub struct FolderTreeClient {
    graph: GraphClient,
    owner_id: String,
}

#[derive(serde::Deserialize)]
struct ChildItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    folder: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryUser {
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
}

impl FolderTreeClient {
    /// Create a client for the drive of the given user id.
    pub fn new(graph: GraphClient, owner_id: impl Into<String>) -> Self {
        Self {
            graph,
            owner_id: owner_id.into(),
        }
    }

    fn drive_path(&self) -> String {
        format!("/users/{}/drive", urlencoding::encode(&self.owner_id))
    }

    fn truck_path(&self, truck: &str) -> String {
        format!(
            "{}/root:/{}/{}",
            self.drive_path(),
            TRUCK_DOCS_FOLDER,
            urlencoding::encode(truck)
        )
    }
}

impl TruckFolders for FolderTreeClient {
    async fn find_user_email(
        &self,
        token: &AccessToken,
        display_name: &str,
    ) -> color_eyre::eyre::Result<Option<String>> {
        let search = format!("\"displayName:{display_name}\"");
        let response = self
            .graph
            .http
            .get(self.graph.url("/users"))
            .bearer_auth(token.secret())
            .header("ConsistencyLevel", "eventual")
            .query(&[("$search", search.as_str())])
            .send()
            .await
            .wrap_err("user search failed")?;

        let page: Page<DirectoryUser> = check(SERVICE, response)
            .await?
            .json()
            .await
            .wrap_err("invalid JSON from user search")?;

        Ok(page
            .value
            .into_iter()
            .next()
            .and_then(|u| u.mail.or(u.user_principal_name))
            .map(|email| email.to_lowercase()))
    }

    async fn list_truck_folders(
        &self,
        token: &AccessToken,
    ) -> color_eyre::eyre::Result<Vec<TruckFolder>> {
        let path = format!("{}/root:/{}:/children", self.drive_path(), TRUCK_DOCS_FOLDER);
        let children: Vec<ChildItem> = self
            .graph
            .get_all(token, &path)
            .await
            .wrap_err("failed to list truck folders")?;

        Ok(children
            .into_iter()
            .filter(|c| c.folder.is_some())
            .map(|c| TruckFolder {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn list_folder_files(
        &self,
        token: &AccessToken,
        truck: &str,
    ) -> color_eyre::eyre::Result<Vec<DriveItem>> {
        let path = format!("{}:/children", self.truck_path(truck));
        match self.graph.get_all(token, &path).await {
            Ok(items) => Ok(items),
            Err(e) if e.downcast_ref::<UpstreamError>().is_some_and(UpstreamError::is_not_found) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e.wrap_err(format!("failed to list files for truck {truck}"))),
        }
    }

    async fn list_permissions(
        &self,
        token: &AccessToken,
        folder: &TruckFolder,
    ) -> color_eyre::eyre::Result<Vec<Permission>> {
        let path = format!(
            "{}/items/{}/permissions",
            self.drive_path(),
            urlencoding::encode(&folder.id)
        );
        self.graph.get_all(token, &path).await
    }

    async fn revoke(
        &self,
        token: &AccessToken,
        folder: &TruckFolder,
        permission_id: &str,
    ) -> color_eyre::eyre::Result<()> {
        let url = self.graph.url(&format!(
            "{}/items/{}/permissions/{}",
            self.drive_path(),
            urlencoding::encode(&folder.id),
            urlencoding::encode(permission_id)
        ));
        let response = self
            .graph
            .http
            .delete(&url)
            .bearer_auth(token.secret())
            .send()
            .await
            .wrap_err("permission delete failed")?;

        check(SERVICE, response).await?;
        Ok(())
    }

    async fn grant_read(
        &self,
        token: &AccessToken,
        truck: &str,
        email: &str,
    ) -> color_eyre::eyre::Result<()> {
        let body = serde_json::json!({
            "recipients": [{ "email": email }],
            "requireSignIn": true,
            "sendInvitation": false,
            "roles": ["read"],
        });
        let url = self.graph.url(&format!("{}:/invite", self.truck_path(truck)));
        let response = self
            .graph
            .http
            .post(&url)
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .wrap_err("invite request failed")?;

        check(SERVICE, response).await?;
        Ok(())
    }

    async fn upload(
        &self,
        token: &AccessToken,
        truck: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> color_eyre::eyre::Result<()> {
        let url = self.graph.url(&format!(
            "{}/{}:/content",
            self.truck_path(truck),
            urlencoding::encode(file_name)
        ));
        let response = self
            .graph
            .http
            .put(&url)
            .bearer_auth(token.secret())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await
            .wrap_err("upload request failed")?;

        check(SERVICE, response).await?;
        Ok(())
    }
}
