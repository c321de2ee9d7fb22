//! Upstream service traits.

use fleet_core::{
    DriveItem, Driver, DriverVehicleAssignment, ListItem, Permission, TruckFolder,
};

/// Bearer token for the graph API, valid for one operation.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Client-credential token exchange.
#[trait_variant::make(Send)]
pub trait TokenSource: Send + Sync {
    /// Acquire a fresh token.
    async fn acquire_token(&self) -> color_eyre::eyre::Result<AccessToken>;
}

/// Read-only telematics queries.
#[trait_variant::make(Send)]
pub trait Telematics: Send + Sync {
    /// List fleet drivers.
    async fn list_drivers(&self) -> color_eyre::eyre::Result<Vec<Driver>>;

    /// List HOS driver-vehicle assignments, optionally only those since a time.
    async fn list_assignments(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> color_eyre::eyre::Result<Vec<DriverVehicleAssignment>>;
}

/// Media downloaded from the document library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentContent {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The document library holding every fleet document.
#[trait_variant::make(Send)]
pub trait DocumentLibrary: Send + Sync {
    /// List every library item with its metadata columns.
    async fn list_items(&self, token: &AccessToken) -> color_eyre::eyre::Result<Vec<ListItem>>;

    /// Resolve the drive item behind a list item.
    async fn drive_item_for(
        &self,
        token: &AccessToken,
        list_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem>;

    /// Fetch name and file facet of a drive item.
    async fn item_metadata(
        &self,
        token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem>;

    /// Download the content of a drive item.
    async fn download(
        &self,
        token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<Vec<u8>>;
}

/// The per-truck folder tree and its sharing.
#[trait_variant::make(Send)]
pub trait TruckFolders: Send + Sync {
    /// Find a user's email by display name.
    async fn find_user_email(
        &self,
        token: &AccessToken,
        display_name: &str,
    ) -> color_eyre::eyre::Result<Option<String>>;

    /// List per-truck folders.
    async fn list_truck_folders(
        &self,
        token: &AccessToken,
    ) -> color_eyre::eyre::Result<Vec<TruckFolder>>;

    /// List files in a truck's folder. A missing folder is empty.
    async fn list_folder_files(
        &self,
        token: &AccessToken,
        truck: &str,
    ) -> color_eyre::eyre::Result<Vec<DriveItem>>;

    /// List permissions on a folder.
    async fn list_permissions(
        &self,
        token: &AccessToken,
        folder: &TruckFolder,
    ) -> color_eyre::eyre::Result<Vec<Permission>>;

    /// Delete a permission from a folder.
    async fn revoke(
        &self,
        token: &AccessToken,
        folder: &TruckFolder,
        permission_id: &str,
    ) -> color_eyre::eyre::Result<()>;

    /// Give a user read access to a truck's folder.
    async fn grant_read(
        &self,
        token: &AccessToken,
        truck: &str,
        email: &str,
    ) -> color_eyre::eyre::Result<()>;

    /// Upload a file into a truck's folder.
    async fn upload(
        &self,
        token: &AccessToken,
        truck: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> color_eyre::eyre::Result<()>;
}
