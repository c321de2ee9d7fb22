//! In-memory upstream fakes for service tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use fleet_core::{
    AssetReference, DriveItem, Driver, DriverRef, DriverVehicleAssignment, GrantedTo, Identity,
    ListItem, ListItemFields, Permission, TruckFolder, Vehicle,
};
use fleet_upstream::{AccessToken, DocumentLibrary, Telematics, TokenSource, TruckFolders};

pub fn assignment(driver_id: &str, vehicle_name: &str) -> DriverVehicleAssignment {
    DriverVehicleAssignment {
        driver: Some(DriverRef {
            id: Some(driver_id.into()),
            name: None,
        }),
        vehicle: Some(Vehicle {
            id: Some(format!("v-{vehicle_name}")),
            name: Some(vehicle_name.into()),
            external_ids: HashMap::new(),
        }),
        assignment_type: Some("HOS".into()),
    }
}

#[derive(Clone)]
pub struct FakeTelematics {
    drivers: Vec<Driver>,
    assignments: Vec<DriverVehicleAssignment>,
    /// `startTime` of every assignment query.
    pub since: Arc<Mutex<Vec<Option<chrono::DateTime<chrono::Utc>>>>>,
}

impl FakeTelematics {
    pub fn new(drivers: &[(&str, &str)], assignments: Vec<DriverVehicleAssignment>) -> Self {
        Self {
            drivers: drivers
                .iter()
                .map(|(id, name)| Driver {
                    id: (*id).into(),
                    name: (*name).into(),
                })
                .collect(),
            assignments,
            since: Arc::default(),
        }
    }
}

impl Telematics for FakeTelematics {
    async fn list_drivers(&self) -> color_eyre::eyre::Result<Vec<Driver>> {
        Ok(self.drivers.clone())
    }

    async fn list_assignments(
        &self,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> color_eyre::eyre::Result<Vec<DriverVehicleAssignment>> {
        self.since.lock().unwrap().push(since);
        Ok(self.assignments.clone())
    }
}

#[derive(Clone, Default)]
pub struct FakeTokens {
    pub issued: Arc<Mutex<usize>>,
}

impl TokenSource for FakeTokens {
    async fn acquire_token(&self) -> color_eyre::eyre::Result<AccessToken> {
        let mut issued = self.issued.lock().unwrap();
        *issued += 1;
        Ok(AccessToken::new(format!("token-{issued}")))
    }
}

/// A library document: list item id, file name, asset column, global flag.
pub struct Doc<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub asset: Option<&'a str>,
    pub global: bool,
}

#[derive(Clone, Default)]
pub struct FakeLibrary {
    items: Vec<ListItem>,
    unresolvable: HashSet<String>,
    listing_fails: bool,
}

impl FakeLibrary {
    pub fn new(docs: &[Doc<'_>]) -> Self {
        let items = docs
            .iter()
            .map(|d| ListItem {
                id: d.id.into(),
                fields: ListItemFields {
                    file_leaf_ref: Some(d.name.into()),
                    asset: d.asset.map(|a| AssetReference::Text(a.into())),
                    for_all_assets: Some(serde_json::Value::Bool(d.global)),
                },
            })
            .collect();

        Self {
            items,
            unresolvable: HashSet::new(),
            listing_fails: false,
        }
    }

    /// Make listing the library fail.
    pub fn fail_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    /// Make drive-item resolution fail for a list item.
    pub fn break_item(mut self, list_item_id: &str) -> Self {
        self.unresolvable.insert(list_item_id.into());
        self
    }
}

impl DocumentLibrary for FakeLibrary {
    async fn list_items(&self, _token: &AccessToken) -> color_eyre::eyre::Result<Vec<ListItem>> {
        if self.listing_fails {
            color_eyre::eyre::bail!("library unavailable");
        }
        Ok(self.items.clone())
    }

    async fn drive_item_for(
        &self,
        _token: &AccessToken,
        list_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem> {
        if self.unresolvable.contains(list_item_id) {
            color_eyre::eyre::bail!("drive item for {list_item_id} not found");
        }
        Ok(DriveItem {
            id: format!("drive-{list_item_id}"),
            name: None,
            web_url: Some(format!("https://files.example/{list_item_id}")),
            size: Some(4),
            last_modified_date_time: None,
            file: None,
        })
    }

    async fn item_metadata(
        &self,
        _token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<DriveItem> {
        let list_id = drive_item_id.trim_start_matches("drive-");
        let item = self
            .items
            .iter()
            .find(|i| i.id == list_id)
            .ok_or_else(|| color_eyre::eyre::eyre!("no item {drive_item_id}"))?;
        Ok(DriveItem {
            id: drive_item_id.into(),
            name: item.fields.file_leaf_ref.clone(),
            file: None,
            ..Default::default()
        })
    }

    async fn download(
        &self,
        _token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<Vec<u8>> {
        Ok(format!("content of {drive_item_id}").into_bytes())
    }
}

#[derive(Default)]
pub struct FolderState {
    pub folders: Vec<TruckFolder>,
    pub files: HashMap<String, Vec<String>>,
    pub permissions: HashMap<String, Vec<Permission>>,
    pub uploads: Vec<(String, String)>,
    pub revoked: Vec<(String, String)>,
    pub granted: Vec<(String, String)>,
    pub failing_uploads: HashSet<String>,
}

#[derive(Clone)]
pub struct FakeFolders {
    pub email: Option<String>,
    pub state: Arc<Mutex<FolderState>>,
}

impl FakeFolders {
    pub fn new(email: Option<&str>) -> Self {
        Self {
            email: email.map(Into::into),
            state: Arc::default(),
        }
    }

    pub fn with_folder(self, truck: &str, files: &[&str], grantees: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let folder = TruckFolder {
                id: format!("folder-{truck}"),
                name: truck.into(),
            };
            state.files.insert(
                truck.into(),
                files.iter().map(|f| (*f).to_string()).collect(),
            );
            state.permissions.insert(
                folder.id.clone(),
                grantees
                    .iter()
                    .map(|(id, email)| permission(id, email))
                    .collect(),
            );
            state.folders.push(folder);
        }
        self
    }

    pub fn fail_upload(self, file_name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(file_name.into());
        self
    }
}

pub fn permission(id: &str, email: &str) -> Permission {
    Permission {
        id: id.into(),
        roles: vec!["read".into()],
        granted_to: Some(GrantedTo {
            user: Some(Identity {
                email: Some(email.into()),
                display_name: None,
            }),
        }),
    }
}

impl TruckFolders for FakeFolders {
    async fn find_user_email(
        &self,
        _token: &AccessToken,
        _display_name: &str,
    ) -> color_eyre::eyre::Result<Option<String>> {
        Ok(self.email.clone())
    }

    async fn list_truck_folders(
        &self,
        _token: &AccessToken,
    ) -> color_eyre::eyre::Result<Vec<TruckFolder>> {
        Ok(self.state.lock().unwrap().folders.clone())
    }

    async fn list_folder_files(
        &self,
        _token: &AccessToken,
        truck: &str,
    ) -> color_eyre::eyre::Result<Vec<DriveItem>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(truck)
            .into_iter()
            .flatten()
            .map(|name| DriveItem {
                id: format!("file-{name}"),
                name: Some(name.clone()),
                ..Default::default()
            })
            .collect())
    }

    async fn list_permissions(
        &self,
        _token: &AccessToken,
        folder: &TruckFolder,
    ) -> color_eyre::eyre::Result<Vec<Permission>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .permissions
            .get(&folder.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn revoke(
        &self,
        _token: &AccessToken,
        folder: &TruckFolder,
        permission_id: &str,
    ) -> color_eyre::eyre::Result<()> {
        self.state
            .lock()
            .unwrap()
            .revoked
            .push((folder.name.clone(), permission_id.into()));
        Ok(())
    }

    async fn grant_read(
        &self,
        _token: &AccessToken,
        truck: &str,
        email: &str,
    ) -> color_eyre::eyre::Result<()> {
        self.state
            .lock()
            .unwrap()
            .granted
            .push((truck.into(), email.into()));
        Ok(())
    }

    async fn upload(
        &self,
        _token: &AccessToken,
        truck: &str,
        file_name: &str,
        _content: Vec<u8>,
    ) -> color_eyre::eyre::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_uploads.contains(file_name) {
            color_eyre::eyre::bail!("upload of {file_name} rejected");
        }
        state.uploads.push((truck.into(), file_name.into()));
        Ok(())
    }
}
