//! Folder synchronization for the designated test account.

use std::sync::Arc;

use color_eyre::eyre::WrapErr as _;
use fleet_core::{
    DesiredSharing, FolderGrants, GrantAction, SyncReport, TruckFolder, missing_documents,
    reconcile,
};
use fleet_upstream::{AccessToken, DocumentLibrary, Telematics, TokenSource, TruckFolders};

use crate::{DocumentLocator, TruckResolver};

/// Display name of the account whose folder access follows its truck.
pub const DEFAULT_TEST_DRIVER: &str = "Test Driver";

/// How far back a pass looks for driver-vehicle assignments.
pub const ASSIGNMENT_WINDOW: chrono::TimeDelta = chrono::TimeDelta::minutes(5);

/// Copies truck documents into per-truck folders and moves the test
/// account's read grant to the folder of its current truck.
///
/// Clones share one pass lock, so passes never overlap.
#[derive(Clone)]
pub struct DocumentSyncer<T, K, L, F> {
    resolver: TruckResolver<T>,
    locator: DocumentLocator<K, L>,
    folders: F,
    test_driver: String,
    pass: Arc<tokio::sync::Mutex<()>>,
}

impl<T, K, L, F> DocumentSyncer<T, K, L, F> {
    /// The resolver is narrowed to assignments from the last
    /// [`ASSIGNMENT_WINDOW`].
    pub fn new(
        resolver: TruckResolver<T>,
        locator: DocumentLocator<K, L>,
        folders: F,
        test_driver: impl Into<String>,
    ) -> Self {
        Self {
            resolver: resolver.recent(ASSIGNMENT_WINDOW),
            locator,
            folders,
            test_driver: test_driver.into(),
            pass: Arc::default(),
        }
    }
}

impl<T, K, L, F> DocumentSyncer<T, K, L, F>
where
    T: Telematics,
    K: TokenSource,
    L: DocumentLibrary,
    F: TruckFolders,
{
    /// Run one synchronization pass.
    pub async fn run_once(&self) -> color_eyre::eyre::Result<SyncReport> {
        let _pass = self.pass.lock().await;
        let token = self.locator.token().await?;

        let email = match self.folders.find_user_email(&token, &self.test_driver).await {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(name = %self.test_driver, error = %e, "test account lookup failed");
                None
            }
        };
        if email.is_none() {
            tracing::warn!(name = %self.test_driver, "test account email unknown, sharing left as is");
        }

        let assigned = self
            .resolver
            .truck_for_driver(&self.test_driver)
            .await
            .wrap_err("failed to resolve test driver truck")?;
        let assigned_truck = assigned.truck().map(str::to_string);

        tracing::info!(
            driver = %self.test_driver,
            truck = ?assigned_truck,
            "starting document sync"
        );

        let observed = self.observe_folders(&token).await?;
        let plan = reconcile(
            DesiredSharing {
                grantee: email.as_deref(),
                assigned_truck: assigned_truck.as_deref(),
            },
            &observed,
        );

        let mut report = SyncReport {
            assigned_truck: assigned_truck.clone(),
            ..Default::default()
        };

        let target = assigned_truck
            .as_deref()
            .and_then(|truck| observed.iter().find(|g| g.folder.name == truck));
        match target {
            Some(grants) => {
                if let Err(e) = self.copy_documents(&token, &grants.folder, &mut report).await {
                    tracing::warn!(truck = %grants.folder.name, error = ?e, "document copy aborted");
                }
            }
            None => {
                if let Some(truck) = &assigned_truck {
                    tracing::warn!(truck = %truck, "no folder for assigned truck, nothing copied");
                }
            }
        }

        self.apply(&token, plan, &mut report).await;

        tracing::info!(
            uploaded = report.uploaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            revoked = report.revoked.len(),
            granted = report.granted.len(),
            "document sync complete"
        );

        Ok(report)
    }

    async fn observe_folders(
        &self,
        token: &AccessToken,
    ) -> color_eyre::eyre::Result<Vec<FolderGrants>> {
        let folders = self
            .folders
            .list_truck_folders(token)
            .await
            .wrap_err("failed to list truck folders")?;

        let mut observed = Vec::with_capacity(folders.len());
        for folder in folders {
            match self.folders.list_permissions(token, &folder).await {
                Ok(permissions) => observed.push(FolderGrants {
                    folder,
                    permissions,
                }),
                Err(e) => {
                    tracing::warn!(folder = %folder.name, error = %e, "failed to list permissions");
                }
            }
        }

        Ok(observed)
    }

    async fn copy_documents(
        &self,
        token: &AccessToken,
        folder: &TruckFolder,
        report: &mut SyncReport,
    ) -> color_eyre::eyre::Result<()> {
        let truck = folder.name.as_str();
        let existing = self
            .folders
            .list_folder_files(token, truck)
            .await
            .wrap_err("failed to list folder files")?;
        let documents = self
            .locator
            .documents_with_token(token, truck)
            .await
            .wrap_err("failed to list library documents")?;
        let missing = missing_documents(&documents, &existing);

        report.skipped = documents
            .iter()
            .filter(|doc| existing.iter().any(|f| f.name.as_deref() == Some(doc.name.as_str())))
            .map(|doc| doc.name.clone())
            .collect();

        for doc in missing {
            match self.copy_one(token, truck, &doc.drive_item_id, &doc.name).await {
                Ok(()) => {
                    tracing::info!(truck = %truck, document = %doc.name, "uploaded document");
                    report.uploaded.push(doc.name.clone());
                }
                Err(e) => {
                    tracing::warn!(truck = %truck, document = %doc.name, error = %e, "failed to copy document");
                    report.failed.push(doc.name.clone());
                }
            }
        }

        Ok(())
    }

    async fn copy_one(
        &self,
        token: &AccessToken,
        truck: &str,
        drive_item_id: &str,
        name: &str,
    ) -> color_eyre::eyre::Result<()> {
        let content = self.locator.download_with_token(token, drive_item_id).await?;
        self.folders
            .upload(token, truck, name, content.bytes)
            .await
            .wrap_err_with(|| format!("failed to upload {name}"))
    }

    async fn apply(&self, token: &AccessToken, plan: Vec<GrantAction>, report: &mut SyncReport) {
        for action in plan {
            match action {
                GrantAction::Revoke {
                    folder,
                    permission_id,
                } => match self.folders.revoke(token, &folder, &permission_id).await {
                    Ok(()) => {
                        tracing::info!(folder = %folder.name, permission = %permission_id, "revoked grant");
                        report.revoked.push(folder.name);
                    }
                    Err(e) => {
                        tracing::warn!(folder = %folder.name, error = %e, "failed to revoke grant");
                    }
                },
                GrantAction::Grant { folder, email } => {
                    match self.folders.grant_read(token, &folder.name, &email).await {
                        Ok(()) => {
                            tracing::info!(folder = %folder.name, email = %email, "granted read access");
                            report.granted.push(folder.name);
                        }
                        Err(e) => {
                            tracing::warn!(folder = %folder.name, error = %e, "failed to grant access");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Doc, FakeFolders, FakeLibrary, FakeTelematics, FakeTokens, assignment};
    use fleet_core::ReservedPrefixes;

    const EMAIL: &str = "test.driver@example.com";

    type Syncer = DocumentSyncer<FakeTelematics, FakeTokens, FakeLibrary, FakeFolders>;

    fn telematics(truck: &str) -> FakeTelematics {
        FakeTelematics::new(
            &[("d1", "Jane Roe"), ("d2", "Test Driver")],
            vec![assignment("d2", truck)],
        )
    }

    fn syncer(truck: &str, library: FakeLibrary, folders: FakeFolders) -> Syncer {
        syncer_with(telematics(truck), library, folders)
    }

    fn syncer_with(telematics: FakeTelematics, library: FakeLibrary, folders: FakeFolders) -> Syncer {
        DocumentSyncer::new(
            TruckResolver::new(telematics, ReservedPrefixes::default()),
            DocumentLocator::new(FakeTokens::default(), library),
            folders,
            DEFAULT_TEST_DRIVER,
        )
    }

    fn manual_library() -> FakeLibrary {
        FakeLibrary::new(&[Doc {
            id: "7",
            name: "manual.pdf",
            asset: None,
            global: true,
        }])
    }

    #[tokio::test]
    async fn test_present_document_is_not_uploaded() {
        let folders =
            FakeFolders::new(Some(EMAIL)).with_folder("T-305", &["manual.pdf"], &[("p1", EMAIL)]);
        let report = syncer("T-305", manual_library(), folders.clone())
            .run_once()
            .await
            .unwrap();

        assert!(report.uploaded.is_empty());
        assert_eq!(report.skipped, ["manual.pdf"]);
        assert!(folders.state.lock().unwrap().uploads.is_empty());
    }

    #[tokio::test]
    async fn test_grant_moves_to_assigned_truck() {
        let folders = FakeFolders::new(Some(EMAIL))
            .with_folder("T-200", &[], &[("p1", EMAIL), ("p2", "owner@example.com")])
            .with_folder("T-305", &[], &[]);
        let report = syncer("T-305", manual_library(), folders.clone())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.assigned_truck.as_deref(), Some("T-305"));
        assert_eq!(report.revoked, ["T-200"]);
        assert_eq!(report.granted, ["T-305"]);
        assert_eq!(report.uploaded, ["manual.pdf"]);

        let state = folders.state.lock().unwrap();
        assert_eq!(state.revoked, [("T-200".to_string(), "p1".to_string())]);
        assert_eq!(state.granted, [("T-305".to_string(), EMAIL.to_string())]);
        assert_eq!(state.uploads, [("T-305".to_string(), "manual.pdf".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_upload_does_not_stop_others() {
        let library = FakeLibrary::new(&[
            Doc {
                id: "1",
                name: "a.pdf",
                asset: Some("T-305"),
                global: false,
            },
            Doc {
                id: "2",
                name: "b.pdf",
                asset: Some("T-305"),
                global: false,
            },
        ]);
        let folders = FakeFolders::new(Some(EMAIL))
            .with_folder("T-305", &[], &[("p1", EMAIL)])
            .fail_upload("a.pdf");
        let report = syncer("T-305", library, folders).run_once().await.unwrap();

        assert_eq!(report.failed, ["a.pdf"]);
        assert_eq!(report.uploaded, ["b.pdf"]);
        assert!(report.granted.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_email_leaves_sharing_alone() {
        let folders = FakeFolders::new(None)
            .with_folder("T-200", &[], &[("p1", EMAIL)])
            .with_folder("T-305", &[], &[]);
        let report = syncer("T-305", manual_library(), folders.clone())
            .run_once()
            .await
            .unwrap();

        assert!(report.revoked.is_empty());
        assert!(report.granted.is_empty());
        assert_eq!(report.uploaded, ["manual.pdf"]);
    }

    #[tokio::test]
    async fn test_reserved_vehicle_revokes_everything() {
        let folders = FakeFolders::new(Some(EMAIL)).with_folder("T-200", &[], &[("p1", EMAIL)]);
        let report = syncer("RT-9", manual_library(), folders.clone())
            .run_once()
            .await
            .unwrap();

        assert_eq!(report.assigned_truck, None);
        assert_eq!(report.revoked, ["T-200"]);
        assert!(folders.state.lock().unwrap().uploads.is_empty());
    }

    #[tokio::test]
    async fn test_library_outage_still_moves_grant() {
        let folders = FakeFolders::new(Some(EMAIL))
            .with_folder("T-200", &[], &[("p1", EMAIL)])
            .with_folder("T-305", &[], &[]);
        let report = syncer("T-305", manual_library().fail_listing(), folders.clone())
            .run_once()
            .await
            .unwrap();

        assert!(report.uploaded.is_empty());
        assert_eq!(report.revoked, ["T-200"]);
        assert_eq!(report.granted, ["T-305"]);
        assert_eq!(
            folders.state.lock().unwrap().revoked,
            [("T-200".to_string(), "p1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_pass_asks_for_recent_assignments() {
        let telematics = telematics("T-305");
        let since = telematics.since.clone();
        let before = chrono::Utc::now();

        syncer_with(telematics, manual_library(), FakeFolders::new(Some(EMAIL)))
            .run_once()
            .await
            .unwrap();

        let since = since.lock().unwrap();
        let start = since[0].unwrap();
        assert!(start >= before - ASSIGNMENT_WINDOW);
        assert!(start <= before - ASSIGNMENT_WINDOW + chrono::TimeDelta::seconds(5));
    }
}
