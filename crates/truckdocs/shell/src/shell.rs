//! The client flow: resolve, enroll, list, cache.

use fleet_core::{AssignmentStatus, TruckDocument};

use crate::backend::{ShellBackend, is_unreachable};
use crate::cache::{CachedDocument, OfflineCache};
use crate::enroll::Enroller;
use crate::status::StatusSink;

/// Where the shell is in its flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellState {
    Unresolved,
    Enrolling,
    Resolved { truck: String },
    /// No service is contacted; cached documents only.
    Offline,
}

/// The user cancelled enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("enrollment cancelled")]
pub struct EnrollmentCancelled;

/// A single client run.
pub struct Shell<B, C, E, S> {
    backend: B,
    cache: C,
    enroller: E,
    sink: S,
    device_id: String,
    state: ShellState,
}

impl<B, C, E, S> Shell<B, C, E, S>
where
    B: ShellBackend,
    C: OfflineCache,
    E: Enroller,
    S: StatusSink,
{
    pub fn new(backend: B, cache: C, enroller: E, sink: S, device_id: impl Into<String>) -> Self {
        Self {
            backend,
            cache,
            enroller,
            sink,
            device_id: device_id.into(),
            state: ShellState::Unresolved,
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    /// Run the flow to completion and return the final state.
    pub async fn run(&mut self, offline: bool) -> color_eyre::eyre::Result<ShellState> {
        if offline {
            self.show_offline();
            return Ok(self.state.clone());
        }

        self.state = ShellState::Unresolved;
        self.sink.status("Resolving truck for this device...");

        let status = match self.backend.resolve(&self.device_id).await {
            Ok(status) => status,
            Err(e) if is_unreachable(&e) => return Ok(self.fall_back_offline(&e)),
            Err(e) => return Err(e),
        };
        let truck = match status {
            AssignmentStatus::Assigned { truck_number } => truck_number,
            AssignmentStatus::Unassigned => self.enroll().await?,
        };

        tracing::info!(device_id = %self.device_id, truck = %truck, "device resolved");
        self.sink.status(&format!("Truck {truck}"));
        self.state = ShellState::Resolved {
            truck: truck.clone(),
        };

        let documents = match self.backend.documents(&truck).await {
            Ok(documents) => documents,
            Err(e) if is_unreachable(&e) => return Ok(self.fall_back_offline(&e)),
            Err(e) => return Err(e),
        };
        self.sink.documents(&truck, &documents);
        self.refresh_cache(&documents).await;

        Ok(self.state.clone())
    }

    fn fall_back_offline(&mut self, err: &color_eyre::eyre::Report) -> ShellState {
        tracing::warn!(device_id = %self.device_id, error = %err, "server unreachable, going offline");
        self.show_offline();
        self.sink.notice("Server unreachable; showing offline documents");
        self.state.clone()
    }

    fn show_offline(&mut self) {
        self.state = ShellState::Offline;
        self.sink.status("Offline");

        let entries = self.cache.list().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to read offline cache");
            self.sink.notice("Offline documents could not be read");
            Vec::new()
        });
        self.sink.cached(&entries);
    }

    async fn enroll(&mut self) -> color_eyre::eyre::Result<String> {
        self.state = ShellState::Enrolling;
        self.sink.status("This device is not assigned to a truck");

        let mut last_error: Option<String> = None;
        loop {
            let Some(input) = self.enroller.request(last_error.as_deref()).await else {
                return Err(EnrollmentCancelled.into());
            };

            match self
                .backend
                .assign(&self.device_id, &input.truck_number, input.pin.as_deref())
                .await
            {
                Ok(AssignmentStatus::Assigned { truck_number }) => {
                    self.sink.notice("Device enrolled");
                    return Ok(truck_number);
                }
                Ok(AssignmentStatus::Unassigned) => {
                    last_error = Some("assignment was not recorded".into());
                }
                Err(e) => {
                    tracing::warn!(device_id = %self.device_id, error = %e, "enrollment rejected");
                    last_error = Some(e.to_string());
                }
            }
        }
    }

    /// Replace the offline cache with the PDFs in `documents`.
    async fn refresh_cache(&mut self, documents: &[TruckDocument]) {
        let mut cached = Vec::new();
        for doc in documents.iter().filter(|d| d.is_pdf()) {
            match self.backend.content(&doc.drive_item_id).await {
                Ok(bytes) => cached.push(CachedDocument {
                    name: doc.name.clone(),
                    bytes,
                }),
                Err(e) => {
                    tracing::warn!(document = %doc.name, error = %e, "failed to cache document");
                }
            }
        }

        let count = cached.len();
        match self.cache.replace_all(cached) {
            Ok(()) => self
                .sink
                .notice(&format!("{count} documents available offline")),
            Err(e) => {
                tracing::warn!(error = ?e, "failed to update offline cache");
                self.sink.notice("Offline copies could not be saved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::backend::{ApiClient, Rejected};
    use crate::cache::{CacheEntry, DirCache};
    use crate::enroll::EnrollmentInput;
    use fleet_core::UnassignResponse;

    #[derive(Clone, Default)]
    struct FakeBackend {
        assignments: Arc<Mutex<HashMap<String, String>>>,
        documents: HashMap<String, Vec<TruckDocument>>,
        pin: Option<String>,
        broken_content: Option<String>,
        calls: Arc<Mutex<usize>>,
    }

    impl FakeBackend {
        fn call(&self) {
            *self.calls.lock().unwrap() += 1;
        }
    }

    fn document(name: &str, id: &str, global: bool) -> TruckDocument {
        TruckDocument {
            name: name.into(),
            drive_item_id: id.into(),
            web_url: None,
            size: None,
            last_modified_date_time: None,
            applies_to_all_trucks: global,
        }
    }

    impl ShellBackend for FakeBackend {
        async fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<AssignmentStatus> {
            self.call();
            Ok(match self.assignments.lock().unwrap().get(device_id) {
                Some(truck) => AssignmentStatus::Assigned {
                    truck_number: truck.clone(),
                },
                None => AssignmentStatus::Unassigned,
            })
        }

        async fn assign(
            &self,
            device_id: &str,
            truck: &str,
            pin: Option<&str>,
        ) -> color_eyre::eyre::Result<AssignmentStatus> {
            self.call();
            if self.pin.is_some() && self.pin.as_deref() != pin {
                return Err(Rejected {
                    status: 403,
                    message: "Invalid PIN".into(),
                }
                .into());
            }
            self.assignments
                .lock()
                .unwrap()
                .insert(device_id.into(), truck.into());
            Ok(AssignmentStatus::Assigned {
                truck_number: truck.into(),
            })
        }

        async fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignResponse> {
            self.call();
            self.assignments.lock().unwrap().remove(device_id);
            Ok(UnassignResponse {
                ok: true,
                device_install_id: device_id.into(),
                message: "Device unassigned.".into(),
            })
        }

        async fn documents(&self, truck: &str) -> color_eyre::eyre::Result<Vec<TruckDocument>> {
            self.call();
            Ok(self.documents.get(truck).cloned().unwrap_or_default())
        }

        async fn content(&self, drive_item_id: &str) -> color_eyre::eyre::Result<Vec<u8>> {
            self.call();
            if self.broken_content.as_deref() == Some(drive_item_id) {
                color_eyre::eyre::bail!("download failed");
            }
            Ok(drive_item_id.as_bytes().to_vec())
        }
    }

    struct ScriptedEnroller {
        script: VecDeque<EnrollmentInput>,
        errors_seen: Vec<Option<String>>,
    }

    impl ScriptedEnroller {
        fn new(inputs: &[(&str, Option<&str>)]) -> Self {
            Self {
                script: inputs
                    .iter()
                    .map(|(truck, pin)| EnrollmentInput {
                        truck_number: (*truck).into(),
                        pin: pin.map(Into::into),
                    })
                    .collect(),
                errors_seen: Vec::new(),
            }
        }
    }

    impl Enroller for ScriptedEnroller {
        async fn request(&mut self, last_error: Option<&str>) -> Option<EnrollmentInput> {
            self.errors_seen.push(last_error.map(Into::into));
            self.script.pop_front()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        statuses: Vec<String>,
        notices: Vec<String>,
        listed: Vec<String>,
        cached: Vec<CacheEntry>,
    }

    impl StatusSink for RecordingSink {
        fn status(&mut self, message: &str) {
            self.statuses.push(message.into());
        }

        fn notice(&mut self, message: &str) {
            self.notices.push(message.into());
        }

        fn documents(&mut self, _truck: &str, documents: &[TruckDocument]) {
            self.listed = documents.iter().map(|d| d.name.clone()).collect();
        }

        fn cached(&mut self, entries: &[CacheEntry]) {
            self.cached = entries.to_vec();
        }
    }

    fn backend() -> FakeBackend {
        FakeBackend {
            documents: HashMap::from([(
                "4521".to_string(),
                vec![
                    document("handbook.pdf", "d1", true),
                    document("registration-4521.PDF", "d2", false),
                    document("notes.docx", "d3", false),
                ],
            )]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_enrolls_then_lists_and_caches_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path());
        let mut shell = Shell::new(
            backend(),
            cache.clone(),
            ScriptedEnroller::new(&[("4521", None)]),
            RecordingSink::default(),
            "dev-abc",
        );

        let state = shell.run(false).await.unwrap();
        assert_eq!(
            state,
            ShellState::Resolved {
                truck: "4521".into()
            }
        );
        assert_eq!(
            shell.sink.listed,
            ["handbook.pdf", "registration-4521.PDF", "notes.docx"]
        );

        let cached: Vec<String> = cache.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(cached, ["handbook.pdf", "registration-4521.PDF"]);
    }

    #[tokio::test]
    async fn test_rejected_enrollment_asks_again() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend {
            pin: Some("0000".into()),
            ..backend()
        };
        let mut shell = Shell::new(
            backend,
            DirCache::new(dir.path()),
            ScriptedEnroller::new(&[("4521", Some("1234")), ("4521", Some("0000"))]),
            RecordingSink::default(),
            "dev-abc",
        );

        let state = shell.run(false).await.unwrap();
        assert_eq!(state, ShellState::Resolved { truck: "4521".into() });
        assert_eq!(
            shell.enroller.errors_seen,
            [None, Some("Invalid PIN".to_string())]
        );
    }

    #[tokio::test]
    async fn test_cancelled_enrollment_ends_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = Shell::new(
            backend(),
            DirCache::new(dir.path()),
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        let err = shell.run(false).await.unwrap_err();
        assert!(err.downcast_ref::<EnrollmentCancelled>().is_some());
        assert_eq!(shell.state(), &ShellState::Enrolling);
    }

    #[tokio::test]
    async fn test_assigned_device_skips_enrollment() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        backend
            .assignments
            .lock()
            .unwrap()
            .insert("dev-abc".into(), "4521".into());
        let mut shell = Shell::new(
            backend,
            DirCache::new(dir.path()),
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        shell.run(false).await.unwrap();
        assert_eq!(shell.enroller.errors_seen.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path());
        let backend = FakeBackend {
            broken_content: Some("d1".into()),
            ..backend()
        };
        let mut shell = Shell::new(
            backend,
            cache.clone(),
            ScriptedEnroller::new(&[("4521", None)]),
            RecordingSink::default(),
            "dev-abc",
        );

        shell.run(false).await.unwrap();
        let cached: Vec<String> = cache.list().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(cached, ["registration-4521.PDF"]);
        assert!(shell.sink.notices.contains(&"1 documents available offline".to_string()));
    }

    #[tokio::test]
    async fn test_offline_uses_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path());
        cache
            .replace_all(vec![CachedDocument {
                name: "handbook.pdf".into(),
                bytes: b"pdf".to_vec(),
            }])
            .unwrap();

        let backend = backend();
        let calls = backend.calls.clone();
        let mut shell = Shell::new(
            backend,
            cache,
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        assert_eq!(shell.run(true).await.unwrap(), ShellState::Offline);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(shell.sink.cached.len(), 1);
        assert_eq!(shell.sink.statuses, ["Offline"]);
    }

    fn cache_with_handbook(dir: &std::path::Path) -> DirCache {
        let cache = DirCache::new(dir);
        cache
            .replace_all(vec![CachedDocument {
                name: "handbook.pdf".into(),
                bytes: b"pdf".to_vec(),
            }])
            .unwrap();
        cache
    }

    #[tokio::test]
    async fn test_unreachable_server_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1/api");
        let mut shell = Shell::new(
            backend,
            cache_with_handbook(dir.path()),
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        assert_eq!(shell.run(false).await.unwrap(), ShellState::Offline);
        assert_eq!(shell.sink.cached.len(), 1);
        assert_eq!(shell.sink.cached[0].name, "handbook.pdf");
        assert!(shell.enroller.errors_seen.is_empty());
    }

    #[tokio::test]
    async fn test_lost_connection_before_listing_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/resolveDeviceTruck")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"assigned","truckNumber":"4521"}"#)
            .create_async()
            .await;

        // The listing goes to a port nothing listens on.
        struct SplitBackend {
            up: ApiClient,
            down: ApiClient,
        }

        impl ShellBackend for SplitBackend {
            async fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<AssignmentStatus> {
                self.up.resolve(device_id).await
            }

            async fn assign(
                &self,
                device_id: &str,
                truck: &str,
                pin: Option<&str>,
            ) -> color_eyre::eyre::Result<AssignmentStatus> {
                self.up.assign(device_id, truck, pin).await
            }

            async fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignResponse> {
                self.up.unassign(device_id).await
            }

            async fn documents(&self, truck: &str) -> color_eyre::eyre::Result<Vec<TruckDocument>> {
                self.down.documents(truck).await
            }

            async fn content(&self, drive_item_id: &str) -> color_eyre::eyre::Result<Vec<u8>> {
                self.down.content(drive_item_id).await
            }
        }

        let backend = SplitBackend {
            up: ApiClient::new(reqwest::Client::new(), format!("{}/api", server.url())),
            down: ApiClient::new(reqwest::Client::new(), "http://127.0.0.1:1/api"),
        };
        let cache = cache_with_handbook(dir.path());
        let mut shell = Shell::new(
            backend,
            cache.clone(),
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        assert_eq!(shell.run(false).await.unwrap(), ShellState::Offline);
        assert_eq!(shell.sink.cached.len(), 1);
        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_server_rejection_is_not_offline() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/resolveDeviceTruck")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Missing DEVICE_MAP_DATABASE_URL"}"#)
            .create_async()
            .await;

        let backend = ApiClient::new(reqwest::Client::new(), format!("{}/api", server.url()));
        let mut shell = Shell::new(
            backend,
            cache_with_handbook(dir.path()),
            ScriptedEnroller::new(&[]),
            RecordingSink::default(),
            "dev-abc",
        );

        let err = shell.run(false).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing DEVICE_MAP_DATABASE_URL");
        assert_eq!(shell.state(), &ShellState::Unresolved);
        assert!(shell.sink.cached.is_empty());
    }
}
