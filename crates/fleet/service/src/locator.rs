//! Document lookup for a truck.

use color_eyre::eyre::WrapErr as _;
use fleet_core::{DriveItem, ListItem, TruckDocument};
use fleet_upstream::{AccessToken, DocumentContent, DocumentLibrary, TokenSource};

const DEFAULT_FILE_NAME: &str = "document.pdf";
const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// Finds and fetches library documents relevant to a truck.
#[derive(Clone)]
pub struct DocumentLocator<K, L> {
    tokens: K,
    library: L,
}

impl<K, L> DocumentLocator<K, L> {
    pub fn new(tokens: K, library: L) -> Self {
        Self { tokens, library }
    }
}

impl<K: TokenSource, L: DocumentLibrary> DocumentLocator<K, L> {
    /// Acquire a fresh token.
    pub async fn token(&self) -> color_eyre::eyre::Result<AccessToken> {
        self.tokens
            .acquire_token()
            .await
            .wrap_err("failed to acquire graph token")
    }

    /// List documents that apply to the truck or to every truck.
    pub async fn documents_for_truck(
        &self,
        truck: &str,
    ) -> color_eyre::eyre::Result<Vec<TruckDocument>> {
        let token = self.token().await?;
        self.documents_with_token(&token, truck).await
    }

    /// Same as [`Self::documents_for_truck`] with a caller-held token.
    pub async fn documents_with_token(
        &self,
        token: &AccessToken,
        truck: &str,
    ) -> color_eyre::eyre::Result<Vec<TruckDocument>> {
        let items = self.library.list_items(token).await?;
        let relevant: Vec<&ListItem> = items.iter().filter(|i| i.is_relevant_for(truck)).collect();

        tracing::info!(
            truck = %truck,
            total = items.len(),
            relevant = relevant.len(),
            "classified library items"
        );

        let resolved = futures::future::join_all(
            relevant
                .iter()
                .map(|item| self.library.drive_item_for(token, &item.id)),
        )
        .await;

        let documents = relevant
            .into_iter()
            .zip(resolved)
            .filter_map(|(item, drive_item)| match drive_item {
                Ok(drive_item) => Some(TruckDocument::from_parts(item, drive_item)),
                Err(e) => {
                    tracing::warn!(item_id = %item.id, error = %e, "failed to resolve drive item");
                    None
                }
            })
            .collect();

        Ok(documents)
    }

    /// Download a document with its file name and content type.
    pub async fn open_document(
        &self,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<DocumentContent> {
        let token = self.token().await?;
        self.download_with_token(&token, drive_item_id).await
    }

    /// Same as [`Self::open_document`] with a caller-held token.
    pub async fn download_with_token(
        &self,
        token: &AccessToken,
        drive_item_id: &str,
    ) -> color_eyre::eyre::Result<DocumentContent> {
        let DriveItem { name, file, .. } = self
            .library
            .item_metadata(token, drive_item_id)
            .await
            .wrap_err_with(|| format!("failed to read metadata of {drive_item_id}"))?;

        let bytes = self
            .library
            .download(token, drive_item_id)
            .await
            .wrap_err_with(|| format!("failed to download {drive_item_id}"))?;

        tracing::debug!(item_id = %drive_item_id, bytes = bytes.len(), "downloaded document");

        Ok(DocumentContent {
            file_name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
            mime_type: file
                .and_then(|f| f.mime_type)
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Doc, FakeLibrary, FakeTokens};

    fn library() -> FakeLibrary {
        FakeLibrary::new(&[
            Doc {
                id: "1",
                name: "handbook.pdf",
                asset: None,
                global: true,
            },
            Doc {
                id: "2",
                name: "registration-1577.pdf",
                asset: Some("1577"),
                global: false,
            },
            Doc {
                id: "3",
                name: "registration-4521.pdf",
                asset: Some("4521"),
                global: false,
            },
        ])
    }

    #[tokio::test]
    async fn test_documents_for_truck_filters_by_asset() {
        let locator = DocumentLocator::new(FakeTokens::default(), library());
        let docs = locator.documents_for_truck("1577").await.unwrap();

        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["handbook.pdf", "registration-1577.pdf"]);
        assert!(docs[0].applies_to_all_trucks);
        assert_eq!(docs[1].drive_item_id, "drive-2");
    }

    #[tokio::test]
    async fn test_unresolvable_item_is_dropped() {
        let locator = DocumentLocator::new(FakeTokens::default(), library().break_item("1"));
        let docs = locator.documents_for_truck("1577").await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "registration-1577.pdf");
    }

    #[tokio::test]
    async fn test_token_per_operation() {
        let tokens = FakeTokens::default();
        let locator = DocumentLocator::new(tokens.clone(), library());

        locator.documents_for_truck("1577").await.unwrap();
        locator.documents_for_truck("4521").await.unwrap();
        assert_eq!(*tokens.issued.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_open_document_defaults_mime_type() {
        let locator = DocumentLocator::new(FakeTokens::default(), library());
        let content = locator.open_document("drive-2").await.unwrap();

        assert_eq!(content.file_name, "registration-1577.pdf");
        assert_eq!(content.mime_type, "application/pdf");
        assert_eq!(content.bytes, b"content of drive-2");
    }
}
