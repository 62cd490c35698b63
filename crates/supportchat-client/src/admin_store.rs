//! Document list state for the admin panel.

use std::path::Path;

use tracing::error;

use supportchat_core::types::Document;

use crate::api::ApiClient;
use crate::error::ClientError;

#[derive(Debug)]
pub struct AdminStore {
    client: ApiClient,
    documents: Vec<Document>,
    is_loading: bool,
}

impl AdminStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            documents: Vec::new(),
            is_loading: false,
        }
    }

    /// Documents as last fetched, newest first.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub async fn fetch_documents(&mut self) -> Result<(), ClientError> {
        self.is_loading = true;
        let result = self.client.list_documents().await;
        self.is_loading = false;

        match result {
            Ok(docs) => {
                self.documents = docs;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch documents");
                Err(e)
            }
        }
    }

    /// Upload a document, then refresh the list.
    pub async fn upload_document(
        &mut self,
        title: &str,
        content: &str,
    ) -> Result<Document, ClientError> {
        let doc = self.client.upload_document(title, content).await?;
        self.fetch_documents().await?;
        Ok(doc)
    }

    /// Upload a text file from disk, then refresh the list.
    pub async fn upload_path(
        &mut self,
        title: Option<&str>,
        path: &Path,
    ) -> Result<Document, ClientError> {
        let doc = self.client.upload_path(title, path).await?;
        self.fetch_documents().await?;
        Ok(doc)
    }

    /// Delete on the server, then drop the local copy.
    pub async fn delete_document(&mut self, id: &str) -> Result<(), ClientError> {
        self.client.delete_document(id).await?;
        self.documents.retain(|d| d.id != id);
        Ok(())
    }
}
