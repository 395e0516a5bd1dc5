//! File upload to `/files`.

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use sicc_core::constants::DOCUMENT_UPLOAD_CONTENT_TYPE;
use sicc_core::{ItemId, SiccError, SiccResult};
use std::path::Path;

use crate::{DataEnvelope, DirectusClient};

/// Content type guessed from the file extension. Only PDF is recognized.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    (extension == "pdf").then_some(DOCUMENT_UPLOAD_CONTENT_TYPE)
}

impl DirectusClient {
    /// Upload a PDF and return the id of the created file row.
    pub async fn upload_file(&self, path: &Path) -> SiccResult<ItemId> {
        if content_type_for(path) != Some(DOCUMENT_UPLOAD_CONTENT_TYPE) {
            return Err(SiccError::InvalidInput(
                "Solo se permiten archivos PDF.".to_string(),
            ));
        }
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SiccError::InvalidInput(format!("No se pudo leer {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("documento.pdf")
            .to_string();

        self.upload_bytes(bytes, &filename).await
    }

    /// Multipart `POST /files` of an in-memory PDF.
    pub async fn upload_bytes(&self, bytes: Vec<u8>, filename: &str) -> SiccResult<ItemId> {
        let url = self.build_url("/files");
        tracing::debug!(filename, size = bytes.len(), "Uploading file");

        let envelope: DataEnvelope<Value> = self
            .execute_json(|client| {
                let part = Part::bytes(bytes.clone())
                    .file_name(filename.to_string())
                    .mime_str(DOCUMENT_UPLOAD_CONTENT_TYPE)
                    .unwrap_or_else(|_| Part::bytes(bytes.clone()).file_name(filename.to_string()));
                client.post(&url).multipart(Form::new().part("file", part))
            })
            .await?;

        envelope
            .data
            .as_ref()
            .and_then(|data| data.get("id"))
            .and_then(ItemId::from_value)
            .ok_or_else(|| {
                SiccError::InvalidResponse(
                    "No se recibió el identificador del archivo.".to_string(),
                )
            })
    }
}
