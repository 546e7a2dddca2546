use base64::prelude::*;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::error::{AppError, Result};

/// Database-resident copy of a file's bytes
#[derive(Debug, Clone, FromRow)]
pub struct BackupBlob {
    pub file_id: Uuid,
    pub content_base64: String,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

impl BackupBlob {
    pub fn encode(data: &[u8]) -> String {
        BASE64_STANDARD.encode(data)
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64_STANDARD.decode(&self.content_base64).map_err(|e| {
            AppError::Storage(format!("Corrupt backup for file {}: {}", self.file_id, e))
        })
    }
}
