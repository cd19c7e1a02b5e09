use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use santa_core::{AssignmentDocument, DrawError, GiftLimit, Participant};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

mod file;
mod postgres;

pub use file::FileStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cannot seed document: {0}")]
    Draw(#[from] DrawError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Existing,
}

#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    fn backend_name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Option<AssignmentDocument>, StoreError>;

    // Returns whether `document` was written; an existing record is left alone.
    async fn create_if_absent(&self, document: &AssignmentDocument) -> Result<bool, StoreError>;

    async fn save(&self, document: &AssignmentDocument) -> Result<(), StoreError>;

    async fn initialize(
        &self,
        participants: &[Participant],
        default_limit: GiftLimit,
    ) -> Result<InitOutcome, StoreError> {
        let mut rng = ChaCha8Rng::from_entropy();
        let document = AssignmentDocument::generate(participants, default_limit, &mut rng)?;

        if self.create_if_absent(&document).await? {
            info!(backend = self.backend_name(), "assignment document created");
            Ok(InitOutcome::Created)
        } else {
            info!(backend = self.backend_name(), "existing assignment document found");
            Ok(InitOutcome::Existing)
        }
    }

    async fn load(&self) -> AssignmentDocument {
        match self.fetch().await {
            Ok(Some(document)) => document,
            Ok(None) => AssignmentDocument::default(),
            Err(err) => {
                warn!(
                    backend = self.backend_name(),
                    "load failed, serving empty document: {err}"
                );
                AssignmentDocument::default()
            }
        }
    }
}

pub async fn connect(config: &Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            info!("using postgres backend");
            Ok(Arc::new(store))
        }
        None => {
            warn!(
                "no database configured, running in local mode with {}",
                config.data_file.display()
            );
            Ok(Arc::new(FileStore::new(&config.data_file)))
        }
    }
}
