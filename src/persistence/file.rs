//! JSON-lines store: one file for interactions, one for generated POIs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::{PersistenceError, PersistenceResult};
use super::{PersistencePort, check_pois};
use crate::generation::{GenerationInteraction, InteractionId};
use crate::poi::Poi;

const INTERACTIONS_FILE: &str = "interactions.jsonl";
const POIS_FILE: &str = "generated_pois.jsonl";

/// One persisted POI row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPoi {
    pub interaction_id: InteractionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub poi: Poi,
}

pub struct FilePersistence {
    dir: PathBuf,
    // Serializes appends so concurrent rows never interleave.
    write_lock: Mutex<()>,
}

impl FilePersistence {
    pub async fn open(dir: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| PersistenceError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn load_interactions(&self) -> PersistenceResult<Vec<GenerationInteraction>> {
        self.read_lines(INTERACTIONS_FILE).await
    }

    pub async fn load_pois(&self) -> PersistenceResult<Vec<StoredPoi>> {
        self.read_lines(POIS_FILE).await
    }

    async fn append(&self, file: &str, lines: &[String]) -> PersistenceResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let path = self.dir.join(file);
        let mut buf = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let io_err = |source| PersistenceError::Io {
            path: path.clone(),
            source,
        };
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        handle.write_all(buf.as_bytes()).await.map_err(io_err)?;
        handle.flush().await.map_err(io_err)?;
        debug!(path = %path.display(), rows = lines.len(), "Appended rows");
        Ok(())
    }

    async fn read_lines<T: serde::de::DeserializeOwned>(
        &self,
        file: &str,
    ) -> PersistenceResult<Vec<T>> {
        let path = self.dir.join(file);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        raw.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(PersistenceError::from))
            .collect()
    }
}

impl std::fmt::Debug for FilePersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePersistence")
            .field("dir", &self.dir)
            .finish()
    }
}

#[async_trait]
impl PersistencePort for FilePersistence {
    async fn save_generation_interaction(
        &self,
        record: &GenerationInteraction,
    ) -> PersistenceResult<InteractionId> {
        let line = serde_json::to_string(record)?;
        self.append(INTERACTIONS_FILE, &[line]).await?;
        Ok(record.id())
    }

    async fn save_generated_pois(
        &self,
        user_id: Option<&str>,
        pois: &[Poi],
        interaction_id: InteractionId,
    ) -> PersistenceResult<()> {
        check_pois(pois)?;
        let lines = pois
            .iter()
            .map(|poi| {
                let mut poi = poi.clone();
                poi.rank_score = None;
                serde_json::to_string(&StoredPoi {
                    interaction_id,
                    user_id: user_id.map(str::to_string),
                    poi,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.append(POIS_FILE, &lines).await
    }
}
