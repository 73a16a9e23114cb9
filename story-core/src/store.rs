//! Persistence for story runs and steps.
//!
//! The orchestrator talks to storage through [`StoryStore`]. Two
//! implementations ship here: [`MemoryStore`] for tests and headless play,
//! and [`JsonFileStore`], which mirrors every mutation into a versioned JSON
//! snapshot on disk. A mutation only becomes visible once its snapshot has
//! been written.

use crate::choice::ChoiceId;
use crate::story::{RunId, StepId, StoryRun, StoryStep};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Story run {0} does not exist")]
    MissingRun(RunId),

    #[error("Story step {0} does not exist")]
    MissingStep(StepId),

    #[error("Story run {0} already exists")]
    DuplicateRun(RunId),

    #[error("Step {found} is out of order for run {run_id} (expected {expected})")]
    OutOfOrder {
        run_id: RunId,
        expected: u32,
        found: u32,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Create/read/update access to runs and steps.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Insert a new run.
    async fn create_run(&self, run: StoryRun) -> Result<StoryRun, StoreError>;

    /// Look up a run.
    async fn get_run(&self, id: RunId) -> Result<Option<StoryRun>, StoreError>;

    /// Replace an existing run.
    async fn update_run(&self, run: &StoryRun) -> Result<(), StoreError>;

    /// Insert the next step of a run. Step numbers must be consecutive from 1.
    async fn create_step(&self, step: StoryStep) -> Result<StoryStep, StoreError>;

    /// Look up a step.
    async fn get_step(&self, id: StepId) -> Result<Option<StoryStep>, StoreError>;

    /// The highest-numbered step of a run.
    async fn latest_step(&self, run_id: RunId) -> Result<Option<StoryStep>, StoreError>;

    /// All steps of a run, ordered by step number.
    async fn steps_for_run(&self, run_id: RunId) -> Result<Vec<StoryStep>, StoreError>;

    /// Record which choice the player picked on a step.
    async fn record_selection(&self, step_id: StepId, choice: ChoiceId) -> Result<(), StoreError>;
}

/// Plain data behind both stores.
#[derive(Debug, Clone, Default)]
struct StoreData {
    runs: HashMap<RunId, StoryRun>,
    steps: HashMap<StepId, StoryStep>,
    /// Step ids per run, in step order.
    run_steps: HashMap<RunId, Vec<StepId>>,
}

impl StoreData {
    fn create_run(&mut self, run: StoryRun) -> Result<StoryRun, StoreError> {
        if self.runs.contains_key(&run.id) {
            return Err(StoreError::DuplicateRun(run.id));
        }
        self.run_steps.entry(run.id).or_default();
        self.runs.insert(run.id, run.clone());
        Ok(run)
    }

    fn update_run(&mut self, run: &StoryRun) -> Result<(), StoreError> {
        let slot = self
            .runs
            .get_mut(&run.id)
            .ok_or(StoreError::MissingRun(run.id))?;
        *slot = run.clone();
        Ok(())
    }

    fn latest_step(&self, run_id: RunId) -> Option<&StoryStep> {
        self.run_steps
            .get(&run_id)
            .and_then(|ids| ids.last())
            .and_then(|id| self.steps.get(id))
    }

    fn create_step(&mut self, step: StoryStep) -> Result<StoryStep, StoreError> {
        if !self.runs.contains_key(&step.run_id) {
            return Err(StoreError::MissingRun(step.run_id));
        }
        let expected = self
            .latest_step(step.run_id)
            .map(|s| s.step_number + 1)
            .unwrap_or(1);
        if step.step_number != expected {
            return Err(StoreError::OutOfOrder {
                run_id: step.run_id,
                expected,
                found: step.step_number,
            });
        }
        self.run_steps.entry(step.run_id).or_default().push(step.id);
        self.steps.insert(step.id, step.clone());
        Ok(step)
    }

    fn steps_for_run(&self, run_id: RunId) -> Vec<StoryStep> {
        self.run_steps
            .get(&run_id)
            .map(|ids| ids.iter().filter_map(|id| self.steps.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    fn record_selection(&mut self, step_id: StepId, choice: ChoiceId) -> Result<(), StoreError> {
        let step = self
            .steps
            .get_mut(&step_id)
            .ok_or(StoreError::MissingStep(step_id))?;
        step.selected_choice = Some(choice);
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored runs.
    pub async fn run_count(&self) -> usize {
        self.data.read().await.runs.len()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn create_run(&self, run: StoryRun) -> Result<StoryRun, StoreError> {
        self.data.write().await.create_run(run)
    }

    async fn get_run(&self, id: RunId) -> Result<Option<StoryRun>, StoreError> {
        Ok(self.data.read().await.runs.get(&id).cloned())
    }

    async fn update_run(&self, run: &StoryRun) -> Result<(), StoreError> {
        self.data.write().await.update_run(run)
    }

    async fn create_step(&self, step: StoryStep) -> Result<StoryStep, StoreError> {
        self.data.write().await.create_step(step)
    }

    async fn get_step(&self, id: StepId) -> Result<Option<StoryStep>, StoreError> {
        Ok(self.data.read().await.steps.get(&id).cloned())
    }

    async fn latest_step(&self, run_id: RunId) -> Result<Option<StoryStep>, StoreError> {
        Ok(self.data.read().await.latest_step(run_id).cloned())
    }

    async fn steps_for_run(&self, run_id: RunId) -> Result<Vec<StoryStep>, StoreError> {
        Ok(self.data.read().await.steps_for_run(run_id))
    }

    async fn record_selection(&self, step_id: StepId, choice: ChoiceId) -> Result<(), StoreError> {
        self.data.write().await.record_selection(step_id, choice)
    }
}

/// Current snapshot file version.
const SNAPSHOT_VERSION: u32 = 1;

/// On-disk snapshot layout.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: String,
    runs: Vec<StoryRun>,
    steps: Vec<StoryStep>,
}

impl Snapshot {
    fn from_data(data: &StoreData) -> Self {
        let mut runs: Vec<StoryRun> = data.runs.values().cloned().collect();
        runs.sort_by_key(|r| r.created_at);
        let mut steps: Vec<StoryStep> = data.steps.values().cloned().collect();
        steps.sort_by(|a, b| (a.run_id, a.step_number).cmp(&(b.run_id, b.step_number)));
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            runs,
            steps,
        }
    }

    fn into_data(self) -> Result<StoreData, StoreError> {
        let mut data = StoreData::default();
        for run in self.runs {
            data.create_run(run)?;
        }
        let mut steps = self.steps;
        steps.sort_by_key(|s| s.step_number);
        for step in steps {
            data.create_step(step)?;
        }
        Ok(data)
    }
}

/// Store that persists a JSON snapshot after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoreData>,
}

impl JsonFileStore {
    /// Open a snapshot file, starting empty if it does not exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path).await {
            Ok(content) => {
                let snapshot: Snapshot = serde_json::from_str(&content)?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(StoreError::VersionMismatch {
                        expected: SNAPSHOT_VERSION,
                        found: snapshot.version,
                    });
                }
                snapshot.into_data()?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply a mutation to a copy of the data, write the copy to disk, and
    /// only then make it current. A failed write leaves memory untouched.
    async fn commit<T: Send>(
        &self,
        change: impl FnOnce(&mut StoreData) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        let out = change(&mut next)?;
        self.flush(&next).await?;
        *data = next;
        Ok(out)
    }

    async fn flush(&self, data: &StoreData) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&Snapshot::from_data(data))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl StoryStore for JsonFileStore {
    async fn create_run(&self, run: StoryRun) -> Result<StoryRun, StoreError> {
        self.commit(|data| data.create_run(run)).await
    }

    async fn get_run(&self, id: RunId) -> Result<Option<StoryRun>, StoreError> {
        Ok(self.data.read().await.runs.get(&id).cloned())
    }

    async fn update_run(&self, run: &StoryRun) -> Result<(), StoreError> {
        self.commit(|data| data.update_run(run)).await
    }

    async fn create_step(&self, step: StoryStep) -> Result<StoryStep, StoreError> {
        self.commit(|data| data.create_step(step)).await
    }

    async fn get_step(&self, id: StepId) -> Result<Option<StoryStep>, StoreError> {
        Ok(self.data.read().await.steps.get(&id).cloned())
    }

    async fn latest_step(&self, run_id: RunId) -> Result<Option<StoryStep>, StoreError> {
        Ok(self.data.read().await.latest_step(run_id).cloned())
    }

    async fn steps_for_run(&self, run_id: RunId) -> Result<Vec<StoryStep>, StoreError> {
        Ok(self.data.read().await.steps_for_run(run_id))
    }

    async fn record_selection(&self, step_id: StepId, choice: ChoiceId) -> Result<(), StoreError> {
        self.commit(|data| data.record_selection(step_id, choice)).await
    }
}
