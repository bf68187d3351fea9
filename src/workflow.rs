//! The analysis workflow: collect flyers and preferences, run one analysis,
//! hand the flyer off to persistence in the background.
//!
//! ```text
//! Input --submit--> Analyzing --ok--> Result
//!   ^                  |                 |
//!   +------error-------+                 |
//!   +---------------- reset -------------+
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use time::{Date, OffsetDateTime};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    analysis::{AnalysisResult, FlyerAnalyzer},
    errors::{ValidationError, WorkflowError},
    files::{FlyerFile, FlyerFiles, PreviewRegistry},
    flyers::{
        client::FlyerPersistence,
        dto::{FlyerItem, UNKNOWN_STORE},
    },
    preferences::Preferences,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Input,
    Analyzing,
    Result,
}

/// Background save status, reported separately from the analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistStatus {
    Idle,
    Saving,
    Saved { flyer_id: i32, image_urls: Vec<String> },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed { is_flyer: bool, persisting: bool },
    /// The workflow was reset while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub file_name: String,
    pub content_type: String,
    pub preview_url: Option<String>,
}

/// Read-only view of the controller for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub step: Step,
    pub files: Vec<FileSummary>,
    pub preferences: Preferences,
    pub store_name: Option<String>,
    pub flyer_date: Option<Date>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

struct State {
    step: Step,
    files: FlyerFiles,
    preferences: Preferences,
    store_name: Option<String>,
    flyer_date: Option<Date>,
    result: Option<AnalysisResult>,
    error: Option<String>,
    generation: u64,
}

struct Inner {
    state: Mutex<State>,
    analyzer: Arc<dyn FlyerAnalyzer>,
    persistence: Arc<dyn FlyerPersistence>,
    persist_status: watch::Sender<PersistStatus>,
    previews: Arc<PreviewRegistry>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Puts the workflow back to `Input` when a `submit_analysis` future is
/// dropped before the analyzer answered.
struct InFlight<'a> {
    inner: &'a Inner,
    generation: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut st = self.inner.state();
        if st.generation == self.generation && st.step == Step::Analyzing {
            st.step = Step::Input;
            debug!(generation = self.generation, "analysis abandoned by caller");
        }
    }
}

/// Cheap-clone handle; clones share one workflow.
#[derive(Clone)]
pub struct WorkflowController {
    inner: Arc<Inner>,
}

impl WorkflowController {
    pub fn new(analyzer: Arc<dyn FlyerAnalyzer>, persistence: Arc<dyn FlyerPersistence>) -> Self {
        let previews = PreviewRegistry::new();
        let (persist_status, _) = watch::channel(PersistStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    step: Step::Input,
                    files: FlyerFiles::new(Arc::clone(&previews)),
                    preferences: Preferences::default(),
                    store_name: None,
                    flyer_date: None,
                    result: None,
                    error: None,
                    generation: 0,
                }),
                analyzer,
                persistence,
                persist_status,
                previews,
            }),
        }
    }

    // ---- inputs ----

    pub fn add_files(&self, files: impl IntoIterator<Item = FlyerFile>) -> usize {
        self.inner.state().files.add(files)
    }

    pub fn remove_file(&self, index: usize) -> Option<FlyerFile> {
        self.inner.state().files.remove(index)
    }

    pub fn preferences(&self) -> Preferences {
        self.inner.state().preferences.clone()
    }

    pub fn set_preferences(&self, preferences: Preferences) {
        self.inner.state().preferences = preferences;
    }

    pub fn update_preferences(&self, f: impl FnOnce(&mut Preferences)) {
        f(&mut self.inner.state().preferences);
    }

    pub fn add_fridge_ingredient(&self, name: &str) -> bool {
        self.inner.state().preferences.add_fridge_ingredient(name)
    }

    pub fn remove_fridge_ingredient(&self, name: &str) -> bool {
        self.inner.state().preferences.remove_fridge_ingredient(name)
    }

    /// Store name and flyer date sent with the saved flyer. `None` falls back
    /// to the unknown-store label and today's date.
    pub fn set_flyer_meta(&self, store_name: Option<String>, flyer_date: Option<Date>) {
        let mut st = self.inner.state();
        st.store_name = store_name.filter(|s| !s.trim().is_empty());
        st.flyer_date = flyer_date;
    }

    // ---- queries ----

    pub fn step(&self) -> Step {
        self.inner.state().step
    }

    pub fn can_submit(&self) -> bool {
        let st = self.inner.state();
        st.step == Step::Input && !st.files.is_empty()
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.inner.state().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state().error.clone()
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let st = self.inner.state();
        WorkflowSnapshot {
            step: st.step,
            files: st
                .files
                .entries()
                .iter()
                .map(|e| FileSummary {
                    file_name: e.file.file_name.clone(),
                    content_type: e.file.content_type.clone(),
                    preview_url: e.preview.url().map(str::to_owned),
                })
                .collect(),
            preferences: st.preferences.clone(),
            store_name: st.store_name.clone(),
            flyer_date: st.flyer_date,
            result: st.result.clone(),
            error: st.error.clone(),
        }
    }

    pub fn persist_status(&self) -> watch::Receiver<PersistStatus> {
        self.inner.persist_status.subscribe()
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.inner.previews
    }

    // ---- transitions ----

    /// Runs one analysis over the current files and preferences.
    ///
    /// On a flyer result the save is started in a background task and its
    /// progress goes to [`persist_status`](Self::persist_status).
    #[instrument(skip(self))]
    pub async fn submit_analysis(&self) -> Result<SubmitOutcome, WorkflowError> {
        let (files, prefs, generation) = {
            let mut st = self.inner.state();
            match st.step {
                Step::Input => {}
                Step::Analyzing => {
                    debug!("submission ignored, analysis in flight");
                    return Err(WorkflowError::AnalysisInFlight);
                }
                Step::Result => {
                    debug!("submission ignored, result showing");
                    return Err(WorkflowError::ResultPending);
                }
            }
            let checked = if st.files.is_empty() {
                Err(ValidationError::NoFiles)
            } else {
                st.preferences.validate()
            };
            if let Err(e) = checked {
                st.error = Some(e.to_string());
                return Err(e.into());
            }
            st.generation += 1;
            st.step = Step::Analyzing;
            st.error = None;
            st.result = None;
            (st.files.snapshot(), st.preferences.clone(), st.generation)
        };

        let mut in_flight = InFlight {
            inner: &self.inner,
            generation,
            settled: false,
        };
        let outcome = self.inner.analyzer.analyze(&files, &prefs).await;
        in_flight.settled = true;

        let mut st = self.inner.state();
        if st.generation != generation {
            debug!(generation, "workflow reset during analysis, response discarded");
            return Ok(SubmitOutcome::Discarded);
        }
        match outcome {
            Ok(result) => {
                let is_flyer = result.is_flyer;
                info!(
                    is_flyer,
                    recipes = result.recipes.len(),
                    deals = result.detected_deals.len(),
                    "analysis finished"
                );
                let items: Vec<FlyerItem> =
                    result.detected_deals.iter().map(FlyerItem::deal).collect();
                st.result = Some(result);
                st.step = Step::Result;
                if is_flyer {
                    let store_name = st
                        .store_name
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_STORE.to_string());
                    let flyer_date = st
                        .flyer_date
                        .unwrap_or_else(|| OffsetDateTime::now_utc().date());
                    self.inner.persist_status.send_replace(PersistStatus::Saving);
                    drop(st);
                    self.spawn_persist(files, store_name, flyer_date, items, generation);
                }
                Ok(SubmitOutcome::Completed {
                    is_flyer,
                    persisting: is_flyer,
                })
            }
            Err(e) => {
                warn!(error = %e, "analysis failed");
                st.error = Some(e.to_string());
                st.step = Step::Input;
                Err(e.into())
            }
        }
    }

    fn spawn_persist(
        &self,
        files: Vec<FlyerFile>,
        store_name: String,
        flyer_date: Date,
        items: Vec<FlyerItem>,
        generation: u64,
    ) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner
                .persistence
                .persist_flyer(&files, &store_name, flyer_date, &items)
                .await;

            // Held while publishing so a concurrent reset cannot interleave.
            let st = inner.state();
            if st.generation != generation {
                debug!(generation, "workflow reset during save, status discarded");
                return;
            }
            let status = match outcome {
                Ok(saved) => {
                    info!(flyer_id = saved.flyer_id, images = saved.image_urls.len(), "flyer saved");
                    PersistStatus::Saved {
                        flyer_id: saved.flyer_id,
                        image_urls: saved.image_urls,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "flyer save failed");
                    PersistStatus::Failed(e.to_string())
                }
            };
            inner.persist_status.send_replace(status);
        });
    }

    /// Back to an empty `Input`. Any call still in flight is abandoned.
    pub fn reset(&self) {
        let mut st = self.inner.state();
        st.generation += 1;
        st.step = Step::Input;
        st.files.clear();
        st.preferences = Preferences::default();
        st.store_name = None;
        st.flyer_date = None;
        st.result = None;
        st.error = None;
        self.inner.persist_status.send_replace(PersistStatus::Idle);
        debug!(generation = st.generation, "workflow reset");
    }

    pub fn dismiss_error(&self) {
        self.inner.state().error = None;
    }
}
