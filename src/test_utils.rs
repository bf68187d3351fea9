//! In-memory fakes for the server state and the client-side contracts.

use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
    Arc, Mutex,
};

use axum::async_trait;
use bytes::Bytes;
use time::{Date, Duration, OffsetDateTime};
use tokio::sync::Notify;

use crate::{
    analysis::{fixtures, parse_model_answer, AnalysisResult, FlyerAnalyzer},
    app::build_app,
    config::{AppConfig, BlobConfig},
    errors::{AnalysisError, FetchError, PersistenceError},
    files::FlyerFile,
    flyers::{
        client::{FlyerPersistence, SavedFlyer},
        dto::{FlyerItem, FlyerRecord},
        repo::FlyerRepository,
        repo_types::NewFlyer,
    },
    preferences::Preferences,
    state::AppState,
    storage::StorageClient,
};

// ---- server side ----

#[derive(Default)]
pub struct FakeStorage {
    puts: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeStorage {
    /// `(key, content_type)` of every successful put, in order.
    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn fail_puts(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, _body: Bytes, content_type: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("bucket unavailable");
        }
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://blob.test/{key}")
    }
}

pub struct InMemoryFlyerRepository {
    rows: Mutex<Vec<FlyerRecord>>,
    next_id: AtomicI32,
    fail_reads: AtomicBool,
    epoch: OffsetDateTime,
}

impl Default for InMemoryFlyerRepository {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
            fail_reads: AtomicBool::new(false),
            epoch: OffsetDateTime::now_utc(),
        }
    }
}

impl InMemoryFlyerRepository {
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FlyerRepository for InMemoryFlyerRepository {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_flyer(&self, flyer: NewFlyer<'_>) -> anyhow::Result<i32> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut item_id = id * 100;
        let items = flyer
            .items
            .iter()
            .map(|i| {
                item_id += 1;
                FlyerItem {
                    id: Some(item_id),
                    ..i.clone()
                }
            })
            .collect();
        // Strictly increasing so ordering never depends on clock resolution.
        let created_at = self.epoch + Duration::seconds(id as i64);
        self.rows.lock().unwrap().push(FlyerRecord {
            id,
            store_name: flyer.store_name.to_string(),
            flyer_date: flyer.flyer_date,
            image_urls: flyer.image_urls.to_vec(),
            created_at,
            items,
        });
        Ok(id)
    }

    async fn list_recent(&self, limit: i64) -> anyhow::Result<Vec<FlyerRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("database unavailable");
        }
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

pub struct Fakes {
    pub storage: Arc<FakeStorage>,
    pub flyers: Arc<InMemoryFlyerRepository>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://localhost/flyerchef_test".into(),
        blob: BlobConfig {
            endpoint: "http://localhost:9000".into(),
            bucket: "flyers".into(),
            access_key: "test".into(),
            secret_key: "test".into(),
            region: "us-east-1".into(),
            public_base_url: "https://blob.test".into(),
        },
        gemini: None,
    }
}

fn build_state(analyzer: Option<Arc<dyn FlyerAnalyzer>>) -> (AppState, Fakes) {
    let fakes = Fakes {
        storage: Arc::new(FakeStorage::default()),
        flyers: Arc::new(InMemoryFlyerRepository::default()),
    };
    let state = AppState::from_parts(
        Arc::new(test_config()),
        fakes.flyers.clone(),
        fakes.storage.clone(),
        analyzer,
    );
    (state, fakes)
}

/// State without an analyzer.
pub fn fake_state() -> (AppState, Fakes) {
    build_state(None)
}

pub fn fake_state_with_analyzer(analyzer: Arc<dyn FlyerAnalyzer>) -> (AppState, Fakes) {
    build_state(Some(analyzer))
}

/// Serves the full router on an ephemeral port and returns its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_app(state)).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct FormPart {
    name: &'static str,
    file_name: Option<&'static str>,
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl FormPart {
    /// A `files` part.
    pub fn file(file_name: &'static str, content_type: &'static str, body: &[u8]) -> Self {
        Self {
            name: "files",
            file_name: Some(file_name),
            content_type: Some(content_type),
            body: body.to_vec(),
        }
    }

    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            body: value.as_bytes().to_vec(),
        }
    }
}

/// Encodes `parts` as `multipart/form-data`; returns `(content-type, body)`.
pub fn multipart_body(parts: &[FormPart]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "flyerchef-test-boundary";
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.file_name {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

// ---- client side ----

pub fn image(name: &str) -> FlyerFile {
    FlyerFile::new(name, "image/jpeg", Bytes::from(name.as_bytes().to_vec())).unwrap()
}

enum StubMode {
    Flyer,
    Joke,
    Failing,
}

/// Analyzer answering from the canned fixtures. With a gate, each call
/// waits for one `notify_one` before answering.
pub struct StubAnalyzer {
    mode: StubMode,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    last_call: Mutex<Option<(usize, Preferences)>>,
}

impl StubAnalyzer {
    fn with_mode(mode: StubMode) -> Self {
        Self {
            mode,
            gate: None,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn flyer() -> Self {
        Self::with_mode(StubMode::Flyer)
    }

    pub fn joke() -> Self {
        Self::with_mode(StubMode::Joke)
    }

    pub fn failing() -> Self {
        Self::with_mode(StubMode::Failing)
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(file count, preferences)` of the latest call.
    pub fn last_call(&self) -> Option<(usize, Preferences)> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlyerAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        files: &[FlyerFile],
        prefs: &Preferences,
    ) -> Result<AnalysisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some((files.len(), prefs.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.mode {
            StubMode::Flyer => parse_model_answer(fixtures::FLYER_ANSWER),
            StubMode::Joke => parse_model_answer(fixtures::JOKE_ANSWER),
            StubMode::Failing => Err(AnalysisError::Upstream {
                status: 500,
                body: "model overloaded".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistCall {
    pub file_names: Vec<String>,
    pub store_name: String,
    pub flyer_date: Date,
    pub items: Vec<FlyerItem>,
}

/// Records every save; `list_flyers` answers from `history`.
#[derive(Default)]
pub struct RecordingPersistence {
    calls: Mutex<Vec<PersistCall>>,
    fail_saves: AtomicBool,
    fail_reads: AtomicBool,
    history: Mutex<Vec<FlyerRecord>>,
}

impl RecordingPersistence {
    pub fn calls(&self) -> Vec<PersistCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn set_history(&self, records: Vec<FlyerRecord>) {
        *self.history.lock().unwrap() = records;
    }
}

#[async_trait]
impl FlyerPersistence for RecordingPersistence {
    async fn persist_flyer(
        &self,
        files: &[FlyerFile],
        store_name: &str,
        flyer_date: Date,
        items: &[FlyerItem],
    ) -> Result<SavedFlyer, PersistenceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistenceError::Rejected {
                status: 500,
                message: "Failed to save flyer".into(),
            });
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(PersistCall {
            file_names: files.iter().map(|f| f.file_name.clone()).collect(),
            store_name: store_name.to_string(),
            flyer_date,
            items: items.to_vec(),
        });
        Ok(SavedFlyer {
            flyer_id: calls.len() as i32,
            image_urls: files
                .iter()
                .map(|f| format!("https://blob.test/flyers/{}", f.file_name))
                .collect(),
        })
    }

    async fn list_flyers(&self, limit: u32) -> Result<Vec<FlyerRecord>, FetchError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(FetchError::Server {
                status: 500,
                message: "Failed to fetch flyers".into(),
            });
        }
        let mut records = self.history.lock().unwrap().clone();
        records.truncate(limit as usize);
        Ok(records)
    }
}
