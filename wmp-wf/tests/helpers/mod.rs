//! Test Helper Utilities
//!
//! Test doubles for the classifier, image store and notification sink,
//! plus seeding for a small standard world:
//!
//! - users 1 (100 points) and 2 (50 points)
//! - companies 10 (CleanCo) and 20 (FixCo)
//! - area 100 "North": CleanCo collects waste, FixCo manages manholes
//! - area 200 "South": no assignments

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use std::path::Path;
use wmp_common::db::{
    init_database, init_memory_database, Addressee, Agreement, Company, ServiceType, User,
};
use wmp_common::events::EventBus;
use wmp_common::{Error, Result};
use wmp_wf::classifier::{ClassifierError, ClassifierTask, Payload, Verdict, VerdictClassifier};
use wmp_wf::gateway::{Gateway, UnitOfWork};
use wmp_wf::images::{ImageStore, ImageUpload};
use wmp_wf::notify::{NotificationSink, SqlNotificationSink};
use wmp_wf::Workflows;

pub const USER: i64 = 1;
pub const OTHER_USER: i64 = 2;
pub const CLEAN_CO: i64 = 10;
pub const FIX_CO: i64 = 20;
pub const NORTH: i64 = 100;
pub const SOUTH: i64 = 200;

/// Smallest byte string recognised as a PNG
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

pub fn png_image() -> ImageUpload {
    ImageUpload::from_bytes(PNG_BYTES.to_vec()).unwrap()
}

pub fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG_BYTES)
}

/// Classifier answering from per-task queues of scripted verdicts
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Mutex<HashMap<ClassifierTask, VecDeque<Verdict>>>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn answer(&self, task: ClassifierTask, verdict: Verdict) {
        self.answers
            .lock()
            .unwrap()
            .entry(task)
            .or_default()
            .push_back(verdict);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerdictClassifier for ScriptedClassifier {
    async fn classify(
        &self,
        task: ClassifierTask,
        _payload: Payload,
    ) -> std::result::Result<Verdict, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get_mut(&task)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| ClassifierError::Unavailable(format!("no scripted verdict for {}", task)))
    }
}

/// Image store keeping references only
#[derive(Default)]
pub struct MemoryImageStore {
    stored: Mutex<Vec<String>>,
}

impl MemoryImageStore {
    pub fn stored(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn put(&self, image: &ImageUpload) -> Result<String> {
        let mut stored = self.stored.lock().unwrap();
        let reference = format!("images/test-{}.{}", stored.len() + 1, image.extension());
        stored.push(reference.clone());
        Ok(reference)
    }
}

/// Sink that writes the first `succeed_first` notifications, then fails
pub struct FailingSink {
    succeed_first: usize,
    calls: AtomicUsize,
}

impl FailingSink {
    pub fn always() -> Self {
        Self::after(0)
    }

    pub fn after(succeed_first: usize) -> Self {
        Self {
            succeed_first,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, uow: &mut UnitOfWork, addressee: Addressee, content: &str) -> Result<i64> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.succeed_first {
            return SqlNotificationSink.notify(uow, addressee, content).await;
        }
        Err(Error::Internal("injected notification failure".to_string()))
    }
}

/// Workflows over a seeded in-memory database
pub struct Harness {
    pub workflows: Workflows,
    pub pool: SqlitePool,
    pub classifier: Arc<ScriptedClassifier>,
    pub images: Arc<MemoryImageStore>,
    pub events: EventBus,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_pool(init_memory_database().await.unwrap()).await
    }

    /// Seeded world in a WAL database file with a multi-connection pool
    pub async fn on_file(db_path: &Path) -> Self {
        Self::with_pool(init_database(db_path).await.unwrap()).await
    }

    async fn with_pool(pool: SqlitePool) -> Self {
        seed_world(&pool).await;

        let classifier = Arc::new(ScriptedClassifier::default());
        let images = Arc::new(MemoryImageStore::default());
        let events = EventBus::new(64);

        let workflows = Workflows::new(
            Gateway::new(pool.clone()),
            classifier.clone(),
            images.clone(),
            events.clone(),
        );

        Self {
            workflows,
            pool,
            classifier,
            images,
            events,
        }
    }

    /// Same database and doubles, different notification sink
    pub fn with_sink(&self, sink: Arc<dyn NotificationSink>) -> Workflows {
        self.workflows.clone().with_sink(sink)
    }

    pub fn answer(&self, task: ClassifierTask, verdict: Verdict) {
        self.classifier.answer(task, verdict);
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.pool).await.unwrap()
    }

    pub async fn user(&self, user_id: i64) -> User {
        sqlx::query_as("SELECT id, name, points FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn company(&self, company_id: i64) -> Company {
        sqlx::query_as("SELECT id, name, resolved_manholes FROM companies WHERE id = ?")
            .bind(company_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn points(&self, user_id: i64) -> i64 {
        self.user(user_id).await.points
    }

    /// Agreement rows recorded for a company, oldest first
    pub async fn agreements(&self, company_id: i64) -> Vec<Agreement> {
        sqlx::query_as(
            "SELECT id, company_id, kind, created_at FROM agreements WHERE company_id = ? ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }

    /// Notification contents for an addressee, oldest first
    pub async fn inbox(&self, addressee: Addressee) -> Vec<String> {
        let sql = match addressee {
            Addressee::User(_) => {
                "SELECT n.content FROM notifications n \
                 JOIN notification_user l ON l.notification_id = n.id \
                 WHERE l.user_id = ? ORDER BY n.id"
            }
            Addressee::Company(_) => {
                "SELECT n.content FROM notifications n \
                 JOIN notification_company l ON l.notification_id = n.id \
                 WHERE l.company_id = ? ORDER BY n.id"
            }
        };
        let id = match addressee {
            Addressee::User(id) | Addressee::Company(id) => id,
        };

        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .unwrap()
    }
}

pub async fn seed_world(pool: &SqlitePool) {
    for (id, name, points) in [(USER, "Ana", 100), (OTHER_USER, "Ben", 50)] {
        sqlx::query("INSERT INTO users (id, name, points) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(points)
            .execute(pool)
            .await
            .unwrap();
    }

    for (id, name) in [(CLEAN_CO, "CleanCo"), (FIX_CO, "FixCo")] {
        sqlx::query("INSERT INTO companies (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    for (id, name) in [(NORTH, "North"), (SOUTH, "South")] {
        sqlx::query("INSERT INTO areas (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    seed_assignment(pool, NORTH, CLEAN_CO, ServiceType::WasteCollection).await;
    seed_assignment(pool, NORTH, FIX_CO, ServiceType::ManholeManagement).await;
}

pub async fn seed_assignment(pool: &SqlitePool, area_id: i64, company_id: i64, service_type: ServiceType) {
    sqlx::query("INSERT INTO area_services (area_id, company_id, service_type) VALUES (?, ?, ?)")
        .bind(area_id)
        .bind(company_id)
        .bind(service_type.as_str())
        .execute(pool)
        .await
        .unwrap();
}
