//! Shared fixtures for service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use super::dispatch::{DispatchError, EnrichmentDispatcher, EnrichmentJob};
use super::Services;
use crate::repository::DbContext;
use crate::storage::LocalBlobStore;

/// Dispatcher that records jobs instead of sending them.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub jobs: Mutex<Vec<EnrichmentJob>>,
    pub fail: bool,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn jobs(&self) -> Vec<EnrichmentJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnrichmentDispatcher for RecordingDispatcher {
    async fn dispatch(&self, job: &EnrichmentJob) -> Result<(), DispatchError> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.fail {
            return Err(DispatchError::Rejected {
                status: 503,
                body: "worker down".to_string(),
            });
        }
        Ok(())
    }
}

pub struct Fixture {
    pub services: Services,
    pub ctx: DbContext,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub dir: TempDir,
}

impl Fixture {
    pub fn blob_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .flatten()
                .map(|e| {
                    let path = e.path();
                    if path.is_dir() {
                        walk(&path)
                    } else {
                        1
                    }
                })
                .sum()
        }
        walk(&self.dir.path().join("blobs"))
    }
}

pub async fn fixture_with(dispatcher: RecordingDispatcher) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("test.db"));
    ctx.init_schema().await.unwrap();
    let blobs = Arc::new(LocalBlobStore::new(dir.path().join("blobs")));
    let dispatcher = Arc::new(dispatcher);
    let services = Services::new(&ctx, blobs, dispatcher.clone(), "http://archive.test");
    Fixture {
        services,
        ctx,
        dispatcher,
        dir,
    }
}

pub async fn fixture() -> Fixture {
    fixture_with(RecordingDispatcher::default()).await
}
