//! Application services.
//!
//! Services own the orchestration: permission checks first, then the effect,
//! then the audit entry. Repositories stay free of policy.

pub mod audit;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod metadata;
pub mod search;
pub mod stats;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::{AuditFilter, AuditLog, AuditPage};
pub use dispatch::{
    DispatchError, EnrichmentDispatcher, EnrichmentJob, HttpDispatcher, CALLBACK_TOKEN_HEADER,
};
pub use documents::{
    AddOutcome, DocumentService, DocumentUpdate, Download, ReplacementFile, Upload,
};
pub use error::ServiceError;
pub use metadata::{MetadataInput, MetadataService, MetadataView};
pub use search::{SearchPage, SearchRequest, SearchService};
pub use stats::{DashboardTotals, StatsService};
pub use sync::{MetadataSynchronizer, OcrCallback, OcrFailure, SyncOutcome};

use std::sync::Arc;

use crate::repository::DbContext;
use crate::storage::BlobStore;

/// Every service, wired to one database and blob store.
#[derive(Clone)]
pub struct Services {
    pub documents: DocumentService,
    pub metadata: MetadataService,
    pub sync: MetadataSynchronizer,
    pub search: SearchService,
    pub stats: StatsService,
    pub audit: AuditLog,
}

impl Services {
    /// `public_url` is the base the worker uses to call back into the
    /// archive.
    pub fn new(
        ctx: &DbContext,
        blobs: Arc<dyn BlobStore>,
        dispatcher: Arc<dyn EnrichmentDispatcher>,
        public_url: &str,
    ) -> Self {
        let audit = AuditLog::new(ctx.audit());
        Self {
            documents: DocumentService::new(ctx, blobs, dispatcher, audit.clone(), public_url),
            metadata: MetadataService::new(ctx, audit.clone()),
            sync: MetadataSynchronizer::new(ctx, audit.clone()),
            search: SearchService::new(ctx, audit.clone()),
            stats: StatsService::new(ctx),
            audit,
        }
    }
}
