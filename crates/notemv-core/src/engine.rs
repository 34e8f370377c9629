//! The rename engine: a serialized queue of rename jobs and the worker that
//! drives each job through the pipeline.
//!
//! Phases of one job, in order: validate the new title against live store
//! state, snapshot every reference that must follow the rename, commit the
//! store rename, wait for the corpus index to fold the move in, then splice
//! the snapshotted references in their source documents. At most one job is
//! in flight at a time; callers enqueue and await a reply.

use crate::docpath::{is_markdown, sibling_path, title_of};
use crate::index::CorpusIndex;
use crate::metadata::{add_alias, replace_first_heading, set_title_key};
use crate::rewrite::splice_references;
use crate::sanitize::{sanitize, SanitizeError};
use crate::settings::Settings;
use crate::snapshot::{snapshot, PendingFixSet};
use crate::store::{DocumentStore, StoreError};
use crate::validate::{validate, ValidationErrorKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error(transparent)]
    InvalidTitle(#[from] SanitizeError),
    #[error("rename rejected: {0}")]
    Rejected(ValidationErrorKind),
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corpus index did not settle within {0:?}; references were not rewritten")]
    IndexTimeout(Duration),
    #[error("the rename worker is gone")]
    QueueClosed,
}

/// Immutable description of one rename, fixed at enqueue time. Everything
/// derived from the request (sanitized title, target path) is computed once
/// here; the worker only reads it.
#[derive(Clone, Debug, Serialize)]
pub struct RenameJob {
    pub old_path: String,
    pub old_title: String,
    /// Title exactly as requested, before sanitization.
    pub requested_title: String,
    pub new_title: String,
    /// Title written into metadata (alias, title key, first heading): the
    /// raw requested title when `store_invalid_title` keeps it, otherwise
    /// the cleaned one.
    pub title_to_store: String,
    pub new_path: String,
}

impl RenameJob {
    fn build(path: &str, requested_title: &str, settings: &Settings) -> Result<Self, RenameError> {
        let new_title = sanitize(
            requested_title,
            settings.invalid_character_action,
            settings.replacement_character,
            settings.platform_family,
        )?;
        let title_to_store = if settings.store_invalid_title {
            requested_title.to_string()
        } else {
            new_title.clone()
        };
        Ok(Self {
            old_path: path.to_string(),
            old_title: title_of(path).to_string(),
            requested_title: requested_title.to_string(),
            new_path: sibling_path(path, &new_title),
            new_title,
            title_to_store,
        })
    }
}

/// What one completed rename did.
#[derive(Clone, Debug, Serialize)]
pub struct RenameReport {
    pub old_path: String,
    pub new_path: String,
    pub new_title: String,
    /// Documents whose references were rewritten, sorted, renamed document
    /// included when it held self references or metadata updates.
    pub rewritten: Vec<String>,
}

struct QueuedJob {
    job: RenameJob,
    reply: oneshot::Sender<Result<RenameReport, RenameError>>,
}

pub struct RenameEngine {
    store: Arc<dyn DocumentStore>,
    index: Arc<CorpusIndex>,
    settings: Settings,
    job_tx: mpsc::Sender<QueuedJob>,
}

impl RenameEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<CorpusIndex>,
        settings: Settings,
    ) -> (Arc<Self>, RenameWorker) {
        let (job_tx, job_rx) = mpsc::channel(64);
        let engine = Arc::new(Self {
            store,
            index,
            settings,
            job_tx,
        });
        (engine.clone(), RenameWorker { engine, job_rx })
    }

    /// Enqueue a rename and wait for it to finish. Jobs run strictly one at
    /// a time in enqueue order.
    pub async fn rename(
        &self,
        path: &str,
        requested_title: &str,
    ) -> Result<RenameReport, RenameError> {
        if !self.settings.support_non_markdown_files && !is_markdown(path) {
            return Err(RenameError::UnsupportedDocument(path.to_string()));
        }
        let job = RenameJob::build(path, requested_title, &self.settings)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.job_tx
            .send(QueuedJob {
                job,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RenameError::QueueClosed)?;
        reply_rx.await.map_err(|_| RenameError::QueueClosed)?
    }

    async fn process(&self, job: &RenameJob) -> Result<RenameReport, RenameError> {
        // Rewrites from the previous job may still be in flight in the
        // index; the snapshot below must not be taken against them.
        self.await_index().await?;

        if let Some(kind) = validate(
            self.store.as_ref(),
            &job.old_title,
            &job.new_title,
            &job.new_path,
        )
        .await?
        {
            tracing::info!(
                old_path = %job.old_path,
                new_title = %job.new_title,
                "rename rejected: {}",
                kind
            );
            return Err(RenameError::Rejected(kind));
        }

        let fixes = snapshot(&self.index, &job.old_path, &job.old_title);
        tracing::debug!(
            old_path = %job.old_path,
            documents = fixes.len(),
            "captured reference snapshot"
        );

        self.store.rename(&job.old_path, &job.new_path).await?;
        self.index.on_document_update(&job.old_path).await;
        self.index.on_document_update(&job.new_path).await;
        tracing::info!(old_path = %job.old_path, new_path = %job.new_path, "document renamed");

        self.await_index().await?;

        let rewritten = self.rewrite_references(job, &fixes).await?;
        Ok(RenameReport {
            old_path: job.old_path.clone(),
            new_path: job.new_path.clone(),
            new_title: job.new_title.clone(),
            rewritten,
        })
    }

    /// Block until the index has folded in every reported mutation, bounded
    /// by the configured timeout. The snapshot was taken before the rename,
    /// so this wait only protects later jobs and readers, not correctness
    /// of the current fix set.
    async fn await_index(&self) -> Result<(), RenameError> {
        let timeout = self.settings.index_wait_timeout();
        let deadline = Instant::now() + timeout;
        let mut generation = self.index.subscribe();
        loop {
            generation.borrow_and_update();
            if self.index.is_idle() {
                return Ok(());
            }
            match tokio::time::timeout_at(deadline, generation.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => {
                    tracing::error!(?timeout, "corpus index did not settle in time");
                    return Err(RenameError::IndexTimeout(timeout));
                }
            }
        }
    }

    async fn rewrite_references(
        &self,
        job: &RenameJob,
        fixes: &PendingFixSet,
    ) -> Result<Vec<String>, RenameError> {
        let mut rewritten = Vec::new();
        for (source, slots) in fixes {
            // Self references moved with the document.
            let source = if source == &job.old_path {
                job.new_path.as_str()
            } else {
                source.as_str()
            };
            let result = self
                .store
                .read_modify_write(source, &|content| {
                    splice_references(content, slots, &job.old_title, &job.new_title)
                })
                .await;
            match result {
                Ok(()) => {
                    self.index.on_document_update(source).await;
                    rewritten.push(source.to_string());
                }
                // Per-document failures never abort the job; the other
                // sources still get their references fixed.
                Err(e) => {
                    tracing::error!(path = %source, "reference rewrite failed, skipping: {}", e);
                }
            }
        }

        if self.apply_metadata(job).await? {
            self.index.on_document_update(&job.new_path).await;
            if !rewritten.iter().any(|p| p == &job.new_path) {
                rewritten.push(job.new_path.clone());
            }
        }

        rewritten.sort();
        tracing::info!(
            new_path = %job.new_path,
            documents = rewritten.len(),
            "references rewritten"
        );
        Ok(rewritten)
    }

    /// Frontmatter and heading updates on the renamed document itself. The
    /// old title always lands in the alias list; it is what keeps the
    /// document resolvable under its former name. Returns whether anything
    /// was written.
    async fn apply_metadata(&self, job: &RenameJob) -> Result<bool, RenameError> {
        if !is_markdown(&job.new_path) {
            return Ok(false);
        }
        let settings = &self.settings;

        self.store
            .read_modify_write(&job.new_path, &|content| {
                let mut out = add_alias(content, &job.old_title);
                if job.title_to_store != job.new_title {
                    out = add_alias(&out, &job.title_to_store);
                }
                if settings.update_title_key {
                    out = set_title_key(&out, &job.title_to_store);
                }
                if settings.update_first_heading {
                    out = replace_first_heading(&out, &job.title_to_store);
                }
                out
            })
            .await?;
        Ok(true)
    }
}

/// Owns the job receiver; run it on its own task.
pub struct RenameWorker {
    engine: Arc<RenameEngine>,
    job_rx: mpsc::Receiver<QueuedJob>,
}

impl RenameWorker {
    pub async fn run(mut self) {
        tracing::info!("rename worker started");
        while let Some(QueuedJob { job, reply }) = self.job_rx.recv().await {
            tracing::info!(old_path = %job.old_path, new_title = %job.new_title, "rename started");
            let result = self.engine.process(&job).await;
            if let Err(e) = &result {
                tracing::info!(old_path = %job.old_path, "rename did not complete: {}", e);
            }
            if reply.send(result).is_err() {
                tracing::warn!(old_path = %job.old_path, "rename caller went away");
            }
        }
        tracing::info!("rename worker stopped");
    }
}
