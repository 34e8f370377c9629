//! Corpus-wide reference index.
//!
//! The index is eventually consistent: mutations are reported through
//! `on_document_update`, a background worker re-parses and re-resolves the
//! corpus, and readers see the previous build until the rebuild lands. Each
//! completed rebuild bumps a generation counter on a watch channel so a
//! caller can block until its own mutation is reflected.

use crate::docpath::{resolve_relative, title_of};
use crate::metadata::read_aliases;
use crate::reference::{parse_references, Reference};
use crate::store::DocumentStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub struct CorpusIndex {
    store: Arc<dyn DocumentStore>,
    /// Per-document outgoing references, resolved, ordered by start offset.
    references: DashMap<String, Vec<Reference>>,
    /// Resolved target path -> referencing document paths.
    backlinks: DashMap<String, Vec<String>>,
    /// Lowercased unresolved target text -> referencing document paths.
    unresolved: DashMap<String, Vec<String>>,
    /// Outstanding update notifications, keyed by document path.
    pending: DashMap<String, usize>,
    index_tx: mpsc::Sender<String>,
    generation: watch::Sender<u64>,
}

impl CorpusIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (index_tx, index_rx) = mpsc::channel(1024);
        let (generation, _) = watch::channel(0u64);
        (
            Arc::new(Self {
                store,
                references: DashMap::new(),
                backlinks: DashMap::new(),
                unresolved: DashMap::new(),
                pending: DashMap::new(),
                index_tx,
                generation,
            }),
            index_rx,
        )
    }

    /// Report a store mutation. The rebuild happens asynchronously on the
    /// worker; `subscribe()` + `is_idle()` let callers wait for it.
    pub async fn on_document_update(&self, path: &str) {
        *self.pending.entry(path.to_string()).or_insert(0) += 1;
        if let Err(e) = self.index_tx.send(path.to_string()).await {
            tracing::error!(
                "corpus index channel send failed (receiver dropped — worker dead?): {}",
                e
            );
        }
    }

    /// True when every reported mutation has been folded into the index.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Generation counter, bumped once per completed rebuild.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Outgoing references of a document, ordered by start offset.
    pub fn references_of(&self, path: &str) -> Vec<Reference> {
        self.references.get(path).map(|r| r.clone()).unwrap_or_default()
    }

    /// Documents holding a reference to `target_path`, by resolution or by
    /// unresolved target text equal to `target_title`. Sorted, deduplicated.
    pub fn referencing_documents(&self, target_path: &str, target_title: &str) -> Vec<String> {
        let mut sources: Vec<String> = self
            .backlinks
            .get(target_path)
            .map(|s| s.clone())
            .unwrap_or_default();
        if let Some(unresolved) = self.unresolved.get(&target_title.to_lowercase()) {
            sources.extend(unresolved.iter().cloned());
        }
        sources.sort();
        sources.dedup();
        sources
    }

    /// Scan the whole corpus once and bump the generation. Called at
    /// startup, before the worker takes over incremental updates.
    pub async fn rebuild_all(&self) -> anyhow::Result<()> {
        self.rebuild().await?;
        self.generation.send_modify(|g| *g += 1);
        Ok(())
    }

    /// Background worker that folds update notifications into the index.
    /// Notifications arriving while a rebuild is queued are coalesced into
    /// one pass; the generation is bumped only after pending bookkeeping is
    /// cleared, so an observed bump implies the reported mutations landed.
    pub async fn run_worker(self: Arc<Self>, mut rx: mpsc::Receiver<String>) {
        tracing::info!("corpus index worker started");
        while let Some(path) = rx.recv().await {
            let mut batch = vec![path];
            while let Ok(more) = rx.try_recv() {
                batch.push(more);
            }

            match self.rebuild().await {
                Ok(()) => tracing::debug!("corpus index rebuilt ({} notification(s))", batch.len()),
                Err(e) => tracing::error!("corpus index rebuild failed: {:?}", e),
            }

            for path in &batch {
                if let Entry::Occupied(mut e) = self.pending.entry(path.clone()) {
                    if *e.get() <= 1 {
                        e.remove();
                    } else {
                        *e.get_mut() -= 1;
                    }
                }
            }
            self.generation.send_modify(|g| *g += 1);
        }
        tracing::info!("corpus index worker stopped");
    }

    async fn rebuild(&self) -> anyhow::Result<()> {
        let mut paths = self.store.list().await?;
        paths.sort();

        // Pass 1: parse every document and collect resolution inputs.
        let mut parsed: HashMap<String, Vec<Reference>> = HashMap::new();
        let mut titles: HashMap<String, Vec<String>> = HashMap::new();
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for path in &paths {
            let content = match self.store.read(path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("skipping unreadable document {}: {}", path, e);
                    continue;
                }
            };
            titles
                .entry(title_of(path).to_lowercase())
                .or_default()
                .push(path.clone());
            for alias in read_aliases(&content) {
                aliases.entry(alias.to_lowercase()).or_default().push(path.clone());
            }
            parsed.insert(path.clone(), parse_references(&content));
        }

        // Pass 2: resolve targets and collect backlink maps.
        let resolver = Resolver {
            paths: &paths,
            titles: &titles,
            aliases: &aliases,
        };
        let mut backlinks: HashMap<String, Vec<String>> = HashMap::new();
        let mut unresolved: HashMap<String, Vec<String>> = HashMap::new();
        for (path, refs) in parsed.iter_mut() {
            for r in refs.iter_mut() {
                r.resolved = resolver.resolve(&r.target, path);
                match &r.resolved {
                    Some(target) => backlinks.entry(target.clone()).or_default().push(path.clone()),
                    None => unresolved
                        .entry(title_of(&r.target).to_lowercase())
                        .or_default()
                        .push(path.clone()),
                }
            }
        }
        for sources in backlinks.values_mut().chain(unresolved.values_mut()) {
            sources.sort();
            sources.dedup();
        }

        // Pass 3: publish. Readers are gated on the generation bump that
        // follows, so the brief window between clear and refill is not
        // observable through the engine.
        self.references.clear();
        for (path, refs) in parsed {
            self.references.insert(path, refs);
        }
        self.backlinks.clear();
        for (target, sources) in backlinks {
            self.backlinks.insert(target, sources);
        }
        self.unresolved.clear();
        for (name, sources) in unresolved {
            self.unresolved.insert(name, sources);
        }

        Ok(())
    }
}

/// Target resolution over one consistent corpus snapshot.
///
/// Priority, mirroring how readers disambiguate: relative path from the
/// source document, then corpus-wide path, then title, then frontmatter
/// alias. All comparisons case-insensitive; ties go to the
/// lexicographically smallest path.
struct Resolver<'a> {
    paths: &'a [String],
    titles: &'a HashMap<String, Vec<String>>,
    aliases: &'a HashMap<String, Vec<String>>,
}

impl Resolver<'_> {
    fn resolve(&self, target: &str, source_path: &str) -> Option<String> {
        let trimmed = target.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return None;
        }

        if target.starts_with("./") || target.starts_with("../") {
            let resolved = resolve_relative(source_path, target);
            if let Some(path) = self.match_path(&resolved) {
                return Some(path);
            }
        }

        if let Some(path) = self.match_path(trimmed) {
            return Some(path);
        }

        if !trimmed.contains('/') {
            let key = title_of(trimmed).to_lowercase();
            if let Some(candidates) = self.titles.get(&key) {
                if let Some(path) = candidates.iter().min() {
                    return Some(path.clone());
                }
            }
            if let Some(candidates) = self.aliases.get(&trimmed.to_lowercase()) {
                if let Some(path) = candidates.iter().min() {
                    return Some(path.clone());
                }
            }
        }

        None
    }

    /// Case-insensitive path match, with and without an implied `.md`
    /// extension, including a suffix match for path-qualified targets.
    fn match_path(&self, candidate: &str) -> Option<String> {
        let lower = candidate.to_lowercase();
        let with_md = format!("{lower}.md");
        let suffix = format!("/{lower}");
        let suffix_md = format!("/{with_md}");
        self.paths
            .iter()
            .find(|p| {
                let pl = p.to_lowercase();
                pl == lower || pl == with_md || pl.ends_with(&suffix) || pl.ends_with(&suffix_md)
            })
            .cloned()
    }
}
