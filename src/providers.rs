//! Collaborator interfaces the core consumes, plus in-memory reference
//! implementations so the engine is usable and testable without an
//! external indexing pipeline.
//!
//! Directory walking, tokenization, and annotation parsing all live
//! upstream; the core only ever sees these three seams.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::cache::memory_pool::SlabPool;
use crate::types::{FileId, PostingList, SymbolId};

/// Maps a file id to its content. Must be deterministic within a search.
pub trait ContentProvider: Send + Sync {
    fn get(&self, file_id: FileId) -> Option<Arc<[u8]>>;
}

/// Maps a literal to the ascending list of files that may contain it.
pub trait TrigramIndex: Send + Sync {
    /// Literals shorter than three bytes yield an empty list.
    fn find_candidates(&self, literal: &str) -> PostingList;
}

/// Optional annotation lookups consumed by the semantic scorer and the
/// annotation query builder.
pub trait AnnotationIndex: Send + Sync {
    fn symbols_by_label(&self, label: &str) -> Vec<SymbolId>;
    fn symbols_by_category(&self, category: &str) -> Vec<SymbolId>;
    fn symbols_by_tag(&self, key: &str, value: &str) -> Vec<SymbolId>;
    fn symbols_depending_on(&self, kind: &str, name: &str) -> Vec<SymbolId>;
    /// Label keys with the number of symbols carrying each.
    fn label_stats(&self) -> Vec<(String, usize)>;
    /// Category keys with the number of symbols in each.
    fn category_stats(&self) -> Vec<(String, usize)>;
}

/// Memory-resident content store.
#[derive(Default)]
pub struct InMemoryContentStore {
    files: RwLock<HashMap<FileId, Arc<[u8]>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_id: FileId, content: impl Into<Vec<u8>>) {
        let content: Arc<[u8]> = content.into().into();
        self.write_files().insert(file_id, content);
    }

    pub fn remove(&self, file_id: FileId) -> bool {
        self.write_files().remove(&file_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_files().is_empty()
    }

    /// All known file ids, ascending.
    pub fn file_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.read_files().keys().copied().collect();
        ids.sort();
        ids
    }

    fn read_files(&self) -> std::sync::RwLockReadGuard<'_, HashMap<FileId, Arc<[u8]>>> {
        self.files.read().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in InMemoryContentStore");
            poisoned.into_inner()
        })
    }

    fn write_files(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<FileId, Arc<[u8]>>> {
        self.files.write().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in InMemoryContentStore");
            poisoned.into_inner()
        })
    }
}

impl ContentProvider for InMemoryContentStore {
    fn get(&self, file_id: FileId) -> Option<Arc<[u8]>> {
        self.read_files().get(&file_id).cloned()
    }
}

/// In-memory trigram posting index over 3-byte sliding windows.
///
/// Posting buffers come from the trigram-tuned slab profile; lookups
/// intersect the posting lists of every window of the literal.
pub struct InMemoryTrigramIndex {
    postings: RwLock<HashMap<[u8; 3], PostingList>>,
    pool: Arc<SlabPool<FileId>>,
}

impl InMemoryTrigramIndex {
    pub fn new() -> Self {
        Self {
            postings: RwLock::new(HashMap::new()),
            pool: Arc::new(SlabPool::for_trigram_postings()),
        }
    }

    pub fn with_pool(pool: Arc<SlabPool<FileId>>) -> Self {
        Self {
            postings: RwLock::new(HashMap::new()),
            pool,
        }
    }

    /// Index every distinct 3-byte window of `content` under `file_id`.
    pub fn insert_file(&self, file_id: FileId, content: &[u8]) {
        if content.len() < 3 {
            return;
        }
        let mut distinct: HashSet<[u8; 3]> = HashSet::new();
        for window in content.windows(3) {
            distinct.insert([window[0], window[1], window[2]]);
        }

        let mut postings = self.write_postings();
        for trigram in distinct {
            let list = postings
                .entry(trigram)
                .or_insert_with(|| self.pool.get(8));
            match list.binary_search(&file_id) {
                Ok(_) => {}
                Err(pos) => list.insert(pos, file_id),
            }
        }
    }

    /// Number of distinct trigrams indexed.
    pub fn trigram_count(&self) -> usize {
        self.read_postings().len()
    }

    pub fn pool_stats(&self) -> crate::cache::memory_pool::SlabStatsSnapshot {
        self.pool.stats()
    }

    fn read_postings(&self) -> std::sync::RwLockReadGuard<'_, HashMap<[u8; 3], PostingList>> {
        self.postings.read().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in InMemoryTrigramIndex");
            poisoned.into_inner()
        })
    }

    fn write_postings(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<[u8; 3], PostingList>> {
        self.postings.write().unwrap_or_else(|poisoned| {
            tracing::warn!("RwLock poisoned in InMemoryTrigramIndex");
            poisoned.into_inner()
        })
    }
}

impl Default for InMemoryTrigramIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TrigramIndex for InMemoryTrigramIndex {
    fn find_candidates(&self, literal: &str) -> PostingList {
        let bytes = literal.as_bytes();
        if bytes.len() < 3 {
            return Vec::new();
        }

        let postings = self.read_postings();
        let mut result: Option<PostingList> = None;
        let mut seen: HashSet<[u8; 3]> = HashSet::new();
        for window in bytes.windows(3) {
            let trigram = [window[0], window[1], window[2]];
            if !seen.insert(trigram) {
                continue;
            }
            let list = match postings.get(&trigram) {
                Some(list) => list,
                None => return Vec::new(),
            };
            result = Some(match result {
                None => list.clone(),
                Some(current) => {
                    let mut narrowed = self.pool.get(current.len().min(list.len()));
                    intersect_sorted(&current, list, &mut narrowed);
                    self.pool.put(current);
                    narrowed
                }
            });
            if matches!(&result, Some(r) if r.is_empty()) {
                break;
            }
        }
        result.unwrap_or_default()
    }
}

/// Intersection of two ascending id lists into `out`.
fn intersect_sorted(a: &[FileId], b: &[FileId], out: &mut PostingList) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
}
