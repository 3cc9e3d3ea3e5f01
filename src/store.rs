use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Mention, Slug};
use crate::error::WebmentionError;

/// Storage for per-slug mention collections.
pub trait CollectionStore: Send + Sync {
    /// Location of the collection, used for logging and reporting.
    fn path_for(&self, slug: &Slug) -> Utf8PathBuf;

    /// Returns the stored collection, or an empty one if nothing was stored yet.
    fn load(&self, slug: &Slug) -> Result<Vec<Mention>, WebmentionError>;

    /// Replaces the stored collection.
    fn save(&self, slug: &Slug, mentions: &[Mention]) -> Result<(), WebmentionError>;
}

/// Collections kept as pretty-printed JSON arrays at `<root>/<slug>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: Utf8PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), WebmentionError> {
        let write_err = |err: io::Error| WebmentionError::StorageWrite {
            path: path.to_string(),
            message: err.to_string(),
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path()).map_err(write_err)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(tmp_path.as_std_path(), content).map_err(write_err)?;
        if let Err(err) = fs::rename(tmp_path.as_std_path(), path.as_std_path()) {
            let _ = fs::remove_file(tmp_path.as_std_path());
            return Err(write_err(err));
        }
        Ok(())
    }
}

impl CollectionStore for JsonFileStore {
    fn path_for(&self, slug: &Slug) -> Utf8PathBuf {
        self.root.join(format!("{slug}.json"))
    }

    fn load(&self, slug: &Slug) -> Result<Vec<Mention>, WebmentionError> {
        let path = self.path_for(slug);
        let content = match fs::read(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(WebmentionError::StorageRead {
                    path: path.to_string(),
                    message: err.to_string(),
                });
            }
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&content)
            .map_err(|err| WebmentionError::Decode(format!("{path}: {err}")))
    }

    fn save(&self, slug: &Slug, mentions: &[Mention]) -> Result<(), WebmentionError> {
        let path = self.path_for(slug);
        let content = serde_json::to_vec_pretty(mentions)
            .map_err(|err| WebmentionError::Serialize(err.to_string()))?;
        Self::write_bytes_atomic(&path, &content)
    }
}

/// Inserts `mention` into a collection sorted by id descending.
///
/// Returns the position of the new entry, or `None` and leaves the collection
/// untouched if the id is already present.
pub fn insert_mention(collection: &mut Vec<Mention>, mention: Mention) -> Option<usize> {
    match collection.binary_search_by(|existing| mention.id.cmp(&existing.id)) {
        Ok(_) => None,
        Err(index) => {
            collection.insert(index, mention);
            Some(index)
        }
    }
}

/// Restores the descending-id order and drops repeated ids, keeping the first
/// occurrence. Collections written by older tools are not trusted to be sorted.
pub fn normalize(collection: &mut Vec<Mention>) {
    collection.sort_by(|a, b| b.id.cmp(&a.id));
    collection.dedup_by_key(|mention| mention.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(id: u64) -> Mention {
        Mention {
            id,
            ..Default::default()
        }
    }

    fn ids(collection: &[Mention]) -> Vec<u64> {
        collection.iter().map(|m| m.id).collect()
    }

    #[test]
    fn insert_keeps_descending_order() {
        let mut collection = Vec::new();
        for id in [5, 1, 9, 3] {
            assert!(insert_mention(&mut collection, mention(id)).is_some());
        }
        assert_eq!(ids(&collection), vec![9, 5, 3, 1]);
        assert_eq!(insert_mention(&mut collection, mention(4)), Some(2));
    }

    #[test]
    fn insert_skips_known_id() {
        let mut collection = vec![mention(4), mention(2)];
        assert_eq!(insert_mention(&mut collection, mention(2)), None);
        assert_eq!(ids(&collection), vec![4, 2]);
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let mut collection = vec![mention(1), mention(8), mention(1), mention(3)];
        normalize(&mut collection);
        assert_eq!(ids(&collection), vec![8, 3, 1]);
    }

    #[test]
    fn path_uses_slug_stem() {
        let store = JsonFileStore::new("data/webmentions");
        let slug = Slug::from_target("https://example.com/blog/post/").unwrap();
        assert_eq!(store.path_for(&slug).as_str(), "data/webmentions/blog--post.json");
    }
}
