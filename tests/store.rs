use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use webmention_fetch::domain::{Mention, Slug};
use webmention_fetch::error::WebmentionError;
use webmention_fetch::store::{CollectionStore, JsonFileStore};

fn store_in(temp: &tempfile::TempDir) -> JsonFileStore {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("webmentions")).unwrap();
    JsonFileStore::new(root)
}

fn mention(id: u64) -> Mention {
    Mention {
        id,
        kind: "entry".to_string(),
        source: format!("https://sender{id}.example"),
        target: "https://example.com/posts/hello".to_string(),
        ..Default::default()
    }
}

#[test]
fn missing_collection_loads_empty() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let slug = Slug::from_target("https://example.com/posts/hello").unwrap();

    assert!(store.load(&slug).unwrap().is_empty());
}

#[test]
fn save_then_load() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let slug = Slug::from_target("https://example.com/posts/hello").unwrap();
    let mentions = vec![mention(3), mention(2)];

    store.save(&slug, &mentions).unwrap();

    let path = store.path_for(&slug);
    assert!(path.ends_with("webmentions/posts--hello.json"));
    let raw = fs::read_to_string(path.as_std_path()).unwrap();
    assert!(raw.starts_with("[\n  {\n    \"type\": \"entry\""));
    assert!(!path.with_extension("json.tmp").as_std_path().exists());

    assert_eq!(store.load(&slug).unwrap(), mentions);
}

#[test]
fn corrupt_collection_is_a_decode_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let slug = Slug::from_target("https://example.com/posts/hello").unwrap();
    let path = store.path_for(&slug);
    fs::create_dir_all(store.root().as_std_path()).unwrap();
    fs::write(path.as_std_path(), b"{ not json").unwrap();

    assert_matches!(store.load(&slug), Err(WebmentionError::Decode(_)));
}

#[test]
fn unreadable_collection_is_a_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let slug = Slug::from_target("https://example.com/posts/hello").unwrap();
    // a directory where the file should be
    fs::create_dir_all(store.path_for(&slug).as_std_path()).unwrap();

    assert_matches!(store.load(&slug), Err(WebmentionError::StorageRead { .. }));
}

#[test]
fn nested_unknown_fields_survive_rewrite() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(&temp);
    let slug = Slug::from_target("https://example.com/posts/hello").unwrap();
    fs::create_dir_all(store.root().as_std_path()).unwrap();
    fs::write(
        store.path_for(&slug).as_std_path(),
        r#"[
  {
    "type": "entry",
    "wm-id": 1,
    "wm-target": "https://example.com/posts/hello",
    "author": { "type": "card", "name": "A", "note": "x" },
    "content": { "content-type": "text/html", "value": "hi", "html": "<p>hi</p>", "text": "hi" }
  }
]"#,
    )
    .unwrap();

    let loaded = store.load(&slug).unwrap();
    store.save(&slug, &loaded).unwrap();

    let raw = fs::read_to_string(store.path_for(&slug).as_std_path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["content"]["content-type"], "text/html");
    assert_eq!(value[0]["content"]["value"], "hi");
    assert_eq!(value[0]["content"]["html"], "<p>hi</p>");
    assert_eq!(value[0]["author"]["note"], "x");
    assert_eq!(store.load(&slug).unwrap(), loaded);
}

#[test]
fn failed_rename_leaves_no_temp_file() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    // a non-empty directory at the target path makes the rename fail
    let path = root.join("blocked.json");
    fs::create_dir_all(path.join("inner").as_std_path()).unwrap();

    let err = JsonFileStore::write_bytes_atomic(&path, b"[]").unwrap_err();

    assert_matches!(err, WebmentionError::StorageWrite { .. });
    assert!(!path.with_extension("json.tmp").as_std_path().exists());
}
