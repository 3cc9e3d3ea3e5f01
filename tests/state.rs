use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use webmention_fetch::error::WebmentionError;
use webmention_fetch::state::FetchState;

fn state_path(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().join("fetch.webmentions.state")).unwrap()
}

#[test]
fn missing_state_file_starts_at_zero() {
    let temp = tempfile::tempdir().unwrap();
    let state = FetchState::read(&state_path(&temp)).unwrap();
    assert_eq!(state, FetchState::default());
}

#[test]
fn write_then_read() {
    let temp = tempfile::tempdir().unwrap();
    let path = state_path(&temp);

    FetchState { since_id: 1789013 }.write(&path).unwrap();

    let raw = fs::read_to_string(path.as_std_path()).unwrap();
    assert!(raw.contains("\"sinceID\": 1789013"));
    assert_eq!(FetchState::read(&path).unwrap().since_id, 1789013);
}

#[test]
fn malformed_state_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = state_path(&temp);
    fs::write(path.as_std_path(), "sinceID=3").unwrap();

    assert_matches!(FetchState::read(&path), Err(WebmentionError::StateParse(_)));
}
