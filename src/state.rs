use std::fs;
use std::io;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::WebmentionError;
use crate::store::JsonFileStore;

/// Checkpoint carried between runs: the highest mention id already fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchState {
    #[serde(rename = "sinceID", default)]
    pub since_id: u64,
}

impl FetchState {
    /// A missing file yields a fresh state; it is created on the next write.
    pub fn read(path: &Utf8Path) -> Result<Self, WebmentionError> {
        let content = match fs::read_to_string(path.as_std_path()) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(%path, "initializing new state");
                return Ok(Self::default());
            }
            Err(_) => return Err(WebmentionError::StateRead(path.as_std_path().to_path_buf())),
        };
        serde_json::from_str(&content).map_err(|err| WebmentionError::StateParse(err.to_string()))
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), WebmentionError> {
        let content = serde_json::to_vec_pretty(self)
            .map_err(|err| WebmentionError::StateWrite(err.to_string()))?;
        JsonFileStore::write_bytes_atomic(path, &content)
            .map_err(|err| WebmentionError::StateWrite(err.to_string()))
    }

    /// Moves the watermark forward to `max_id`; it never goes backwards.
    pub fn advance(&mut self, max_id: u64) -> bool {
        if max_id > self.since_id {
            self.since_id = max_id;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_since_id() {
        let state: FetchState = serde_json::from_str(r#"{"sinceID": 1234}"#).unwrap();
        assert_eq!(state.since_id, 1234);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut state = FetchState { since_id: 10 };
        assert!(!state.advance(4));
        assert_eq!(state.since_id, 10);
        assert!(state.advance(12));
        assert_eq!(state.since_id, 12);
    }
}
