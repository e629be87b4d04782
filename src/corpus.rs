//! Corpus and keyword-entity file loading.

use std::path::Path;

use crate::error::EngineError;
use crate::topics::{self, Topic};

/// Read a line-oriented corpus. Every line, blank ones included, is one
/// document; trailing `\r` is stripped.
pub async fn load_corpus(path: &Path) -> Result<Vec<String>, EngineError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::CorpusLoad {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Read and parse a keyword-entity file.
pub async fn load_entities(path: &Path) -> Result<Vec<Topic>, EngineError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::CorpusLoad {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(topics::parse_entities(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_corpus_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corpus.md");
        std::fs::write(&path, "first line\r\n\nthird line\n").unwrap();

        let corpus = load_corpus(&path).await.unwrap();
        assert_eq!(corpus, vec!["first line", "", "third line"]);
    }

    #[tokio::test]
    async fn test_load_corpus_missing() {
        let tmp = TempDir::new().unwrap();
        let err = load_corpus(&tmp.path().join("nope.md")).await.unwrap_err();
        assert!(matches!(err, EngineError::CorpusLoad { .. }));
        assert!(err.to_string().contains("nope.md"));
    }

    #[tokio::test]
    async fn test_load_entities() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("entities.txt");
        std::fs::write(&path, "Control Flow Keywords\nfor - loop\n").unwrap();

        let entities = load_entities(&path).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "for");
    }
}
