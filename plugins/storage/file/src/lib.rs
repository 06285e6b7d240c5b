mod config;
mod repository;

use std::sync::Arc;

use pulse_api::{MessageRepository, RepositoryFactory, StageError};

use config::FileRepositoryConfig;
pub use config::OnMalformed;
pub use repository::FileRepository;

// ════════════════════════════════════════════════════════════════
//  Factory
// ════════════════════════════════════════════════════════════════

pub struct FileRepositoryFactory;

impl RepositoryFactory for FileRepositoryFactory {
    fn kind(&self) -> &str {
        "file"
    }

    fn create(
        &self,
        config: Option<&toml::Value>,
    ) -> Result<Arc<dyn MessageRepository>, StageError> {
        Ok(Arc::new(open(config)?))
    }
}

/// Build a [`FileRepository`] from its `[[stores]]` config table.
pub fn open(config: Option<&toml::Value>) -> Result<FileRepository, StageError> {
    let config = config.ok_or_else(|| StageError::config("file store requires `path`"))?;
    let cfg: FileRepositoryConfig = config.clone().try_into()?;
    if cfg.path.trim().is_empty() {
        return Err(StageError::config("file store `path` must not be empty"));
    }
    Ok(FileRepository::new(cfg.path).with_on_malformed(cfg.on_malformed))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use futures_util::StreamExt;

    use pulse_api::{Bounds, ErrorKind, Message};

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample() -> Vec<Message> {
        vec![
            Message::new("1", ts(10)).with_language("en"),
            Message::new("2", ts(20)).with_language("it"),
            Message::new("3", ts(30)).with_language("en"),
        ]
    }

    async fn ids(repo: &FileRepository, bounds: &Bounds) -> Vec<String> {
        repo.find(bounds)
            .map(|r| r.unwrap().id)
            .collect()
            .await
    }

    #[tokio::test]
    async fn append_then_find_filters() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("nested/messages.jsonl"));
        assert_eq!(repo.append(&sample()).unwrap(), 3);

        let bounds = Bounds::new(Some(ts(15)), Some(ts(30)), ["en"]).unwrap();
        assert_eq!(ids(&repo, &bounds).await, vec!["3"]);
        assert_eq!(ids(&repo, &Bounds::all()).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path().join("never-written.jsonl"));
        assert!(ids(&repo, &Bounds::all()).await.is_empty());
    }

    #[tokio::test]
    async fn find_does_not_touch_the_file_before_polling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let repo = FileRepository::new(&path);

        // Opened lazily: data appended after `find` is still seen.
        let stream = repo.find(&Bounds::all());
        repo.append(&sample()).unwrap();
        let got: Vec<_> = stream.collect().await;
        assert_eq!(got.len(), 3);
    }

    #[tokio::test]
    async fn malformed_line_fails_or_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"1\",\"date\":\"1970-01-01T00:00:10Z\"}\nnot json\n\n{\"id\":\"2\",\"date\":\"1970-01-01T00:00:20Z\"}\n",
        )
        .unwrap();

        let strict = FileRepository::new(&path);
        let got: Vec<_> = strict.find(&Bounds::all()).collect().await;
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].as_ref().unwrap().id, "1");
        let err = got[1].as_ref().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
        assert!(err.message.contains(":2:"));

        let lenient = FileRepository::new(&path).with_on_malformed(OnMalformed::Skip);
        assert_eq!(ids(&lenient, &Bounds::all()).await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn non_utf8_line_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let mut bytes = b"{\"id\":\"1\",\"date\":\"1970-01-01T00:00:10Z\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        bytes.extend_from_slice(b"{\"id\":\"2\",\"date\":\"1970-01-01T00:00:20Z\"}\n");
        std::fs::write(&path, bytes).unwrap();

        let strict = FileRepository::new(&path);
        let got: Vec<_> = strict.find(&Bounds::all()).collect().await;
        assert_eq!(got.len(), 2);
        let err = got[1].as_ref().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Format);
        assert!(err.message.contains(":2:"));

        let lenient = FileRepository::new(&path).with_on_malformed(OnMalformed::Skip);
        assert_eq!(ids(&lenient, &Bounds::all()).await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn dropping_a_partial_read_releases_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let repo = FileRepository::new(&path);
        repo.append(&sample()).unwrap();

        let mut stream = repo.find(&Bounds::all());
        assert_eq!(stream.next().await.unwrap().unwrap().id, "1");
        drop(stream);

        // Re-opened from the start by a fresh read.
        assert_eq!(ids(&repo, &Bounds::all()).await, vec!["1", "2", "3"]);

        std::fs::remove_file(&path).unwrap();
        assert!(ids(&repo, &Bounds::all()).await.is_empty());
        dir.close().unwrap();
    }

    #[test]
    fn factory_requires_path() {
        let err = FileRepositoryFactory.create(None).err().unwrap();
        assert!(err.is_config());

        let config: toml::Value = toml::from_str("path = \"data/m.jsonl\"").unwrap();
        assert!(FileRepositoryFactory.create(Some(&config)).is_ok());

        let config: toml::Value =
            toml::from_str("path = \"data/m.jsonl\"\non_malformed = \"skip\"").unwrap();
        let repo = open(Some(&config)).unwrap();
        assert_eq!(repo.path(), std::path::Path::new("data/m.jsonl"));

        let config: toml::Value = toml::from_str("path = \" \"").unwrap();
        assert!(open(Some(&config)).unwrap_err().is_config());
    }
}
