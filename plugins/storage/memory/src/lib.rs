use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::stream;

use pulse_api::repository::config_or_default;
use pulse_api::{Bounds, Message, MessageRepository, MessageStream, RepositoryFactory, StageError};

// ═══════════════════════════════════════════════════════════════
//  MemoryRepositoryConfig
// ═══════════════════════════════════════════════════════════════

fn default_max_messages() -> usize {
    100_000
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryRepositoryConfig {
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for MemoryRepositoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryRepository
// ═══════════════════════════════════════════════════════════════

struct Buffer {
    messages: VecDeque<Message>,
    /// Messages pushed out of the front so far. Cursors hold absolute
    /// positions, so eviction never makes them skip or repeat.
    evicted: u64,
}

/// In-memory ring buffer of messages, oldest first.
///
/// Reads walk a cursor one message at a time under a short read lock;
/// nothing is copied up front.
#[derive(Clone)]
pub struct MemoryRepository {
    buffer: Arc<RwLock<Buffer>>,
    max_messages: usize,
}

impl MemoryRepository {
    pub fn new(max_messages: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(Buffer {
                messages: VecDeque::with_capacity(max_messages.min(65536)),
                evicted: 0,
            })),
            max_messages: max_messages.max(1),
        }
    }

    pub fn save(&self, message: Message) {
        self.save_all([message]);
    }

    pub fn save_all(&self, messages: impl IntoIterator<Item = Message>) {
        let mut buf = write(&self.buffer);
        for message in messages {
            if buf.messages.len() >= self.max_messages {
                buf.messages.pop_front();
                buf.evicted += 1;
            }
            buf.messages.push_back(message);
        }
    }

    pub fn len(&self) -> usize {
        read(&self.buffer).messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(default_max_messages())
    }
}

impl MessageRepository for MemoryRepository {
    fn find(&self, bounds: &Bounds) -> MessageStream {
        Box::pin(stream::iter(Cursor {
            buffer: self.buffer.clone(),
            bounds: bounds.clone(),
            position: 0,
        }))
    }
}

/// Absolute-position cursor over the ring buffer.
struct Cursor {
    buffer: Arc<RwLock<Buffer>>,
    bounds: Bounds,
    position: u64,
}

impl Iterator for Cursor {
    type Item = Result<Message, StageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let buf = read(&self.buffer);
        // Anything before `evicted` is gone; resume at the oldest survivor.
        self.position = self.position.max(buf.evicted);
        loop {
            let index = (self.position - buf.evicted) as usize;
            let message = buf.messages.get(index)?;
            self.position += 1;
            if self.bounds.matches(message) {
                return Some(Ok(message.clone()));
            }
        }
    }
}

fn read(lock: &RwLock<Buffer>) -> RwLockReadGuard<'_, Buffer> {
    match lock.read() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("memory repository read lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn write(lock: &RwLock<Buffer>) -> RwLockWriteGuard<'_, Buffer> {
    match lock.write() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("memory repository write lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryRepositoryFactory
// ═══════════════════════════════════════════════════════════════

pub struct MemoryRepositoryFactory;

impl RepositoryFactory for MemoryRepositoryFactory {
    fn kind(&self) -> &str {
        "memory"
    }

    fn create(
        &self,
        config: Option<&toml::Value>,
    ) -> Result<Arc<dyn MessageRepository>, StageError> {
        let config: MemoryRepositoryConfig = config_or_default(config)?;
        Ok(Arc::new(MemoryRepository::new(config.max_messages)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use futures_util::StreamExt;

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn seeded() -> MemoryRepository {
        let repo = MemoryRepository::new(16);
        repo.save_all([
            Message::new("1", ts(10)).with_language("en"),
            Message::new("2", ts(20)).with_language("it"),
            Message::new("3", ts(30)).with_language("en"),
        ]);
        repo
    }

    async fn ids(repo: &MemoryRepository, bounds: &Bounds) -> Vec<String> {
        repo.find(bounds)
            .map(|r| r.unwrap().id)
            .collect()
            .await
    }

    #[tokio::test]
    async fn filters_by_range_and_language() {
        let bounds = Bounds::new(Some(ts(15)), Some(ts(30)), ["en"]).unwrap();
        assert_eq!(ids(&seeded(), &bounds).await, vec!["3"]);
    }

    #[tokio::test]
    async fn unbounded_read_returns_everything_in_order() {
        assert_eq!(ids(&seeded(), &Bounds::all()).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn ring_buffer_evicts_oldest() {
        let repo = MemoryRepository::new(2);
        for i in 0..5 {
            repo.save(Message::new(i.to_string(), ts(i)));
        }
        assert_eq!(repo.len(), 2);
        assert_eq!(ids(&repo, &Bounds::all()).await, vec!["3", "4"]);
    }

    #[tokio::test]
    async fn cursor_survives_eviction_mid_read() {
        let repo = MemoryRepository::new(3);
        repo.save_all((0..3).map(|i| Message::new(i.to_string(), ts(i))));

        let mut stream = repo.find(&Bounds::all());
        assert_eq!(stream.next().await.unwrap().unwrap().id, "0");

        // Evicts "0" and "1"; the cursor resumes at the oldest survivor.
        repo.save_all((3..5).map(|i| Message::new(i.to_string(), ts(i))));
        let rest: Vec<String> = stream.map(|r| r.unwrap().id).collect().await;
        assert_eq!(rest, vec!["2", "3", "4"]);
    }

    #[test]
    fn factory_reads_capacity() {
        let config: toml::Value = toml::from_str("max_messages = 7").unwrap();
        assert!(MemoryRepositoryFactory.create(Some(&config)).is_ok());

        let bad: toml::Value = toml::from_str("max_message = 7").unwrap();
        let err = MemoryRepositoryFactory.create(Some(&bad)).err().unwrap();
        assert!(err.is_config());
    }
}
