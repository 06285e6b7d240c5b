use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use pulse_api::{Message, StageError};
use pulse_engine::PulseConfig;

use crate::config::ImportArgs;
use crate::error::ReplayError;

/// Messages written per append.
const BATCH: usize = 1000;

pub async fn run(args: ImportArgs) -> Result<(), ReplayError> {
    let config = PulseConfig::load(&args.config)?;
    let store = config
        .stores
        .iter()
        .find(|s| s.name == args.store)
        .ok_or_else(|| ReplayError::Config {
            context: "import",
            detail: format!("store '{}' is not defined in {}", args.store, args.config),
        })?;
    if store.kind != "file" {
        return Err(ReplayError::Config {
            context: "import",
            detail: format!(
                "store '{}' has kind '{}', only 'file' stores accept imports",
                store.name, store.kind
            ),
        });
    }
    let repository = pulse_storage_file::open(store.config.as_ref())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut batch: Vec<Message> = Vec::with_capacity(BATCH);
    let mut imported = 0usize;
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(line)
            .map_err(|e| StageError::format(format!("stdin:{line_no}: {e}")))?;
        batch.push(message);
        if batch.len() >= BATCH {
            imported += repository.append(&batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        imported += repository.append(&batch)?;
    }

    info!(
        store = %store.name,
        path = %repository.path().display(),
        imported,
        "import finished"
    );
    Ok(())
}
