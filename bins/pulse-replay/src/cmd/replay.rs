use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::info;

use pulse_api::{Message, StageError};
use pulse_engine::{Engine, Outcome, PulseConfig, lines_source, spawn_pipeline};

use crate::config::ReplayArgs;
use crate::error::ReplayError;
use crate::plugins;

pub async fn run(args: ReplayArgs) -> Result<(), ReplayError> {
    let config = PulseConfig::load(&args.config)?;
    let buffer = config.buffer;
    let engine = Engine::bootstrap(config, &plugins::builtin())?;
    info!(
        config = %args.config,
        stores = ?engine.stores().store_names(),
        stages = engine.config().stages.len(),
        "engine ready, reading events from stdin"
    );

    let input = lines_source(BufReader::new(tokio::io::stdin()));
    let token = CancellationToken::new();
    let (mut rx, handle) = spawn_pipeline(engine.process(input), buffer, token.clone());
    let mut out = BufWriter::new(tokio::io::stdout());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(message) => {
                    if let Err(e) = write_line(&mut out, &message).await {
                        token.cancel();
                        return Err(e);
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                info!("interrupt received, cancelling pipeline");
                token.cancel();
            }
        }
    }
    out.flush().await?;

    let outcome = handle.await??;
    info!(
        delivered = outcome.delivered(),
        cancelled = matches!(outcome, Outcome::Cancelled { .. }),
        "replay finished"
    );
    Ok(())
}

async fn write_line<W>(out: &mut W, message: &Message) -> Result<(), ReplayError>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(message).map_err(StageError::from)?;
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await?;
    Ok(())
}
