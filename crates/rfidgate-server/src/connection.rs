use std::io::ErrorKind;

use rfidgate_frame::{Reassembler, ReassemblerStats};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::store::AggregationStore;

/// Drive one reader connection until it closes or `shutdown` fires.
///
/// Every decoded frame goes to `store` in stream order. On exit the store is
/// closed, which publishes any burst still waiting for its timer. Peer resets
/// count as a normal close; other read errors are returned after the flush.
pub async fn handle_connection<S>(
    mut stream: S,
    store: AggregationStore,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<ReassemblerStats>
where
    S: AsyncRead + Unpin,
{
    let mut reassembler = Reassembler::with_max_frame_size(config.max_frame_size);
    let mut chunk = vec![0u8; config.read_chunk_size()];

    let result = loop {
        let read = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            read = stream.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => break Ok(()),
            Ok(n) => reassembler.ingest(&chunk[..n], |frame| {
                tracing::trace!(device = %frame.device, tags = frame.tags.len(), "frame decoded");
                store.add(frame.device, frame.tags);
            }),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_disconnect(err.kind()) => {
                tracing::debug!(error = %err, "peer reset connection");
                break Ok(());
            }
            Err(err) => break Err(err),
        }
    };

    store.close();
    reassembler.reset();

    let stats = reassembler.stats();
    tracing::debug!(
        frames = stats.frames,
        checksum_failures = stats.checksum_failures,
        decode_failures = stats.decode_failures,
        oversize_skips = stats.oversize_skips,
        discarded_bytes = stats.discarded_bytes,
        "connection closed"
    );

    result.map(|()| stats).map_err(Into::into)
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
    )
}
