use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::sink::SinkExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use audio_core::context::DEFAULT_BLOCK_FRAMES;

use crate::AppState;

/// Sample offset of the next chunk sent to one listener. Skipped blocks
/// still count, so timestamps stay on the render clock.
#[derive(Debug)]
struct StreamPosition {
    offset: u64,
    block_len: u64,
}

impl Default for StreamPosition {
    fn default() -> Self {
        Self {
            offset: 0,
            block_len: DEFAULT_BLOCK_FRAMES as u64,
        }
    }
}

impl StreamPosition {
    /// Offset of a received block of `len` samples.
    fn advance(&mut self, len: usize) -> u64 {
        let at = self.offset;
        self.block_len = len as u64;
        self.offset += self.block_len;
        at
    }

    fn skip(&mut self, blocks: u64) {
        self.offset += blocks * self.block_len;
    }
}

/// Live ambience over a WebSocket: a `metadata` message, then one `chunk`
/// message per rendered block for as long as the client stays connected.
/// Blocks only flow while the ambience is playing.
pub async fn ambient_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_blocks(socket, state))
}

async fn stream_blocks(mut socket: WebSocket, state: AppState) {
    let mut blocks = state.ambient.subscribe();
    let sample_rate = state.ambient.sample_rate();

    let metadata = serde_json::json!({
        "type": "metadata",
        "sample_rate": sample_rate,
        "channels": 1,
        "state": state.ambient.state(),
    });
    if socket
        .send(Message::Text(metadata.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    let mut position = StreamPosition::default();
    loop {
        tokio::select! {
            block = blocks.recv() => match block {
                Ok(block) => {
                    let offset = position.advance(block.len());
                    let msg = serde_json::json!({
                        "type": "chunk",
                        "audio": &block[..],
                        "offset": offset,
                        "timestamp": offset as f64 / sample_rate as f64,
                    });
                    if let Err(e) = socket.send(Message::Text(msg.to_string().into())).await {
                        warn!("Failed to send WS message: {e}");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Ambient listener lagged, skipped {skipped} blocks");
                    position.skip(skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = socket.close().await;
    debug!(
        "Ambient stream listener disconnected after {} samples",
        position.offset
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_follow_received_blocks() {
        let mut position = StreamPosition::default();
        assert_eq!(position.advance(480), 0);
        assert_eq!(position.advance(480), 480);
        assert_eq!(position.offset, 960);
    }

    #[test]
    fn test_lagged_blocks_advance_offset() {
        let mut position = StreamPosition::default();
        position.advance(480);
        position.skip(3);
        assert_eq!(position.advance(480), 480 * 4);

        // lag before the first block assumes the default block size
        let mut fresh = StreamPosition::default();
        fresh.skip(2);
        assert_eq!(fresh.advance(DEFAULT_BLOCK_FRAMES), 2 * DEFAULT_BLOCK_FRAMES as u64);
    }
}
