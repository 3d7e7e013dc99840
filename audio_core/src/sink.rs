//! Destinations for blocks rendered by a realtime context.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::error::AudioError;

/// Receives each block a realtime context renders, in order.
pub trait AudioSink: Send + 'static {
    fn write_block(&mut self, block: &[f32]) -> Result<(), AudioError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn write_block(&mut self, _block: &[f32]) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Keeps every sample in memory; clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    samples: Arc<Mutex<Vec<f32>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AudioSink for CaptureSink {
    fn write_block(&mut self, block: &[f32]) -> Result<(), AudioError> {
        let mut samples = self
            .samples
            .lock()
            .map_err(|_| AudioError::synthesis("capture sink lock poisoned"))?;
        samples.extend_from_slice(block);
        Ok(())
    }
}

/// Fans blocks out to any number of listeners (e.g. WebSocket clients).
/// Having no listener is not an error; slow listeners lag and skip blocks.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Arc<[f32]>>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<Arc<[f32]>>) -> Self {
        Self { tx }
    }
}

impl AudioSink for BroadcastSink {
    fn write_block(&mut self, block: &[f32]) -> Result<(), AudioError> {
        // Err only means nobody is subscribed right now
        let _ = self.tx.send(Arc::from(block));
        Ok(())
    }
}
