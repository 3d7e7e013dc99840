//! Live ambience session: one realtime context plus its ambient graph,
//! behind a small state machine.
//!
//! ```text
//! Idle -> Starting -> Playing -> Stopping -> Idle
//! ```
//!
//! The controller is an ordinary owned value (the server keeps it in an
//! `Arc`); there is no global instance.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::ambient::{build_ambient_graph, AmbientGraphHandle};
use crate::context::{AudioContext, RealtimeContext, DEFAULT_BLOCK_FRAMES};
use crate::error::AudioError;
use crate::sink::{AudioSink, BroadcastSink};

/// Length of every master-gain glide.
pub const VOLUME_RAMP_SECS: f64 = 0.5;
/// Wait after starting the fade-out before tearing the graph down.
pub const FADE_OUT_DELAY: Duration = Duration::from_millis(600);

/// Blocks buffered per WebSocket listener before it starts skipping.
const BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

/// Builds the sink for each new realtime context.
pub type SinkFactory = Arc<dyn Fn() -> Result<Box<dyn AudioSink>, AudioError> + Send + Sync>;

struct Session {
    ctx: RealtimeContext,
    handle: AmbientGraphHandle,
}

struct Inner {
    state: PlaybackState,
    session: Option<Session>,
}

pub struct AmbientController {
    sample_rate: u32,
    sink_factory: SinkFactory,
    blocks: broadcast::Sender<Arc<[f32]>>,
    seed: Option<u64>,
    inner: Arc<Mutex<Inner>>,
}

impl AmbientController {
    /// Controller whose realtime output goes to every [`subscribe`](Self::subscribe) receiver.
    pub fn new(sample_rate: u32) -> Self {
        let (blocks, _) = broadcast::channel(BROADCAST_CAPACITY);
        let tx = blocks.clone();
        let factory: SinkFactory = Arc::new(move || {
            Ok(Box::new(BroadcastSink::new(tx.clone())) as Box<dyn AudioSink>)
        });
        Self::build(sample_rate, factory, blocks)
    }

    /// Controller rendering into sinks from `sink_factory`. Subscribers of
    /// such a controller receive nothing.
    pub fn with_sink_factory(sample_rate: u32, sink_factory: SinkFactory) -> Self {
        let (blocks, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self::build(sample_rate, sink_factory, blocks)
    }

    fn build(
        sample_rate: u32,
        sink_factory: SinkFactory,
        blocks: broadcast::Sender<Arc<[f32]>>,
    ) -> Self {
        Self {
            sample_rate,
            sink_factory,
            blocks,
            seed: None,
            inner: Arc::new(Mutex::new(Inner {
                state: PlaybackState::Idle,
                session: None,
            })),
        }
    }

    /// Seed every session's random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> PlaybackState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<[f32]>> {
        self.blocks.subscribe()
    }

    fn lock_inner(&self) -> Result<std::sync::MutexGuard<'_, Inner>, AudioError> {
        self.inner
            .lock()
            .map_err(|_| AudioError::synthesis("ambient controller lock poisoned"))
    }

    fn set_state(&self, state: PlaybackState) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state = state;
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Start live ambience at `volume`. Does nothing unless idle.
    ///
    /// On failure the half-built context is closed, the controller returns
    /// to idle and the error is handed back.
    pub async fn start(&self, volume: f32) -> Result<(), AudioError> {
        {
            let mut inner = self.lock_inner()?;
            if inner.state != PlaybackState::Idle {
                return Ok(());
            }
            inner.state = PlaybackState::Starting;
        }

        match self.open_session(volume).await {
            Ok(session) => {
                let mut inner = self.lock_inner()?;
                inner.session = Some(session);
                inner.state = PlaybackState::Playing;
                info!("Ambient playback started at volume {volume:.2}");
                Ok(())
            }
            Err(e) => {
                error!("Failed to start ambient playback: {e}");
                self.set_state(PlaybackState::Idle);
                Err(e)
            }
        }
    }

    async fn open_session(&self, volume: f32) -> Result<Session, AudioError> {
        let sink = (self.sink_factory)()?;
        let ctx = RealtimeContext::new(self.sample_rate, DEFAULT_BLOCK_FRAMES, sink)?;

        let built = match ctx.resume().await {
            Ok(()) => build_ambient_graph(&ctx, ctx.destination(), volume, self.rng()),
            Err(e) => Err(e),
        };
        match built {
            Ok(handle) => Ok(Session { ctx, handle }),
            Err(e) => {
                ctx.close().await;
                Err(e)
            }
        }
    }

    /// Glide the master volume to `value` over [`VOLUME_RAMP_SECS`]. A newer
    /// call replaces any glide still in progress. Does nothing unless playing.
    pub fn set_volume(&self, value: f32) -> Result<(), AudioError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AudioError::synthesis(format!("invalid ambient volume {value}")));
        }
        let inner = self.lock_inner()?;
        let Some(session) = inner.session.as_ref() else {
            return Ok(());
        };
        if inner.state != PlaybackState::Playing {
            return Ok(());
        }
        let now = session.ctx.current_time();
        let mut graph = session.ctx.lock_graph()?;
        graph
            .param_mut(session.handle.master_gain())?
            .ramp_to(value, now, VOLUME_RAMP_SECS);
        Ok(())
    }

    /// Fade out, then tear the session down. Safe to call in any state;
    /// only a playing controller does anything.
    ///
    /// The teardown runs on its own task, so dropping this future part way
    /// through the fade still ends in `Idle`.
    pub async fn stop(&self) {
        let session = {
            let Ok(mut inner) = self.inner.lock() else {
                return;
            };
            if inner.state != PlaybackState::Playing {
                return;
            }
            inner.state = PlaybackState::Stopping;
            inner.session.take()
        };

        let inner = Arc::clone(&self.inner);
        let teardown = tokio::spawn(async move {
            if let Some(session) = session {
                session.fade_out_and_close().await;
            }
            if let Ok(mut inner) = inner.lock() {
                inner.state = PlaybackState::Idle;
            }
            info!("Ambient playback stopped");
        });

        if let Err(e) = teardown.await {
            error!("Ambient teardown task failed: {e}");
            self.set_state(PlaybackState::Idle);
        }
    }
}

impl Session {
    async fn fade_out_and_close(self) {
        let Session { ctx, handle } = self;
        let faded = ctx.lock_graph().and_then(|mut graph| {
            let now = ctx.current_time();
            graph
                .param_mut(handle.master_gain())?
                .ramp_to(0.0, now, VOLUME_RAMP_SECS);
            Ok(())
        });
        if let Err(e) = faded {
            warn!("Could not fade out ambience, stopping abruptly: {e}");
        }

        tokio::time::sleep(FADE_OUT_DELAY).await;

        if let Err(e) = handle.release(&ctx) {
            warn!("Failed to release ambient graph: {e}");
        }
        ctx.close().await;
    }
}
