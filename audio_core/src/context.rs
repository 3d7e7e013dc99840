//! Processing contexts: the capability interface the synthesis engine is
//! written against, plus its realtime and offline implementations.
//!
//! Both contexts own a [`Graph`] behind a mutex. They differ only in how
//! time advances and in how recurring events are scheduled:
//!
//! * [`RealtimeContext`] renders fixed-size blocks paced by the tokio clock
//!   and fires recurring events from a timer task.
//! * [`OfflineContext`] renders a fixed number of frames in one go and lays
//!   out every recurring event on a time table before rendering starts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::buffer::AudioBuffer;
use crate::error::AudioError;
use crate::graph::{Graph, NodeId};
use crate::sink::AudioSink;

/// 20 ms at the pipeline rate.
pub const DEFAULT_BLOCK_FRAMES: usize = 480;

pub type SharedGraph = Arc<Mutex<Graph>>;

/// Callback fired for each occurrence of a recurring event, with the graph
/// locked and the time (seconds) the event should sound at.
pub type RecurringEvent =
    Box<dyn FnMut(&mut Graph, &mut StdRng, f64) -> Result<(), AudioError> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// An event repeated with random gaps drawn uniformly from `[min_gap, max_gap]`.
pub struct RecurringJob {
    min_gap: f64,
    max_gap: f64,
    rng: StdRng,
    event: RecurringEvent,
}

impl RecurringJob {
    pub fn new(
        min_gap: f64,
        max_gap: f64,
        rng: StdRng,
        event: RecurringEvent,
    ) -> Result<Self, AudioError> {
        if !(min_gap > 0.0 && max_gap >= min_gap && max_gap.is_finite()) {
            return Err(AudioError::synthesis(format!(
                "invalid recurring gap range [{min_gap}, {max_gap}]"
            )));
        }
        Ok(Self {
            min_gap,
            max_gap,
            rng,
            event,
        })
    }

    fn next_gap(&mut self) -> f64 {
        self.rng.gen_range(self.min_gap..=self.max_gap)
    }

    fn fire(&mut self, graph: &mut Graph, at: f64) -> Result<(), AudioError> {
        (self.event)(graph, &mut self.rng, at)
    }
}

/// What the ambient engine needs from an audio context.
pub trait AudioContext: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Seconds of audio rendered so far (realtime) or zero (offline, before render).
    fn current_time(&self) -> f64;

    fn destination(&self) -> NodeId;

    fn state(&self) -> ContextState;

    fn graph(&self) -> &SharedGraph;

    /// Arrange for `job` to fire repeatedly for as long as this context
    /// produces audio.
    fn schedule_recurring(&self, job: RecurringJob) -> Result<(), AudioError>;

    fn lock_graph(&self) -> Result<MutexGuard<'_, Graph>, AudioError> {
        self.graph()
            .lock()
            .map_err(|_| AudioError::synthesis("audio graph lock poisoned"))
    }
}

struct RealtimeShared {
    sample_rate: u32,
    graph: SharedGraph,
    destination: NodeId,
    frames_rendered: AtomicU64,
    state: Mutex<ContextState>,
}

impl RealtimeShared {
    fn state(&self) -> ContextState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(ContextState::Closed)
    }

    fn set_state(&self, next: ContextState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    fn current_time(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

/// Indefinite-duration context driven by the tokio clock.
///
/// Created suspended; [`RealtimeContext::resume`] starts the render task.
/// Requires a tokio runtime for `resume` and `schedule_recurring`.
pub struct RealtimeContext {
    shared: Arc<RealtimeShared>,
    block_frames: usize,
    sink: Mutex<Option<Box<dyn AudioSink>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RealtimeContext {
    pub fn new(
        sample_rate: u32,
        block_frames: usize,
        sink: Box<dyn AudioSink>,
    ) -> Result<Self, AudioError> {
        if sample_rate == 0 || block_frames == 0 {
            return Err(AudioError::synthesis(
                "realtime context needs a non-zero sample rate and block size",
            ));
        }
        let graph = Graph::new(sample_rate);
        let destination = graph.destination();
        Ok(Self {
            shared: Arc::new(RealtimeShared {
                sample_rate,
                graph: Arc::new(Mutex::new(graph)),
                destination,
                frames_rendered: AtomicU64::new(0),
                state: Mutex::new(ContextState::Suspended),
            }),
            block_frames,
            sink: Mutex::new(Some(sink)),
            tasks: Mutex::new(Vec::new()),
        })
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(handle),
            Err(_) => handle.abort(),
        }
    }

    /// Start rendering. No-op if already running.
    pub async fn resume(&self) -> Result<(), AudioError> {
        match self.shared.state() {
            ContextState::Running => return Ok(()),
            ContextState::Closed => {
                return Err(AudioError::synthesis("cannot resume a closed context"))
            }
            ContextState::Suspended => {}
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AudioError::synthesis(format!("no async runtime for playback: {e}")))?;
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| AudioError::synthesis("sink lock poisoned"))?
            .take()
            .ok_or_else(|| AudioError::synthesis("realtime sink already taken"))?;

        self.shared.set_state(ContextState::Running);

        let shared = Arc::clone(&self.shared);
        let block_frames = self.block_frames;
        let period = Duration::from_secs_f64(block_frames as f64 / shared.sample_rate as f64);

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut block = vec![0.0f32; block_frames];
            loop {
                ticker.tick().await;
                if shared.state() == ContextState::Closed {
                    break;
                }
                let start = shared.frames_rendered.load(Ordering::Acquire);
                let rendered = {
                    match shared.graph.lock() {
                        Ok(mut graph) => {
                            graph.render_into(start, &mut block);
                            let end = (start + block_frames as u64) as f64 / shared.sample_rate as f64;
                            graph.prune_finished(end);
                            true
                        }
                        Err(_) => false,
                    }
                };
                if !rendered {
                    error!("audio graph lock poisoned, stopping realtime render");
                    break;
                }
                shared
                    .frames_rendered
                    .fetch_add(block_frames as u64, Ordering::AcqRel);
                if let Err(e) = sink.write_block(&block) {
                    warn!("Realtime sink rejected block: {e}");
                }
            }
            debug!("Realtime render task finished");
        });
        self.track(handle);
        info!(
            "Realtime audio context running at {} Hz ({} frames/block)",
            self.shared.sample_rate, block_frames
        );
        Ok(())
    }

    /// Stop every task and drop every node. Idempotent.
    pub async fn close(&self) {
        if self.shared.state() == ContextState::Closed {
            return;
        }
        self.shared.set_state(ContextState::Closed);

        let tasks: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            // cancelled tasks report a JoinError, which is expected here
            let _ = task.await;
        }
        if let Ok(mut graph) = self.shared.graph.lock() {
            graph.clear();
        }
        info!("Realtime audio context closed");
    }
}

impl Drop for RealtimeContext {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl AudioContext for RealtimeContext {
    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.shared.current_time()
    }

    fn destination(&self) -> NodeId {
        self.shared.destination
    }

    fn state(&self) -> ContextState {
        self.shared.state()
    }

    fn graph(&self) -> &SharedGraph {
        &self.shared.graph
    }

    /// Fires once now, then after each random gap until the context closes.
    fn schedule_recurring(&self, mut job: RecurringJob) -> Result<(), AudioError> {
        if self.state() == ContextState::Closed {
            return Err(AudioError::synthesis("cannot schedule on a closed context"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AudioError::synthesis(format!("no async runtime for scheduling: {e}")))?;

        {
            let mut graph = self.lock_graph()?;
            job.fire(&mut graph, self.current_time())?;
        }

        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn(async move {
            loop {
                let gap = job.next_gap();
                tokio::time::sleep(Duration::from_secs_f64(gap)).await;
                if shared.state() == ContextState::Closed {
                    break;
                }
                let now = shared.current_time();
                let result = match shared.graph.lock() {
                    Ok(mut graph) => job.fire(&mut graph, now),
                    Err(_) => Err(AudioError::synthesis("audio graph lock poisoned")),
                };
                if let Err(e) = result {
                    warn!("Recurring event stopped: {e}");
                    break;
                }
            }
            debug!("Recurring event loop finished");
        });
        self.track(handle);
        Ok(())
    }
}

/// Fixed-length context rendered in one pass, off the async executor.
pub struct OfflineContext {
    sample_rate: u32,
    length: usize,
    graph: SharedGraph,
    destination: NodeId,
}

impl OfflineContext {
    pub fn new(length: usize, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::synthesis("offline context needs a non-zero sample rate"));
        }
        if length == 0 {
            return Err(AudioError::synthesis("offline context needs at least one frame"));
        }
        let graph = Graph::new(sample_rate);
        let destination = graph.destination();
        Ok(Self {
            sample_rate,
            length,
            graph: Arc::new(Mutex::new(graph)),
            destination,
        })
    }

    /// Context of `round(seconds * sample_rate)` frames.
    pub fn with_duration(seconds: f64, sample_rate: u32) -> Result<Self, AudioError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(AudioError::synthesis(format!(
                "invalid offline render duration {seconds}s"
            )));
        }
        let length = (seconds * sample_rate as f64).round() as usize;
        Self::new(length, sample_rate)
    }

    /// Frames the render will produce.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn duration(&self) -> f64 {
        self.length as f64 / self.sample_rate as f64
    }

    /// Render every frame and return the mono result. Rendering runs in
    /// blocks, dropping finished sources between them as the realtime task
    /// does.
    pub async fn start_rendering(self) -> Result<AudioBuffer, AudioError> {
        let Self {
            sample_rate,
            length,
            graph,
            ..
        } = self;

        let started = std::time::Instant::now();
        let samples = tokio::task::spawn_blocking(move || {
            let mut graph = graph
                .lock()
                .map_err(|_| AudioError::synthesis("audio graph lock poisoned"))?;
            let mut out = vec![0.0f32; length];
            let mut frame = 0u64;
            for block in out.chunks_mut(DEFAULT_BLOCK_FRAMES) {
                graph.render_into(frame, block);
                frame += block.len() as u64;
                graph.prune_finished(frame as f64 / sample_rate as f64);
            }
            Ok::<_, AudioError>(out)
        })
        .await
        .map_err(|e| AudioError::synthesis(format!("offline render task failed: {e}")))??;

        debug!(
            "Offline render of {} frames took {:?}",
            length,
            started.elapsed()
        );
        Ok(AudioBuffer::mono(samples, sample_rate))
    }
}

impl AudioContext for OfflineContext {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn state(&self) -> ContextState {
        ContextState::Suspended
    }

    fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Lays out the whole time table now: starting from zero, add a random
    /// gap and fire, until the next time would reach the end of the render.
    fn schedule_recurring(&self, mut job: RecurringJob) -> Result<(), AudioError> {
        let duration = self.duration();
        let mut graph = self.lock_graph()?;
        let mut t = 0.0;
        let mut fired = 0usize;
        loop {
            t += job.next_gap();
            if t >= duration {
                break;
            }
            job.fire(&mut graph, t)?;
            fired += 1;
        }
        debug!("Scheduled {fired} offline events over {duration:.2}s");
        Ok(())
    }
}
