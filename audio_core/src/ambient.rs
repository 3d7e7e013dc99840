//! Procedural temple ambience: a breathing drone pad plus a sparse chime
//! melody, built on any [`AudioContext`].
//!
//! The synthesis is identical for realtime and offline contexts. Chimes are
//! handed to [`AudioContext::schedule_recurring`], and the context decides
//! whether they fire from a timer or from a precomputed time table.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::context::{AudioContext, RecurringJob};
use crate::error::AudioError;
use crate::graph::{Graph, NodeId, ParamKind, ParamRef, Waveform};

/// Drone voices in Hz.
pub const DRONE_FREQUENCIES: [f32; 4] = [216.0, 256.0, 324.0, 384.0];
pub const DRONE_CUTOFF_HZ: f32 = 800.0;
/// Maximum random detune per drone voice, either direction.
pub const DRONE_DETUNE_CENTS: f32 = 5.0;
pub const DRONE_VOICE_GAIN: (f32, f32) = (0.05, 0.10);
pub const BREATH_RATE_HZ: (f32, f32) = (0.05, 0.10);
pub const BREATH_DEPTH: f32 = 0.1;

pub const CHIME_SCALE: [f32; 6] = [523.25, 587.33, 659.25, 783.99, 880.00, 1046.50];
pub const CHIME_PEAK_GAIN: (f32, f32) = (0.10, 0.15);
pub const CHIME_ATTACK_SECS: f64 = 0.1;
pub const CHIME_DECAY_SECS: f64 = 3.0;
pub const CHIME_FLOOR_GAIN: f32 = 0.001;
pub const CHIME_STOP_SECS: f64 = 3.5;
/// Range of the random pause between chimes, in seconds.
pub const CHIME_GAP_SECS: (f64, f64) = (2.0, 5.0);

/// Everything one ambient session created, so it can be torn down.
///
/// Chimes added later by a realtime context land in the same lists; the
/// lists are shared with the scheduled chime job.
#[derive(Debug, Clone)]
pub struct AmbientGraphHandle {
    master: NodeId,
    nodes: Arc<Mutex<Vec<NodeId>>>,
    chime_starts: Arc<Mutex<Vec<f64>>>,
}

impl AmbientGraphHandle {
    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn master_gain(&self) -> ParamRef {
        ParamRef::new(self.master, ParamKind::Gain)
    }

    /// Every node created so far, master included.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Start time (seconds) of every chime scheduled so far.
    pub fn chime_starts(&self) -> Vec<f64> {
        self.chime_starts
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Disconnect every node and stop every generator at the context's
    /// current time. Nodes the graph already pruned are skipped.
    pub fn release(&self, ctx: &dyn AudioContext) -> Result<(), AudioError> {
        let now = ctx.current_time();
        let nodes: Vec<NodeId> = self
            .nodes
            .lock()
            .map_err(|_| AudioError::synthesis("ambient node list lock poisoned"))?
            .drain(..)
            .collect();

        let mut graph = ctx.lock_graph()?;
        let mut released = 0usize;
        for id in nodes {
            if !graph.contains(id) {
                continue;
            }
            if graph.is_source(id) {
                graph.stop(id, now)?;
            }
            graph.disconnect(id);
            released += 1;
        }
        debug!("Released {released} ambient nodes at {now:.3}s");
        Ok(())
    }
}

/// Build the ambience on `ctx`, feeding `destination` at `volume`.
///
/// All randomness (detune, voice levels, breath rates, chime notes and gaps)
/// is drawn from `rng`, so a seeded generator gives a reproducible offline
/// render.
pub fn build_ambient_graph(
    ctx: &dyn AudioContext,
    destination: NodeId,
    volume: f32,
    mut rng: StdRng,
) -> Result<AmbientGraphHandle, AudioError> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(AudioError::synthesis(format!("invalid ambient volume {volume}")));
    }

    let handle = {
        let mut graph = ctx.lock_graph()?;
        let master = graph.create_gain(volume);
        graph.connect(master, destination)?;

        let mut nodes = vec![master];
        build_drone(&mut graph, master, ctx.current_time(), &mut rng, &mut nodes)?;

        AmbientGraphHandle {
            master,
            nodes: Arc::new(Mutex::new(nodes)),
            chime_starts: Arc::new(Mutex::new(Vec::new())),
        }
    };

    let master = handle.master;
    let nodes = Arc::clone(&handle.nodes);
    let starts = Arc::clone(&handle.chime_starts);
    let job = RecurringJob::new(
        CHIME_GAP_SECS.0,
        CHIME_GAP_SECS.1,
        rng,
        Box::new(move |graph, rng, at| {
            let created = play_chime(graph, master, rng, at)?;
            if let Ok(mut nodes) = nodes.lock() {
                nodes.retain(|id| graph.contains(*id));
                nodes.extend(created);
            }
            if let Ok(mut starts) = starts.lock() {
                starts.push(at);
            }
            Ok(())
        }),
    )?;
    ctx.schedule_recurring(job)?;

    info!(
        "Ambient graph built: {} drone voices, {} chimes scheduled, volume {volume:.2}",
        DRONE_FREQUENCIES.len(),
        handle.chime_starts().len()
    );
    Ok(handle)
}

/// Four detuned voices, each low-passed and slowly swelling.
fn build_drone(
    graph: &mut Graph,
    master: NodeId,
    at: f64,
    rng: &mut StdRng,
    nodes: &mut Vec<NodeId>,
) -> Result<(), AudioError> {
    for (index, &frequency) in DRONE_FREQUENCIES.iter().enumerate() {
        let waveform = if index % 2 == 0 {
            Waveform::Sine
        } else {
            Waveform::Triangle
        };
        let osc = graph.create_oscillator(waveform, frequency);
        graph
            .param_mut(ParamRef::new(osc, ParamKind::Detune))?
            .set_value(rng.gen_range(-DRONE_DETUNE_CENTS..=DRONE_DETUNE_CENTS));

        let filter = graph.create_lowpass(DRONE_CUTOFF_HZ);
        let voice = graph.create_gain(rng.gen_range(DRONE_VOICE_GAIN.0..=DRONE_VOICE_GAIN.1));

        let breath = graph.create_oscillator(
            Waveform::Sine,
            rng.gen_range(BREATH_RATE_HZ.0..=BREATH_RATE_HZ.1),
        );
        let depth = graph.create_gain(BREATH_DEPTH);

        graph.connect(osc, filter)?;
        graph.connect(filter, voice)?;
        graph.connect(voice, master)?;
        graph.connect(breath, depth)?;
        graph.connect_param(depth, ParamRef::new(voice, ParamKind::Gain))?;

        graph.start(osc, at)?;
        graph.start(breath, at)?;

        nodes.extend([osc, filter, voice, breath, depth]);
    }
    Ok(())
}

/// One bell strike at `at`: quick swell, long exponential fade.
fn play_chime(
    graph: &mut Graph,
    master: NodeId,
    rng: &mut StdRng,
    at: f64,
) -> Result<[NodeId; 2], AudioError> {
    let frequency = CHIME_SCALE[rng.gen_range(0..CHIME_SCALE.len())];
    let peak = rng.gen_range(CHIME_PEAK_GAIN.0..=CHIME_PEAK_GAIN.1);

    let osc = graph.create_oscillator(Waveform::Sine, frequency);
    let envelope = graph.create_gain(0.0);
    {
        let gain = graph.param_mut(ParamRef::new(envelope, ParamKind::Gain))?;
        gain.set_value_at_time(0.0, at);
        gain.linear_ramp_to_value_at_time(peak, at + CHIME_ATTACK_SECS);
        gain.exponential_ramp_to_value_at_time(CHIME_FLOOR_GAIN, at + CHIME_DECAY_SECS);
    }
    graph.connect(osc, envelope)?;
    graph.connect(envelope, master)?;
    graph.start(osc, at)?;
    graph.stop(osc, at + CHIME_STOP_SECS)?;

    debug!("Chime {frequency:.2} Hz at {at:.3}s (peak {peak:.3})");
    Ok([osc, envelope])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextState, OfflineContext, RealtimeContext};
    use crate::sink::CaptureSink;
    use rand::SeedableRng;
    use std::time::Duration;

    const RATE: u32 = 24_000;
    /// master + five nodes per drone voice
    const DRONE_NODES: usize = 1 + 5 * DRONE_FREQUENCIES.len();

    fn offline(seconds: f64, seed: u64) -> (OfflineContext, AmbientGraphHandle) {
        let ctx = OfflineContext::with_duration(seconds, RATE).unwrap();
        let handle =
            build_ambient_graph(&ctx, ctx.destination(), 0.25, StdRng::seed_from_u64(seed)).unwrap();
        (ctx, handle)
    }

    #[test]
    fn test_offline_chimes_start_before_end() {
        for seed in 0..20 {
            let (_ctx, handle) = offline(30.0, seed);
            let starts = handle.chime_starts();
            assert!(!starts.is_empty());
            assert!(starts.iter().all(|t| *t < 30.0), "seed {seed}: {starts:?}");
            assert!(starts[0] >= CHIME_GAP_SECS.0);
            for pair in starts.windows(2) {
                let gap = pair[1] - pair[0];
                assert!(gap >= CHIME_GAP_SECS.0 && gap <= CHIME_GAP_SECS.1);
            }
        }
    }

    #[test]
    fn test_offline_schedule_is_reproducible() {
        let (_a, first) = offline(20.0, 99);
        let (_b, second) = offline(20.0, 99);
        assert_eq!(first.chime_starts(), second.chime_starts());
    }

    #[test]
    fn test_handle_tracks_every_node() {
        let (ctx, handle) = offline(12.0, 5);
        let chimes = handle.chime_starts().len();
        assert_eq!(handle.nodes().len(), DRONE_NODES + 2 * chimes);
        // destination is the only node the engine did not create
        assert_eq!(ctx.lock_graph().unwrap().node_count(), DRONE_NODES + 2 * chimes + 1);
    }

    #[test]
    fn test_rejects_invalid_volume() {
        let ctx = OfflineContext::with_duration(1.0, RATE).unwrap();
        let result = build_ambient_graph(&ctx, ctx.destination(), f32::NAN, StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(AudioError::SynthesisFailure(_))));
    }

    #[tokio::test]
    async fn test_offline_render_is_audible_and_bounded() {
        let (ctx, _handle) = offline(6.0, 11);
        let mix = ctx.start_rendering().await.unwrap();
        let samples = mix.channel(0).unwrap();
        assert_eq!(samples.len(), 6 * RATE as usize);
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.001, "ambience should be audible, peak {peak}");
        assert!(peak < 1.0, "ambience should not clip, peak {peak}");
    }

    #[tokio::test]
    async fn test_offline_render_drops_finished_chimes() {
        let (ctx, handle) = offline(60.0, 17);
        let graph = Arc::clone(ctx.graph());
        let chimes = handle.chime_starts().len();
        assert!(chimes >= 11);

        ctx.start_rendering().await.unwrap();

        // only chimes still ringing at the end survive, and gaps of at
        // least two seconds leave room for two of them
        let remaining = graph.lock().unwrap().node_count();
        assert!(remaining <= DRONE_NODES + 1 + 2 * 2, "{remaining} nodes left");
        assert!(remaining >= DRONE_NODES + 1);
    }

    #[tokio::test]
    async fn test_release_silences_everything() {
        let (ctx, handle) = offline(4.0, 3);
        handle.release(&ctx).unwrap();
        assert!(handle.nodes().is_empty());
        let mix = ctx.start_rendering().await.unwrap();
        assert!(mix.channel(0).unwrap().iter().all(|s| *s == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_chimes_stop_after_close() {
        let ctx = RealtimeContext::new(RATE, 480, Box::new(CaptureSink::new())).unwrap();
        ctx.resume().await.unwrap();
        let handle =
            build_ambient_graph(&ctx, ctx.destination(), 0.2, StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(handle.chime_starts().len(), 1, "first chime plays immediately");

        tokio::time::sleep(Duration::from_secs(12)).await;
        let before_close = handle.chime_starts().len();
        assert!(before_close >= 3);

        handle.release(&ctx).unwrap();
        ctx.close().await;
        assert_eq!(ctx.state(), ContextState::Closed);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(handle.chime_starts().len(), before_close);
    }
}
