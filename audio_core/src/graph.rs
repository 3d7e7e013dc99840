//! Sample-accurate audio node graph.
//!
//! Nodes live in an arena (`Vec<Option<Slot>>`); ids are never reused, so a
//! stale [`NodeId`] held by a graph handle simply stops resolving once the
//! node has been pruned. Rendering walks the nodes feeding the destination
//! in dependency order, one frame at a time.

use std::f64::consts::PI;
use std::sync::Arc;

use serde::Serialize;

use crate::buffer::AudioBuffer;
use crate::error::AudioError;
use crate::param::AudioParam;

/// Butterworth Q for the low-pass filter.
const DEFAULT_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Unique identifier for nodes in the graph
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    /// Value at `phase` in [0, 1).
    fn sample(self, phase: f64) -> f32 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin() as f32,
            Waveform::Triangle => {
                let v = if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                };
                v as f32
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Gain,
    Frequency,
    Detune,
    Cutoff,
}

/// A specific parameter of a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeId,
    pub kind: ParamKind,
}

impl ParamRef {
    pub fn new(node: NodeId, kind: ParamKind) -> Self {
        Self { node, kind }
    }
}

/// Filter state for biquad filters
#[derive(Debug, Clone, Default)]
struct FilterState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
    coeffs_for: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl FilterState {
    fn update_coefficients(&mut self, cutoff: f32, q: f32, sample_rate: f32) {
        if cutoff == self.coeffs_for && self.b0 != 0.0 {
            return;
        }
        let nyquist = sample_rate * 0.5;
        let freq = cutoff.clamp(10.0, nyquist * 0.99);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        self.b0 = (1.0 - cos_w0) / 2.0 / a0;
        self.b1 = (1.0 - cos_w0) / a0;
        self.b2 = self.b0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
        self.coeffs_for = cutoff;
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[derive(Debug)]
enum NodeKind {
    Destination,
    Oscillator {
        waveform: Waveform,
        frequency: AudioParam,
        detune: AudioParam,
        phase: f64,
        start: Option<f64>,
        stop: Option<f64>,
    },
    Gain {
        gain: AudioParam,
    },
    LowPass {
        cutoff: AudioParam,
        q: f32,
        state: FilterState,
    },
    BufferSource {
        buffer: Arc<AudioBuffer>,
        start: Option<f64>,
        stop: Option<f64>,
    },
}

impl NodeKind {
    fn name(&self) -> &'static str {
        match self {
            NodeKind::Destination => "destination",
            NodeKind::Oscillator { .. } => "oscillator",
            NodeKind::Gain { .. } => "gain",
            NodeKind::LowPass { .. } => "lowpass",
            NodeKind::BufferSource { .. } => "buffer source",
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut AudioParam> {
        match (self, kind) {
            (NodeKind::Oscillator { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (NodeKind::Oscillator { detune, .. }, ParamKind::Detune) => Some(detune),
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(gain),
            (NodeKind::LowPass { cutoff, .. }, ParamKind::Cutoff) => Some(cutoff),
            _ => None,
        }
    }

    fn schedule_mut(&mut self) -> Option<(&mut Option<f64>, &mut Option<f64>)> {
        match self {
            NodeKind::Oscillator { start, stop, .. } | NodeKind::BufferSource { start, stop, .. } => {
                Some((start, stop))
            }
            _ => None,
        }
    }

    /// Stop time of a source node, if one was set.
    fn stop_time(&self) -> Option<f64> {
        match self {
            NodeKind::Oscillator { stop, .. } | NodeKind::BufferSource { stop, .. } => *stop,
            _ => None,
        }
    }
}

/// Per-frame sum of modulation signals routed into each parameter kind.
#[derive(Debug, Default, Clone, Copy)]
struct Modulation {
    gain: f32,
    frequency: f32,
    detune: f32,
    cutoff: f32,
}

impl Modulation {
    fn add(&mut self, kind: ParamKind, value: f32) {
        match kind {
            ParamKind::Gain => self.gain += value,
            ParamKind::Frequency => self.frequency += value,
            ParamKind::Detune => self.detune += value,
            ParamKind::Cutoff => self.cutoff += value,
        }
    }
}

#[derive(Debug)]
struct Slot {
    kind: NodeKind,
    inputs: Vec<NodeId>,
    modulators: Vec<(ParamKind, NodeId)>,
    output: f32,
}

impl Slot {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
            modulators: Vec::new(),
            output: 0.0,
        }
    }

    fn process(&mut self, input: f32, modulation: Modulation, t: f64, sample_rate: u32) -> f32 {
        match &mut self.kind {
            NodeKind::Destination => input,
            NodeKind::Oscillator {
                waveform,
                frequency,
                detune,
                phase,
                start,
                stop,
            } => {
                let active = matches!(start, Some(s) if t >= *s) && !matches!(stop, Some(s) if t >= *s);
                if !active {
                    return 0.0;
                }
                let freq = (frequency.value_at(t) + modulation.frequency) as f64;
                let cents = (detune.value_at(t) + modulation.detune) as f64;
                let freq = freq * (cents / 1200.0).exp2();

                let out = waveform.sample(*phase);
                *phase += freq / sample_rate as f64;
                *phase -= phase.floor();
                out
            }
            NodeKind::Gain { gain } => input * (gain.value_at(t) + modulation.gain),
            NodeKind::LowPass { cutoff, q, state } => {
                let freq = cutoff.value_at(t) + modulation.cutoff;
                state.update_coefficients(freq, *q, sample_rate as f32);
                state.process(input)
            }
            NodeKind::BufferSource {
                buffer,
                start,
                stop,
            } => {
                let Some(begin) = *start else {
                    return 0.0;
                };
                if t < begin || matches!(stop, Some(s) if t >= *s) {
                    return 0.0;
                }
                let frame = ((t - begin) * sample_rate as f64).round() as usize;
                buffer.frame_mono(frame)
            }
        }
    }
}

/// The node graph shared by a processing context.
#[derive(Debug)]
pub struct Graph {
    sample_rate: u32,
    slots: Vec<Option<Slot>>,
    destination: NodeId,
    order: Option<Vec<NodeId>>,
}

impl Graph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            slots: vec![Some(Slot::new(NodeKind::Destination))],
            destination: NodeId(0),
            order: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Live node count, destination included.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(Slot::new(kind)));
        self.order = None;
        id
    }

    fn slot(&self, id: NodeId) -> Result<&Slot, AudioError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| AudioError::synthesis(format!("unknown audio node {}", id.0)))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot, AudioError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| AudioError::synthesis(format!("unknown audio node {}", id.0)))
    }

    pub fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.add(NodeKind::Oscillator {
            waveform,
            frequency: AudioParam::new(frequency),
            detune: AudioParam::new(0.0),
            phase: 0.0,
            start: None,
            stop: None,
        })
    }

    pub fn create_gain(&mut self, gain: f32) -> NodeId {
        self.add(NodeKind::Gain {
            gain: AudioParam::new(gain),
        })
    }

    pub fn create_lowpass(&mut self, cutoff: f32) -> NodeId {
        self.add(NodeKind::LowPass {
            cutoff: AudioParam::new(cutoff),
            q: DEFAULT_Q,
            state: FilterState::default(),
        })
    }

    /// Source node playing `buffer`. Its rate must match the graph's; there
    /// is no resampling.
    pub fn create_buffer_source(&mut self, buffer: Arc<AudioBuffer>) -> Result<NodeId, AudioError> {
        if buffer.sample_rate() != self.sample_rate {
            return Err(AudioError::synthesis(format!(
                "buffer sample rate {} does not match context rate {}",
                buffer.sample_rate(),
                self.sample_rate
            )));
        }
        Ok(self.add(NodeKind::BufferSource {
            buffer,
            start: None,
            stop: None,
        }))
    }

    /// Route the output of `from` into `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), AudioError> {
        if from == self.destination {
            return Err(AudioError::synthesis("the destination has no output"));
        }
        self.slot(from)?;
        let target = self.slot_mut(to)?;
        if !target.inputs.contains(&from) {
            target.inputs.push(from);
        }
        self.order = None;
        Ok(())
    }

    /// Route the output of `from` into a parameter, adding to its automated value.
    pub fn connect_param(&mut self, from: NodeId, param: ParamRef) -> Result<(), AudioError> {
        if from == self.destination {
            return Err(AudioError::synthesis("the destination has no output"));
        }
        self.slot(from)?;
        let target = self.slot_mut(param.node)?;
        if target.kind.param_mut(param.kind).is_none() {
            return Err(AudioError::synthesis(format!(
                "{} node has no {:?} parameter",
                target.kind.name(),
                param.kind
            )));
        }
        if !target.modulators.contains(&(param.kind, from)) {
            target.modulators.push((param.kind, from));
        }
        self.order = None;
        Ok(())
    }

    /// Remove every outgoing connection of `id`. Unknown ids are ignored.
    pub fn disconnect(&mut self, id: NodeId) {
        for slot in self.slots.iter_mut().flatten() {
            slot.inputs.retain(|n| *n != id);
            slot.modulators.retain(|(_, n)| *n != id);
        }
        self.order = None;
    }

    pub fn param_mut(&mut self, param: ParamRef) -> Result<&mut AudioParam, AudioError> {
        let slot = self.slot_mut(param.node)?;
        let name = slot.kind.name();
        slot.kind.param_mut(param.kind).ok_or_else(|| {
            AudioError::synthesis(format!("{name} node has no {:?} parameter", param.kind))
        })
    }

    /// Schedule a source node to begin at `at` seconds.
    pub fn start(&mut self, id: NodeId, at: f64) -> Result<(), AudioError> {
        let slot = self.slot_mut(id)?;
        let name = slot.kind.name();
        let (start, _) = slot
            .kind
            .schedule_mut()
            .ok_or_else(|| AudioError::synthesis(format!("{name} node cannot be started")))?;
        if start.is_some() {
            return Err(AudioError::synthesis(format!("node {} already started", id.0)));
        }
        *start = Some(at.max(0.0));
        Ok(())
    }

    /// Schedule a source node to fall silent at `at` seconds. A later call
    /// replaces an earlier stop time.
    pub fn stop(&mut self, id: NodeId, at: f64) -> Result<(), AudioError> {
        let slot = self.slot_mut(id)?;
        let name = slot.kind.name();
        let (_, stop) = slot
            .kind
            .schedule_mut()
            .ok_or_else(|| AudioError::synthesis(format!("{name} node cannot be stopped")))?;
        *stop = Some(at.max(0.0));
        Ok(())
    }

    pub fn is_source(&self, id: NodeId) -> bool {
        self.slot(id).is_ok_and(|s| {
            matches!(s.kind, NodeKind::Oscillator { .. } | NodeKind::BufferSource { .. })
        })
    }

    fn remove(&mut self, id: NodeId) {
        if id == self.destination {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.0) {
            *slot = None;
        }
        self.disconnect(id);
    }

    /// Drop everything except the destination.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if index != self.destination.0 {
                *slot = None;
            }
        }
        if let Some(Some(dest)) = self.slots.get_mut(self.destination.0) {
            dest.inputs.clear();
            dest.modulators.clear();
        }
        self.order = None;
    }

    /// Remove sources whose stop time has passed, then any gain or filter
    /// left with nothing feeding it. Returns the number of nodes removed.
    pub fn prune_finished(&mut self, t: f64) -> usize {
        let finished: Vec<NodeId> = self
            .live_ids()
            .filter(|id| {
                self.slot(*id)
                    .ok()
                    .and_then(|s| s.kind.stop_time())
                    .is_some_and(|stop| stop <= t)
            })
            .collect();

        let mut removed = finished.len();
        for id in finished {
            self.remove(id);
        }
        if removed == 0 {
            return 0;
        }

        loop {
            let orphans: Vec<NodeId> = self
                .live_ids()
                .filter(|id| {
                    self.slot(*id).is_ok_and(|s| {
                        matches!(s.kind, NodeKind::Gain { .. } | NodeKind::LowPass { .. })
                            && s.inputs.is_empty()
                            && s.modulators.is_empty()
                    })
                })
                .collect();
            if orphans.is_empty() {
                break;
            }
            removed += orphans.len();
            for id in orphans {
                self.remove(id);
            }
        }
        removed
    }

    fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| NodeId(i))
    }

    /// Post-order walk from the destination so every node is processed
    /// after the nodes feeding it. A node met again on the current path
    /// reads its previous-frame output.
    fn build_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut visited = vec![false; self.slots.len()];
        self.visit(self.destination, &mut visited, &mut order);
        order
    }

    fn visit(&self, id: NodeId, visited: &mut [bool], order: &mut Vec<NodeId>) {
        if visited[id.0] {
            return;
        }
        visited[id.0] = true;
        let Ok(slot) = self.slot(id) else {
            return;
        };
        for &input in &slot.inputs {
            self.visit(input, visited, order);
        }
        for &(_, modulator) in &slot.modulators {
            self.visit(modulator, visited, order);
        }
        order.push(id);
    }

    fn output_of(&self, id: NodeId) -> f32 {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|s| s.output)
            .unwrap_or(0.0)
    }

    /// Render one frame at time `t` and return the destination's value.
    pub fn render_frame(&mut self, t: f64) -> f32 {
        let order = match self.order.take() {
            Some(order) => order,
            None => self.build_order(),
        };

        for &id in &order {
            let Some(Some(slot)) = self.slots.get(id.0) else {
                continue;
            };
            let input: f32 = slot.inputs.iter().map(|n| self.output_of(*n)).sum();
            let mut modulation = Modulation::default();
            for &(kind, n) in &slot.modulators {
                modulation.add(kind, self.output_of(n));
            }

            let sample_rate = self.sample_rate;
            if let Some(Some(slot)) = self.slots.get_mut(id.0) {
                slot.output = slot.process(input, modulation, t, sample_rate);
            }
        }

        self.order = Some(order);
        self.output_of(self.destination)
    }

    /// Render `out.len()` consecutive frames starting at frame `start_frame`.
    pub fn render_into(&mut self, start_frame: u64, out: &mut [f32]) {
        let rate = self.sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (start_frame + i as u64) as f64 / rate;
            *sample = self.render_frame(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 24_000;

    fn render(graph: &mut Graph, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        graph.render_into(0, &mut out);
        out
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_empty_graph_is_silent() {
        let mut graph = Graph::new(RATE);
        assert!(render(&mut graph, 100).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_sine_through_gain() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 1_000.0);
        let gain = graph.create_gain(0.5);
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        graph.start(osc, 0.0).unwrap();

        let out = render(&mut graph, RATE as usize);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01, "peak {peak}");
        assert!((rms(&out) - 0.5 / 2f32.sqrt()).abs() < 0.01);
    }

    #[test]
    fn test_triangle_shape() {
        assert_eq!(Waveform::Triangle.sample(0.0), 0.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.5), 0.0);
        assert_eq!(Waveform::Triangle.sample(0.75), -1.0);
    }

    #[test]
    fn test_oscillator_respects_start_and_stop() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect(osc, graph.destination()).unwrap();
        graph.start(osc, 0.5).unwrap();
        graph.stop(osc, 1.0).unwrap();

        let out = render(&mut graph, (RATE as usize) * 3 / 2);
        let half = RATE as usize / 2;
        assert!(out[..half].iter().all(|s| *s == 0.0));
        assert!(rms(&out[half..2 * half]) > 0.5);
        assert!(out[2 * half..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_detune_shifts_pitch_by_cents() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 1_000.0);
        graph
            .param_mut(ParamRef::new(osc, ParamKind::Detune))
            .unwrap()
            .set_value(1_200.0);
        graph.connect(osc, graph.destination()).unwrap();
        graph.start(osc, 0.0).unwrap();

        // one octave up: 2000 Hz => 2000 rising zero crossings per second
        let out = render(&mut graph, RATE as usize);
        let crossings = out.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((1_995..=2_005).contains(&crossings), "crossings {crossings}");
    }

    #[test]
    fn test_lowpass_attenuates_above_cutoff() {
        let measure = |freq: f32| {
            let mut graph = Graph::new(RATE);
            let osc = graph.create_oscillator(Waveform::Sine, freq);
            let filter = graph.create_lowpass(800.0);
            graph.connect(osc, filter).unwrap();
            graph.connect(filter, graph.destination()).unwrap();
            graph.start(osc, 0.0).unwrap();
            let out = render(&mut graph, RATE as usize / 2);
            rms(&out[RATE as usize / 4..])
        };
        let pass = measure(200.0);
        let reject = measure(6_000.0);
        assert!(pass > 0.65, "pass band rms {pass}");
        assert!(reject < 0.05, "stop band rms {reject}");
    }

    #[test]
    fn test_param_modulation_adds_to_value() {
        let mut graph = Graph::new(RATE);
        let carrier = graph.create_oscillator(Waveform::Sine, 500.0);
        let vca = graph.create_gain(0.0);
        let lfo = graph.create_oscillator(Waveform::Sine, 1.0);
        let depth = graph.create_gain(0.5);
        graph.connect(carrier, vca).unwrap();
        graph.connect(vca, graph.destination()).unwrap();
        graph.connect(lfo, depth).unwrap();
        graph.connect_param(depth, ParamRef::new(vca, ParamKind::Gain)).unwrap();
        graph.start(carrier, 0.0).unwrap();
        graph.start(lfo, 0.0).unwrap();

        // without modulation the gain is zero, so any signal comes from the LFO path
        let out = render(&mut graph, RATE as usize);
        assert!(rms(&out) > 0.1);
    }

    #[test]
    fn test_connect_param_rejects_missing_param() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 1.0);
        let gain = graph.create_gain(1.0);
        let err = graph.connect_param(gain, ParamRef::new(osc, ParamKind::Cutoff));
        assert!(matches!(err, Err(AudioError::SynthesisFailure(_))));
    }

    #[test]
    fn test_buffer_source_plays_samples_in_order() {
        let mut graph = Graph::new(RATE);
        let buffer = Arc::new(AudioBuffer::mono(vec![0.25, -0.5, 0.75], RATE));
        let source = graph.create_buffer_source(buffer).unwrap();
        graph.connect(source, graph.destination()).unwrap();
        graph.start(source, 0.0).unwrap();

        let out = render(&mut graph, 5);
        assert_eq!(out, vec![0.25, -0.5, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn test_buffer_source_rejects_rate_mismatch() {
        let mut graph = Graph::new(RATE);
        let buffer = Arc::new(AudioBuffer::mono(vec![0.0; 4], 44_100));
        assert!(matches!(
            graph.create_buffer_source(buffer),
            Err(AudioError::SynthesisFailure(_))
        ));
    }

    #[test]
    fn test_start_twice_fails() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 1.0);
        graph.start(osc, 0.0).unwrap();
        assert!(graph.start(osc, 1.0).is_err());
        let gain = graph.create_gain(1.0);
        assert!(graph.start(gain, 0.0).is_err());
    }

    #[test]
    fn test_disconnect_silences_branch() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect(osc, graph.destination()).unwrap();
        graph.start(osc, 0.0).unwrap();
        assert!(rms(&render(&mut graph, 1_000)) > 0.1);

        graph.disconnect(osc);
        assert!(render(&mut graph, 1_000).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_prune_removes_finished_chain() {
        let mut graph = Graph::new(RATE);
        let master = graph.create_gain(1.0);
        graph.connect(master, graph.destination()).unwrap();
        let drone = graph.create_oscillator(Waveform::Sine, 200.0);
        graph.connect(drone, master).unwrap();
        graph.start(drone, 0.0).unwrap();

        let chime = graph.create_oscillator(Waveform::Sine, 880.0);
        let env = graph.create_gain(0.1);
        graph.connect(chime, env).unwrap();
        graph.connect(env, master).unwrap();
        graph.start(chime, 0.0).unwrap();
        graph.stop(chime, 0.5).unwrap();

        assert_eq!(graph.prune_finished(0.25), 0);
        assert_eq!(graph.prune_finished(1.0), 2);
        assert!(!graph.contains(chime));
        assert!(!graph.contains(env));
        assert!(graph.contains(master));
        assert!(graph.contains(drone));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_clear_keeps_destination() {
        let mut graph = Graph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0);
        graph.connect(osc, graph.destination()).unwrap();
        graph.clear();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.contains(graph.destination()));
        assert!(render(&mut graph, 10).iter().all(|s| *s == 0.0));
    }
}
