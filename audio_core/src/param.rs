//! Automatable node parameters.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    SetValue { value: f32, time: f64 },
    LinearRamp { value: f32, end: f64 },
    ExponentialRamp { value: f32, end: f64 },
}

impl Automation {
    fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. } => time,
            Automation::LinearRamp { end, .. } => end,
            Automation::ExponentialRamp { end, .. } => end,
        }
    }
}

/// A parameter with an intrinsic value and a time-ordered automation list.
///
/// Ramps start from the value and time of the preceding event (or the
/// intrinsic value at time zero). Modulation from connected nodes is added
/// by the graph on top of [`AudioParam::value_at`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParam {
    value: f32,
    events: Vec<Automation>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    /// Intrinsic value, used before the first automation event.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Automation::SetValue { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end: f64) {
        self.insert(Automation::LinearRamp { value, end });
    }

    /// Exponential ramp. Segments whose endpoints touch zero or differ in
    /// sign hold the starting value until `end`.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, end: f64) {
        self.insert(Automation::ExponentialRamp { value, end });
    }

    /// Drop every event at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.events.retain(|e| e.time() < from);
    }

    /// Glide from the current value to `target` over `duration` seconds,
    /// replacing whatever was scheduled after `now`.
    ///
    /// Events before `now` are folded into the intrinsic value, so the
    /// timeline holds two events however often this is called. Values from
    /// `now` on are the same as with the full history kept.
    pub fn ramp_to(&mut self, target: f32, now: f64, duration: f64) {
        let current = self.value_at(now);
        self.value = current;
        self.events.clear();
        self.set_value_at_time(current, now);
        self.linear_ramp_to_value_at_time(target, now + duration);
    }

    pub fn is_automated(&self) -> bool {
        !self.events.is_empty()
    }

    fn insert(&mut self, event: Automation) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }

    /// Automated value at time `t` (seconds).
    pub fn value_at(&self, t: f64) -> f32 {
        let mut value = self.value;
        let mut anchor = 0.0_f64;

        for event in &self.events {
            match *event {
                Automation::SetValue { value: v, time } => {
                    if t < time {
                        return value;
                    }
                    value = v;
                    anchor = time;
                }
                Automation::LinearRamp { value: v, end } => {
                    if t < end {
                        let progress = ((t - anchor) / (end - anchor)) as f32;
                        return value + (v - value) * progress;
                    }
                    value = v;
                    anchor = end;
                }
                Automation::ExponentialRamp { value: v, end } => {
                    if t < end {
                        if value == 0.0 || v == 0.0 || (value < 0.0) != (v < 0.0) {
                            return value;
                        }
                        let progress = ((t - anchor) / (end - anchor)) as f32;
                        return value * (v / value).powf(progress);
                    }
                    value = v;
                    anchor = end;
                }
            }
        }

        value
    }
}
