//! Audio pipeline for the virtual temple: PCM/WAV codec, a small
//! sample-accurate node graph, the procedural ambience engine, live playback
//! control and the offline export mixdown.

pub mod ambient;
pub mod buffer;
pub mod context;
pub mod controller;
pub mod decode;
pub mod error;
pub mod graph;
pub mod mixdown;
pub mod param;
pub mod sink;
pub mod wav;

pub use ambient::{build_ambient_graph, AmbientGraphHandle};
pub use buffer::AudioBuffer;
pub use context::{AudioContext, ContextState, OfflineContext, RealtimeContext, RecurringJob};
pub use controller::{AmbientController, PlaybackState, SinkFactory};
pub use decode::{decode_base64_pcm, decode_raw_to_buffer};
pub use error::AudioError;
pub use graph::{Graph, NodeId, ParamKind, ParamRef, Waveform};
pub use mixdown::{download_file_name, ExportOutcome, MixdownPipeline, SPEECH_ONLY_FILE_NAME};
pub use param::AudioParam;
pub use sink::{AudioSink, BroadcastSink, CaptureSink, NullSink};
pub use wav::{encode_buffer_to_wav, encode_raw_to_wav, WavHeader};

/// Rate of the speech service's PCM output and of every buffer, context and
/// WAV the pipeline produces.
pub const PIPELINE_SAMPLE_RATE: u32 = 24_000;
