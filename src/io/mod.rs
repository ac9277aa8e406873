//! Audio input and output collaborators.

pub mod sink;
pub mod source;
pub mod wav;

pub use sink::{AudioSink, DeviceSink, MemorySink, PcmDevice};
pub use source::{AudioSource, MemorySource};
pub use wav::{read_wav_file, write_wav_file, WavEncoding, WavSink, WavSource};
