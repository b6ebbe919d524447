pub mod backend;
pub mod file;
pub mod resample;
pub mod stream;
pub mod wav;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, MutedBackend,
};
pub use file::{AudioFile, FileBackend};
pub use resample::resample_interleaved;
pub use stream::LiveStream;
pub use wav::{decode_wav, encode_wav, WAV_HEADER_BYTES};
