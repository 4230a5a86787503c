pub mod convert;
pub mod wav;

pub use convert::{AudioConversionError, convert_to_wav, separate_vocals};
pub use wav::{read_wav_samples, resample_linear, wav_duration_secs};
