//! Artifact download and final video assembly.

mod config;
mod error;
mod ffmpeg;
mod traits;

pub use config::AssemblerConfig;
pub use error::AssemblerError;
pub use ffmpeg::FfmpegAssembler;
pub use traits::Assembler;
