pub mod ffmpeg_backend;
pub mod mjpeg;
pub mod pipeline;
pub mod snapshot_process;
pub mod stream;
pub mod traits;
pub mod workdir;

#[cfg(test)]
pub(crate) mod testing;
