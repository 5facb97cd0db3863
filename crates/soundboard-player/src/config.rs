/// Playback tuning shared by the decode, resample and output stages.
#[derive(Clone, Debug)]
pub struct PlaybackConfig {
    /// Resampler chunk size in frames.
    pub chunk_frames: usize,
    /// Max frames pulled per output callback refill.
    pub refill_max_frames: usize,
    /// Target buffer duration per queue, in seconds.
    pub buffer_seconds: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        // Short clips: keep the buffer small so seeks and stops are heard quickly.
        Self {
            chunk_frames: 1024,
            refill_max_frames: 2048,
            buffer_seconds: 0.5,
        }
    }
}
