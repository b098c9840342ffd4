/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since interception started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Build a frame from little-endian PCM bytes. A trailing odd byte is ignored.
    pub fn from_pcm_bytes(bytes: &[u8], sample_rate: u32, channels: u16, timestamp_ms: u64) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();

        Self {
            samples,
            sample_rate,
            channels,
            timestamp_ms,
        }
    }

    /// Little-endian PCM bytes
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Frame duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        per_channel * 1000 / self.sample_rate as u64
    }
}
