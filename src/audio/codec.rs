use serde::{Deserialize, Serialize};

/// Negotiated read codec of a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecInfo {
    /// IANA codec name as negotiated (e.g. "PCMU", "G722", "opus")
    pub iana_name: String,

    /// Nominal (RTP clock) sample rate
    pub samples_per_second: u32,

    /// Rate of the decoded audio actually handed to the interceptor
    pub actual_samples_per_second: u32,
}

impl CodecInfo {
    pub fn new(iana_name: impl Into<String>, samples_per_second: u32, actual_samples_per_second: u32) -> Self {
        Self {
            iana_name: iana_name.into(),
            samples_per_second,
            actual_samples_per_second,
        }
    }

    /// Sample rate the recognizer must be told about.
    ///
    /// G.722 advertises an 8kHz RTP clock but decodes to 16kHz, so the
    /// actual rate wins for it.
    pub fn effective_sample_rate(&self) -> u32 {
        if self.iana_name.eq_ignore_ascii_case("g722") {
            self.actual_samples_per_second
        } else {
            self.samples_per_second
        }
    }
}

impl Default for CodecInfo {
    fn default() -> Self {
        Self::new("PCMU", 8000, 8000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_rate_for_narrowband() {
        assert_eq!(CodecInfo::new("PCMU", 8000, 8000).effective_sample_rate(), 8000);
    }

    #[test]
    fn test_g722_uses_actual_rate() {
        assert_eq!(CodecInfo::new("G722", 8000, 16000).effective_sample_rate(), 16000);
        assert_eq!(CodecInfo::new("g722", 8000, 16000).effective_sample_rate(), 16000);
    }

    #[test]
    fn test_other_wideband_uses_nominal_rate() {
        assert_eq!(CodecInfo::new("opus", 48000, 16000).effective_sample_rate(), 48000);
    }
}
