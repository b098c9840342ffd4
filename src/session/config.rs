use crate::call::VariableStore;
use serde::{Deserialize, Serialize};

/// Call variables read when a session starts
pub mod vars {
    pub const SINGLE_UTTERANCE: &str = "NUANCE_SPEECH_SINGLE_UTTERANCE";
    pub const SEPARATE_RECOGNITION_PER_CHANNEL: &str =
        "NUANCE_SPEECH_SEPARATE_RECOGNITION_PER_CHANNEL";
    pub const MAX_ALTERNATIVES: &str = "NUANCE_SPEECH_MAX_ALTERNATIVES";
    pub const PROFANITY_FILTER: &str = "NUANCE_SPEECH_PROFANITY_FILTER";
    pub const ENABLE_WORD_TIME_OFFSETS: &str = "NUANCE_SPEECH_ENABLE_WORD_TIME_OFFSETS";
    pub const ENABLE_AUTOMATIC_PUNCTUATION: &str = "NUANCE_SPEECH_ENABLE_AUTOMATIC_PUNCTUATION";
    pub const MODEL: &str = "NUANCE_SPEECH_MODEL";
    pub const USE_ENHANCED: &str = "NUANCE_SPEECH_USE_ENHANCED";
    pub const HINTS: &str = "NUANCE_SPEECH_HINTS";
}

/// Recognition settings for one session, fixed once resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// BCP-47 language code (e.g. "en-US")
    pub language: String,

    /// Emit partial results while the caller is still talking
    pub interim_results: bool,

    /// 1 = caller only, 2 = caller and callee interleaved
    pub channels: u16,

    /// Sample rate of the audio the interceptor delivers
    pub sample_rate: u32,

    pub single_utterance: bool,
    pub separate_recognition_per_channel: bool,
    pub max_alternatives: u32,
    pub profanity_filter: bool,
    pub word_time_offsets: bool,
    pub automatic_punctuation: bool,
    pub model: Option<String>,
    pub use_enhanced: bool,

    /// Phrase hints; owned copies of the call variable
    pub hints: Vec<String>,
}

impl SessionConfig {
    /// Config with every optional feature at its default
    pub fn new(language: impl Into<String>, interim_results: bool, channels: u16, sample_rate: u32) -> Self {
        Self {
            language: language.into(),
            interim_results,
            channels,
            sample_rate,
            single_utterance: false,
            separate_recognition_per_channel: false,
            max_alternatives: 0,
            profanity_filter: false,
            word_time_offsets: false,
            automatic_punctuation: false,
            model: None,
            use_enhanced: false,
            hints: Vec::new(),
        }
    }

    /// Resolve optional features from call variables.
    ///
    /// Each feature looks only at its own variable; absent or false means the
    /// default. Pure read: nothing is written back to the call.
    pub fn resolve<V: VariableStore + ?Sized>(
        vars: &V,
        language: impl Into<String>,
        interim_results: bool,
        channels: u16,
        sample_rate: u32,
    ) -> Self {
        let flag = |name: &str| vars.variable(name).is_some_and(|v| is_true(&v));
        let text = |name: &str| vars.variable(name).filter(|v| !v.trim().is_empty());

        let max_alternatives = vars
            .variable(vars::MAX_ALTERNATIVES)
            .filter(|v| is_true(v))
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        let hints = text(vars::HINTS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            single_utterance: flag(vars::SINGLE_UTTERANCE),
            separate_recognition_per_channel: flag(vars::SEPARATE_RECOGNITION_PER_CHANNEL),
            max_alternatives,
            profanity_filter: flag(vars::PROFANITY_FILTER),
            word_time_offsets: flag(vars::ENABLE_WORD_TIME_OFFSETS),
            automatic_punctuation: flag(vars::ENABLE_AUTOMATIC_PUNCTUATION),
            model: text(vars::MODEL).map(|v| v.trim().to_string()),
            use_enhanced: flag(vars::USE_ENHANCED),
            hints,
            ..Self::new(language, interim_results, channels, sample_rate)
        }
    }
}

/// Host truthiness: yes/on/true/t/enabled/active/allow, or a non-zero integer
pub fn is_true(value: &str) -> bool {
    let value = value.trim();
    const TRUTHY: [&str; 7] = ["yes", "on", "true", "t", "enabled", "active", "allow"];

    TRUTHY.iter().any(|t| value.eq_ignore_ascii_case(t))
        || value.parse::<i64>().map(|n| n != 0).unwrap_or(false)
}
