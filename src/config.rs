use anyhow::Result;
use serde::Deserialize;

/// Environment variables override file settings, e.g. `NUANCE_TRANSCRIBE__NATS__URL`.
pub const ENV_PREFIX: &str = "NUANCE_TRANSCRIBE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    #[serde(default)]
    pub transcribe: TranscribeConfig,
    #[serde(default)]
    pub subjects: SubjectsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

/// Settings that shape the events and commands of every session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    /// Value of the `transcription-vendor` header on every event
    pub vendor: String,

    /// Bug-name used when a command omits one
    pub default_bug_name: String,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            vendor: "nuance".to_string(),
            default_bug_name: crate::control::DEFAULT_BUG_NAME.to_string(),
        }
    }
}

/// Subject prefixes used by the NATS adapters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubjectsConfig {
    /// `<calls>.<call-id>.{locate,pre_answer,attach,detach,queue}`
    pub calls: String,

    /// `<media>.<call-id>.<bug-name>` carries intercepted audio
    pub media: String,

    /// `<events>.<call-id>` carries normalized transcription events
    pub events: String,

    /// `<recognizer_audio>.<stream-id>` carries audio towards the recognizer
    pub recognizer_audio: String,

    /// `<recognizer_signals>.<stream-id>` carries recognizer signals back
    pub recognizer_signals: String,
}

impl Default for SubjectsConfig {
    fn default() -> Self {
        Self {
            calls: "freeswitch.call".to_string(),
            media: "freeswitch.media".to_string(),
            events: "freeswitch.event".to_string(),
            recognizer_audio: "nuance.audio".to_string(),
            recognizer_signals: "nuance.signal".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_applies_defaults_for_optional_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[service]
name = "transcriber"

[service.http]
bind = "0.0.0.0"
port = 9000

[nats]
url = "nats://bus:4222"

[subjects]
events = "pbx.event"
"#
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(cfg.service.name, "transcriber");
        assert_eq!(cfg.service.http.port, 9000);
        assert_eq!(cfg.nats.url, "nats://bus:4222");
        assert_eq!(cfg.transcribe.vendor, "nuance");
        assert_eq!(cfg.transcribe.default_bug_name, "nuance_transcribe");
        assert_eq!(cfg.subjects.events, "pbx.event");
        assert_eq!(cfg.subjects.calls, "freeswitch.call");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(Config::load(path.to_str().unwrap()).is_err());
    }
}
