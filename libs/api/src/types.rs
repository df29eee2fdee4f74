use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// Стратегия поведения при переполнении bounded канала подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// try_send(): если канал полон — дропнуть сообщение, залогировать.
    Drop,
    /// .send().await: ждать пока появится место (back-pressure).
    #[default]
    #[serde(alias = "backpressure")]
    BackPressure,
}

// ════════════════════════════════════════════════════════════════
//  Message
// ════════════════════════════════════════════════════════════════

/// Unit sent to a topic: opaque body plus string metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub body: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Body as UTF-8, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

// ════════════════════════════════════════════════════════════════
//  Attestation data model
// ════════════════════════════════════════════════════════════════

/// Identity of the unit of work an attestation was produced for.
/// Used for diagnostics only, never for routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Owning resource kind, e.g. `TaskRun` or `PipelineRun`.
    pub kind: String,
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
}

impl RunIdentity {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            uid: None,
        }
    }

    pub fn task_run(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new("TaskRun", namespace, name)
    }
}

impl std::fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Tag naming the encoding of an attestation payload (`in-toto`, `slsa/v1`, ...).
///
/// Carried through untouched; unknown tags are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadFormat(String);

impl PayloadFormat {
    pub const IN_TOTO: &'static str = "in-toto";
    pub const SLSA_V1: &'static str = "slsa/v1";
    pub const SLSA_V2_ALPHA2: &'static str = "slsa/v2alpha2";
    pub const SLSA_V2_ALPHA3: &'static str = "slsa/v2alpha3";
    pub const SLSA_V2_ALPHA4: &'static str = "slsa/v2alpha4";
    pub const SIMPLE_SIGNING: &'static str = "simplesigning";
    pub const TEKTON: &'static str = "tekton";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn in_toto() -> Self {
        Self::new(Self::IN_TOTO)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the tags shipped formatters produce.
    pub fn is_well_known(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::IN_TOTO
                | Self::SLSA_V1
                | Self::SLSA_V2_ALPHA2
                | Self::SLSA_V2_ALPHA3
                | Self::SLSA_V2_ALPHA4
                | Self::SIMPLE_SIGNING
                | Self::TEKTON
        )
    }
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PayloadFormat {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PayloadFormat {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Options accompanying each store call.
///
/// Only `payload_format` is consumed by the pub/sub backend; the rest
/// is what other storage backends use to address signed artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageOpts {
    pub payload_format: PayloadFormat,
    #[serde(default)]
    pub full_key: String,
    #[serde(default)]
    pub short_key: String,
    #[serde(default)]
    pub cert: String,
    #[serde(default)]
    pub chain: String,
}

impl StorageOpts {
    pub fn with_format(format: impl Into<PayloadFormat>) -> Self {
        Self {
            payload_format: format.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_identity_display() {
        let run = RunIdentity::task_run("bar", "foo");
        assert_eq!(run.to_string(), "TaskRun bar/foo");
    }

    #[test]
    fn payload_format_passthrough() {
        let fmt = PayloadFormat::from("custom/v9");
        assert!(!fmt.is_well_known());
        assert_eq!(fmt.as_str(), "custom/v9");
        assert!(PayloadFormat::in_toto().is_well_known());
    }

    #[test]
    fn storage_opts_from_json() {
        let opts: StorageOpts = serde_json::from_str(r#"{"payload_format":"in-toto"}"#).unwrap();
        assert_eq!(opts, StorageOpts::with_format("in-toto"));
    }

    #[test]
    fn overflow_policy_aliases() {
        let p: OverflowPolicy = serde_json::from_str(r#""backpressure""#).unwrap();
        assert_eq!(p, OverflowPolicy::BackPressure);
        let p: OverflowPolicy = serde_json::from_str(r#""drop""#).unwrap();
        assert_eq!(p, OverflowPolicy::Drop);
    }
}
