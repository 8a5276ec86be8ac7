use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdeaRequest {
    #[serde(default)]
    pub idea: Option<String>,
}

impl IdeaRequest {
    /// Extract the idea from an arbitrary JSON body. Non-string values count
    /// as missing.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        Self {
            idea: payload
                .get("idea")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
        }
    }
}

/// The four fields the model is instructed to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchArtifact {
    pub pitch: String,
    pub landing_page_html: String,
    pub tech_stack: String,
    /// Three entries by convention; the count is not enforced.
    pub core_features: Vec<String>,
}

/// A parsed artifact plus the metadata attached before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    #[serde(flatten)]
    pub artifact: PitchArtifact,
    pub idea: String,
    pub timestamp: DateTime<Utc>,
}

impl GeneratedArtifact {
    pub fn new(artifact: PitchArtifact, idea: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            artifact,
            idea: idea.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PitchArtifact {
        PitchArtifact {
            pitch: "Dog walkers on demand.".to_string(),
            landing_page_html: "<h1 style=\"color:red\">Walkr</h1>".to_string(),
            tech_stack: "Rust, Postgres".to_string(),
            core_features: vec!["Booking".into(), "Tracking".into(), "Reviews".into()],
        }
    }

    #[test]
    fn test_generated_artifact_serializes_flat() {
        let generated = GeneratedArtifact::new(sample(), "uber for dogs", Utc::now());
        let value = serde_json::to_value(&generated).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["core_features", "idea", "landing_page_html", "pitch", "tech_stack", "timestamp"]
        );
        assert_eq!(obj["idea"], "uber for dogs");
        assert_eq!(obj["core_features"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_core_features_length_not_enforced() {
        let parsed: PitchArtifact = serde_json::from_str(
            r#"{"pitch":"p","landing_page_html":"h","tech_stack":"t","core_features":["only one"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.core_features, vec!["only one".to_string()]);
    }

    #[test]
    fn test_idea_request_tolerates_missing_field() {
        let req: IdeaRequest = serde_json::from_str("{}").unwrap();
        assert!(req.idea.is_none());
    }

    #[test]
    fn test_from_payload_ignores_non_string_idea() {
        let req = IdeaRequest::from_payload(&serde_json::json!({"idea": 42}));
        assert!(req.idea.is_none());

        let req = IdeaRequest::from_payload(&serde_json::json!({"idea": "a todo app"}));
        assert_eq!(req.idea.as_deref(), Some("a todo app"));

        let req = IdeaRequest::from_payload(&serde_json::json!(["idea"]));
        assert!(req.idea.is_none());
    }
}
