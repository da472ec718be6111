use std::collections::HashMap;

use serde::Deserialize;

const PLACEHOLDER: &str = "{condition}";

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to locate knowledge base: {0}")]
    Location(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid knowledge entry `{key}`: empty {field}")]
    InvalidEntry { key: String, field: &'static str },
}

/// Hand-authored prose for one condition. Entries are data loaded at
/// startup; the normalizer stays free of per-condition branching.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeEntry {
    pub name: String,
    pub advice: String,
    pub overview: String,
    pub urgency_note: String,
    pub care: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub treatments: Vec<String>,
}

impl KnowledgeEntry {
    /// Substitute the detected label into the placeholder slots of a
    /// template entry (used for the fallback).
    fn instantiate(&self, label: &str) -> KnowledgeEntry {
        let fill = |text: &str| text.replace(PLACEHOLDER, label);
        KnowledgeEntry {
            name: fill(&self.name),
            advice: fill(&self.advice),
            overview: fill(&self.overview),
            urgency_note: fill(&self.urgency_note),
            care: fill(&self.care),
            symptoms: self.symptoms.clone(),
            causes: self.causes.clone(),
            treatments: self.treatments.clone(),
        }
    }

    fn check(&self, key: &str) -> Result<(), KnowledgeError> {
        let invalid = |field| KnowledgeError::InvalidEntry {
            key: key.to_string(),
            field,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name"));
        }
        if self.advice.trim().is_empty() {
            return Err(invalid("advice"));
        }
        if self.overview.trim().is_empty() {
            return Err(invalid("overview"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionGroup {
    pub key: String,
    pub similar: Vec<String>,
}

/// Read-only condition knowledge, loaded once from the YAML artifact.
#[derive(Debug, Deserialize)]
pub struct KnowledgeBase {
    conditions: HashMap<String, KnowledgeEntry>,
    fallback: KnowledgeEntry,
    no_detection: KnowledgeEntry,
    groups: Vec<ConditionGroup>,
    similar_fallback: Vec<String>,
    previsit_care: Vec<String>,
    visit_preparation: Vec<String>,
}

impl KnowledgeBase {
    pub fn load() -> Result<Self, KnowledgeError> {
        let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
            .map_err(|_| KnowledgeError::Location("CARGO_MANIFEST_DIR is not set".to_string()))?;
        let config_path = format!("{}/../config/conditions.yaml", manifest_dir);
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_string(),
            source,
        })?;
        let base: KnowledgeBase =
            serde_yaml::from_str(&raw).map_err(|source| KnowledgeError::Parse {
                path: path.to_string(),
                source,
            })?;
        base.validate()?;
        Ok(base)
    }

    fn validate(&self) -> Result<(), KnowledgeError> {
        for (key, entry) in &self.conditions {
            entry.check(key)?;
        }
        self.fallback.check("fallback")?;
        self.no_detection.check("no_detection")?;
        if self.similar_fallback.is_empty() {
            return Err(KnowledgeError::InvalidEntry {
                key: "similar_fallback".to_string(),
                field: "list",
            });
        }
        Ok(())
    }

    /// Entry for a provider label, or the fallback entry with the label
    /// substituted verbatim.
    pub fn resolve(&self, label: &str) -> KnowledgeEntry {
        let key = label.to_lowercase();
        match self.conditions.get(&key) {
            Some(entry) => entry.clone(),
            None => self.fallback.instantiate(label),
        }
    }

    pub fn no_detection(&self) -> &KnowledgeEntry {
        &self.no_detection
    }

    /// First group whose key is contained in the lower-cased condition
    /// name; groups are checked in declaration order.
    pub fn similar_conditions(&self, condition: &str) -> Vec<String> {
        let lowered = condition.to_lowercase();
        self.groups
            .iter()
            .find(|group| lowered.contains(&group.key))
            .map(|group| group.similar.clone())
            .unwrap_or_else(|| self.similar_fallback.clone())
    }

    pub fn previsit_care(&self) -> &[String] {
        &self.previsit_care
    }

    pub fn visit_preparation(&self) -> &[String] {
        &self.visit_preparation
    }

    pub fn condition_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .conditions
            .values()
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> KnowledgeBase {
        KnowledgeBase::load().expect("knowledge base should load")
    }

    #[test]
    fn known_labels_resolve_to_display_entries() {
        let kb = base();
        let entry = kb.resolve("acne");
        assert_eq!(entry.name, "Acne");
        assert!(!entry.advice.is_empty());

        // Lookup is case-insensitive on the provider label.
        assert_eq!(kb.resolve("MELANOMA").name, "Melanoma (Suspicious)");
    }

    #[test]
    fn unmapped_labels_fall_back_with_the_label_substituted() {
        let kb = base();
        let entry = kb.resolve("xyz-condition");
        assert_eq!(entry.name, "xyz-condition");
        assert!(entry.overview.contains("xyz-condition"));
        assert!(!entry.advice.is_empty());
    }

    #[test]
    fn similar_conditions_use_first_matching_group() {
        let kb = base();
        assert_eq!(
            kb.similar_conditions("Acne"),
            vec!["rosacea".to_string(), "seborrheic keratoses".to_string()]
        );
        // No group key matches; the differential-diagnosis fallback applies.
        assert_eq!(
            kb.similar_conditions("Melanoma (Suspicious)"),
            vec!["Consult dermatologist for differential diagnosis".to_string()]
        );
    }

    #[test]
    fn catalogue_lists_display_names() {
        let kb = base();
        let names = kb.condition_names();
        assert!(names.contains(&"Acne".to_string()));
        assert!(names.contains(&"Eczema".to_string()));
        assert_eq!(names.len(), kb.condition_count());
    }

    #[test]
    fn empty_advice_is_rejected_at_load_time() {
        let yaml = r#"
conditions:
  acne:
    name: Acne
    advice: ""
    overview: something
    urgency_note: note
    care: care
fallback:
  name: "{condition}"
  advice: a
  overview: o
  urgency_note: u
  care: c
no_detection:
  name: n
  advice: a
  overview: o
  urgency_note: u
  care: c
groups: []
similar_fallback: [see a professional]
previsit_care: []
visit_preparation: []
"#;
        let base: KnowledgeBase = serde_yaml::from_str(yaml).unwrap();
        assert!(base.validate().is_err());
    }
}
