//! Assignment of extracted words to topic clusters.
//!
//! The candidate vocabulary comes from the store (survey/template scope first,
//! then global clusters, then the `Other` sentinel). One classifier request is
//! made per answer and its reply goes through an ordered chain of parsers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::classifier::{TextClassifier, extract_json};
use crate::error::Result;
use crate::model::{Cluster, OTHER_CLUSTER, Survey, SurveyId};
use crate::store::Store;

/// Word (lemma) to cluster name. Missing words count as `Other`.
pub type ClusterMapping = HashMap<String, String>;

type ParseStrategy = fn(&Value, &[String]) -> Option<ClusterMapping>;

/// Tried in order; the first strategy returning `Some` wins.
const PARSE_STRATEGIES: [(&str, ParseStrategy); 3] = [
    ("assignment_list", parse_assignment_list),
    ("flat_mapping", parse_flat_mapping),
    ("single_cluster", parse_single_cluster),
];

const LIST_KEYS: [&str; 5] = ["assignments", "words", "results", "classifications", "items"];
const WORD_KEYS: [&str; 2] = ["word", "term"];
const CLUSTER_KEYS: [&str; 4] = ["assigned_cluster", "cluster", "cluster_name", "topic"];

const CLUSTER_INSTRUCTIONS: &str = "You group words from a customer survey answer into topic \
clusters. Assign every word in `words` to exactly one name from `clusters`, using the answer \
text for context. Use \"Other\" when nothing fits. Respond with JSON only: \
{\"assignments\": [{\"word\": \"...\", \"assigned_cluster\": \"...\"}]}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Active clusters scoped to the survey or its template.
    Scoped,
    /// All active global clusters.
    Global,
    /// Nothing available; only the `Other` sentinel.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateClusters {
    pub source: CandidateSource,
    pub names: Vec<String>,
}

/// Candidate names offered to the classifier for `survey`, in cluster id order.
pub fn resolve_candidates(clusters: &[Cluster], survey: Option<&Survey>) -> CandidateClusters {
    let mut active: Vec<&Cluster> = clusters.iter().filter(|c| c.is_active).collect();
    active.sort_by_key(|c| c.id);

    if let Some(survey) = survey {
        let scoped: Vec<String> = active
            .iter()
            .filter(|c| c.is_scoped_to(survey))
            .map(|c| c.name.clone())
            .collect();
        if !scoped.is_empty() {
            return CandidateClusters {
                source: CandidateSource::Scoped,
                names: scoped,
            };
        }
    }

    let global: Vec<String> = active
        .iter()
        .filter(|c| c.is_global())
        .map(|c| c.name.clone())
        .collect();
    if !global.is_empty() {
        return CandidateClusters {
            source: CandidateSource::Global,
            names: global,
        };
    }

    CandidateClusters {
        source: CandidateSource::Fallback,
        names: vec![OTHER_CLUSTER.to_string()],
    }
}

pub struct ClusterAssigner {
    classifier: Arc<dyn TextClassifier>,
}

impl ClusterAssigner {
    pub fn new(classifier: Arc<dyn TextClassifier>) -> Self {
        ClusterAssigner { classifier }
    }

    /// Maps `words` onto cluster names with a single classifier call.
    ///
    /// With no real candidates every word goes to `Other` without a call.
    /// Call failures and unparseable replies give an empty mapping.
    pub fn assign(
        &self,
        text: &str,
        words: &[String],
        language: &str,
        candidates: &[String],
    ) -> ClusterMapping {
        let words = unique_words(words);
        if words.is_empty() {
            return ClusterMapping::new();
        }
        if candidates.iter().all(|c| c == OTHER_CLUSTER) {
            return words
                .into_iter()
                .map(|w| (w, OTHER_CLUSTER.to_string()))
                .collect();
        }

        let payload = json!({
            "language": language,
            "text": text,
            "words": words,
            "clusters": candidates,
        })
        .to_string();

        let raw = match self.classifier.complete(CLUSTER_INSTRUCTIONS, &payload) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cluster assignment request failed: {}", e);
                return ClusterMapping::new();
            }
        };

        let mapping = parse_cluster_response(&raw, &words);
        let known: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        for name in mapping.values().collect::<HashSet<_>>() {
            if !known.contains(name.as_str()) {
                warn!("Classifier returned cluster '{}' outside the candidate list", name);
            }
        }
        mapping
    }

    /// Classifies a word list against the candidates of `survey_id`, or the
    /// global vocabulary when no survey is given. Every word appears in the result.
    pub fn classify(
        &self,
        store: &dyn Store,
        survey_id: Option<SurveyId>,
        text: &str,
        words: &[String],
        language: &str,
    ) -> Result<ClusterMapping> {
        let survey = survey_id.map(|id| store.survey(id)).transpose()?;
        let candidates = resolve_candidates(&store.clusters()?, survey.as_ref());
        let mut mapping = self.assign(text, words, language, &candidates.names);
        for word in unique_words(words) {
            mapping
                .entry(word)
                .or_insert_with(|| OTHER_CLUSTER.to_string());
        }
        Ok(mapping)
    }
}

fn unique_words(words: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .iter()
        .filter(|w| seen.insert(w.as_str()))
        .cloned()
        .collect()
}

/// Runs the parser chain over a raw classifier reply.
pub fn parse_cluster_response(raw: &str, words: &[String]) -> ClusterMapping {
    let Some(value) = extract_json(raw) else {
        warn!("Cluster response is not JSON ({} bytes)", raw.len());
        return ClusterMapping::new();
    };
    for (name, strategy) in PARSE_STRATEGIES {
        if let Some(mapping) = strategy(&value, words) {
            debug!("Cluster response parsed by {} ({} words)", name, mapping.len());
            return mapping;
        }
    }
    warn!("No parser accepted the cluster response");
    ClusterMapping::new()
}

/// `[{word, assigned_cluster}]`, bare or under a list key.
fn parse_assignment_list(value: &Value, words: &[String]) -> Option<ClusterMapping> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))?,
        _ => return None,
    };

    let mut mapping = ClusterMapping::new();
    for item in items.iter().filter_map(Value::as_object) {
        let word = first_str(item, &WORD_KEYS);
        let cluster = first_str(item, &CLUSTER_KEYS);
        let (Some(word), Some(cluster)) = (word, cluster) else {
            continue;
        };
        if let (Some(word), Some(cluster)) = (match_word(word, words), clean_name(cluster)) {
            mapping.insert(word, cluster);
        }
    }
    (!mapping.is_empty()).then_some(mapping)
}

/// `{word: cluster}`, bare or under a list key.
fn parse_flat_mapping(value: &Value, words: &[String]) -> Option<ClusterMapping> {
    let map = value.as_object()?;
    let source = LIST_KEYS
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_object))
        .unwrap_or(map);

    let mapping: ClusterMapping = source
        .iter()
        .filter_map(|(word, cluster)| {
            Some((match_word(word, words)?, clean_name(cluster.as_str()?)?))
        })
        .collect();
    (!mapping.is_empty()).then_some(mapping)
}

/// A lone cluster name (a JSON string, or an object whose only field is a
/// cluster key) applied to every word.
fn parse_single_cluster(value: &Value, words: &[String]) -> Option<ClusterMapping> {
    let name = match value {
        Value::String(name) => name.as_str(),
        Value::Object(map) if map.len() == 1 => first_str(map, &CLUSTER_KEYS)?,
        _ => return None,
    };
    let name = clean_name(name)?;
    Some(words.iter().map(|w| (w.clone(), name.clone())).collect())
}

fn first_str<'a>(item: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| item.get(*k).and_then(Value::as_str))
}

fn match_word(candidate: &str, words: &[String]) -> Option<String> {
    let candidate = candidate.trim().to_lowercase();
    words.iter().find(|w| **w == candidate).cloned()
}

fn clean_name(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::MockTextClassifier;
    use crate::error::ClassifierError;

    fn words() -> Vec<String> {
        vec!["staff".to_string(), "pool".to_string(), "price".to_string()]
    }

    fn cluster(id: u64, name: &str) -> Cluster {
        Cluster {
            id,
            name: name.to_string(),
            keywords: Vec::new(),
            is_active: true,
            owner: "alice".to_string(),
            template_id: None,
            survey_id: None,
            word_count: 0,
            last_processed: None,
        }
    }

    fn survey() -> Survey {
        Survey {
            id: 1,
            title: "Hotel".to_string(),
            creator: "alice".to_string(),
            template_id: Some(5),
        }
    }

    #[test]
    fn candidates_prefer_scoped_then_global_then_other() {
        let mut scoped = cluster(3, "Rooms");
        scoped.template_id = Some(5);
        let mut inactive = cluster(4, "Old");
        inactive.is_active = false;
        let all = vec![cluster(2, "Service"), scoped, inactive, cluster(1, "Price")];

        let c = resolve_candidates(&all, Some(&survey()));
        assert_eq!(c.source, CandidateSource::Scoped);
        assert_eq!(c.names, vec!["Rooms"]);

        let c = resolve_candidates(&all, None);
        assert_eq!(c.source, CandidateSource::Global);
        assert_eq!(c.names, vec!["Price", "Service"]);

        let c = resolve_candidates(&[], Some(&survey()));
        assert_eq!(c.source, CandidateSource::Fallback);
        assert_eq!(c.names, vec![OTHER_CLUSTER]);
    }

    #[test]
    fn parses_assignment_list() {
        let raw = r#"{"assignments": [
            {"word": "staff", "assigned_cluster": "Service"},
            {"word": "POOL", "cluster": "Facilities"},
            {"word": "unrelated", "assigned_cluster": "Service"},
            "junk"
        ]}"#;
        let m = parse_cluster_response(raw, &words());
        assert_eq!(m.len(), 2);
        assert_eq!(m["staff"], "Service");
        assert_eq!(m["pool"], "Facilities");
    }

    #[test]
    fn parses_flat_mapping() {
        let raw = r#"{"staff": "Service", "price": " Value "}"#;
        let m = parse_cluster_response(raw, &words());
        assert_eq!(m["staff"], "Service");
        assert_eq!(m["price"], "Value");
        assert!(!m.contains_key("pool"));
    }

    #[test]
    fn single_cluster_applies_to_every_word() {
        let m = parse_cluster_response(r#"{"cluster": "Service"}"#, &words());
        assert_eq!(m.len(), 3);
        assert!(m.values().all(|c| c == "Service"));
        let m = parse_cluster_response(r#""Facilities""#, &words());
        assert!(m.values().all(|c| c == "Facilities"));
    }

    #[test]
    fn unparseable_gives_empty_mapping() {
        assert!(parse_cluster_response("I cannot help with that", &words()).is_empty());
        assert!(parse_cluster_response(r#"{"a": 1, "b": 2}"#, &words()).is_empty());
        assert!(parse_cluster_response(r#"{"assignments": []}"#, &words()).is_empty());
    }

    #[test]
    fn error_object_is_not_a_cluster_name() {
        let raw = r#"{"error": "rate limit exceeded"}"#;
        assert!(parse_cluster_response(raw, &words()).is_empty());
        let m = parse_cluster_response(r#"{"topic": "Service"}"#, &words());
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn no_candidates_means_other_without_a_call() {
        let mut mock = MockTextClassifier::new();
        mock.expect_complete().times(0);
        let assigner = ClusterAssigner::new(Arc::new(mock));
        let m = assigner.assign("text", &words(), "en", &[]);
        assert_eq!(m.len(), 3);
        assert!(m.values().all(|c| c == OTHER_CLUSTER));
        let m = assigner.assign("text", &words(), "en", &[OTHER_CLUSTER.to_string()]);
        assert!(m.values().all(|c| c == OTHER_CLUSTER));
    }

    #[test]
    fn call_failure_gives_empty_mapping() {
        let mut mock = MockTextClassifier::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(ClassifierError::NotConfigured));
        let assigner = ClusterAssigner::new(Arc::new(mock));
        let m = assigner.assign("text", &words(), "en", &["Service".to_string()]);
        assert!(m.is_empty());
    }

    #[test]
    fn payload_carries_words_and_candidates() {
        let mut mock = MockTextClassifier::new();
        mock.expect_complete()
            .withf(|_, payload| {
                let v: Value = serde_json::from_str(payload).unwrap();
                v["words"].as_array().map(Vec::len) == Some(2) && v["clusters"][0] == "Service"
            })
            .times(1)
            .returning(|_, _| Ok(r#"{"staff": "Service"}"#.to_string()));
        let assigner = ClusterAssigner::new(Arc::new(mock));
        let dup = vec!["staff".to_string(), "staff".to_string(), "pool".to_string()];
        let m = assigner.assign("Nice staff, cold pool", &dup, "en", &["Service".to_string()]);
        assert_eq!(m.len(), 1);
        assert_eq!(m["staff"], "Service");
    }
}
