//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/answers.sqlite"
//!
//! [corpus]
//! path = "./corpus/go_corpus.md"
//! keyword_entities = "./corpus/go_keyword_entities.txt"
//!
//! [retrieval]
//! k = 3
//! keyword_top_n = 20
//!
//! [intents]
//! min_confidence = 0.3
//! promotion_threshold = 3
//!
//! [[intents.seed]]
//! name = "greeting"
//! phrases = ["hello", "hi"]
//! reply = "Bot: Hello! How can I assist you today?"
//!
//! [schedule]
//! validate_interval_secs = 60
//! retrain_interval_secs = 3600
//! retrain_timeout_secs = 30
//! include_interactions = true
//!
//! [server]
//! bind = "127.0.0.1:8080"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::DEFAULT_MIN_CONFIDENCE;
use crate::discovery::DEFAULT_PROMOTION_THRESHOLD;
use crate::keywords::DEFAULT_TOP_N;
use crate::knn::DEFAULT_K;
use crate::models::Intent;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub intents: IntentsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Line-oriented corpus, one document per line.
    pub path: PathBuf,
    /// Optional `keyword - description` file feeding the topic index.
    #[serde(default)]
    pub keyword_entities: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_keyword_top_n")]
    pub keyword_top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            keyword_top_n: default_keyword_top_n(),
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}
fn default_keyword_top_n() -> usize {
    DEFAULT_TOP_N
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntentsConfig {
    /// Minimum cosine similarity for a classification to count as a match.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: usize,
    #[serde(default = "default_seed_intents")]
    pub seed: Vec<SeedIntent>,
}

impl Default for IntentsConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            promotion_threshold: default_promotion_threshold(),
            seed: default_seed_intents(),
        }
    }
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}
fn default_promotion_threshold() -> usize {
    DEFAULT_PROMOTION_THRESHOLD
}

/// An intent present at startup, optionally with a canned reply.
#[derive(Debug, Deserialize, Clone)]
pub struct SeedIntent {
    pub name: String,
    pub phrases: Vec<String>,
    #[serde(default)]
    pub reply: Option<String>,
}

impl SeedIntent {
    pub fn to_intent(&self) -> Intent {
        Intent::new(self.name.clone(), self.phrases.iter().cloned())
    }
}

fn default_seed_intents() -> Vec<SeedIntent> {
    let seed = |name: &str, phrases: &[&str], reply: Option<&str>| SeedIntent {
        name: name.to_string(),
        phrases: phrases.iter().map(|p| p.to_string()).collect(),
        reply: reply.map(str::to_string),
    };
    vec![
        seed(
            "greeting",
            &["hello", "hi", "how are you", "good morning", "hey"],
            Some("Bot: Hello! How can I assist you today?"),
        ),
        seed(
            "farewell",
            &["bye", "goodbye", "see you later", "take care"],
            Some("Bot: Goodbye! Have a great day!"),
        ),
        seed(
            "help",
            &["help me", "I need assistance", "can you help me"],
            None,
        ),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_validate_interval")]
    pub validate_interval_secs: u64,
    #[serde(default = "default_retrain_interval")]
    pub retrain_interval_secs: u64,
    #[serde(default = "default_retrain_timeout")]
    pub retrain_timeout_secs: u64,
    /// Append persisted interactions to the corpus on retrain.
    #[serde(default = "default_include_interactions")]
    pub include_interactions: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            validate_interval_secs: default_validate_interval(),
            retrain_interval_secs: default_retrain_interval(),
            retrain_timeout_secs: default_retrain_timeout(),
            include_interactions: default_include_interactions(),
        }
    }
}

fn default_validate_interval() -> u64 {
    60
}
fn default_retrain_interval() -> u64 {
    3600
}
fn default_retrain_timeout() -> u64 {
    30
}
fn default_include_interactions() -> bool {
    true
}

impl ScheduleConfig {
    pub fn validate_interval(&self) -> Duration {
        Duration::from_secs(self.validate_interval_secs)
    }

    pub fn retrain_interval(&self) -> Duration {
        Duration::from_secs(self.retrain_interval_secs)
    }

    pub fn retrain_timeout(&self) -> Duration {
        Duration::from_secs(self.retrain_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// Defaults with relative paths; used when no config file is at hand.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/answers.sqlite"),
            },
            corpus: CorpusConfig {
                path: PathBuf::from("./corpus/corpus.md"),
                keyword_entities: None,
            },
            retrieval: RetrievalConfig::default(),
            intents: IntentsConfig::default(),
            schedule: ScheduleConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Check value ranges. Called by [`load_config`].
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.k == 0 {
            anyhow::bail!("retrieval.k must be >= 1");
        }
        if self.retrieval.keyword_top_n == 0 {
            anyhow::bail!("retrieval.keyword_top_n must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.intents.min_confidence) {
            anyhow::bail!("intents.min_confidence must be in [0.0, 1.0]");
        }
        if self.intents.promotion_threshold == 0 {
            anyhow::bail!("intents.promotion_threshold must be >= 1");
        }
        for seed in &self.intents.seed {
            if seed.name.trim().is_empty() {
                anyhow::bail!("intents.seed entries must have a non-empty name");
            }
        }
        if self.schedule.validate_interval_secs == 0 {
            anyhow::bail!("schedule.validate_interval_secs must be > 0");
        }
        if self.schedule.retrain_interval_secs == 0 {
            anyhow::bail!("schedule.retrain_interval_secs must be > 0");
        }
        if self.schedule.retrain_timeout_secs == 0 {
            anyhow::bail!("schedule.retrain_timeout_secs must be > 0");
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    const BASE: &str = r#"
[db]
path = "/tmp/answers.sqlite"

[corpus]
path = "/tmp/corpus.md"
"#;

    #[test]
    fn test_defaults() {
        let config = parse(BASE).unwrap();
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.retrieval.keyword_top_n, 20);
        assert_eq!(config.intents.promotion_threshold, 3);
        assert!((config.intents.min_confidence - 0.3).abs() < 1e-12);
        assert_eq!(config.intents.seed.len(), 3);
        assert_eq!(config.intents.seed[0].name, "greeting");
        assert!(config.intents.seed[2].reply.is_none());
        assert_eq!(config.schedule.validate_interval(), Duration::from_secs(60));
        assert!(config.schedule.include_interactions);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_custom_seed_replaces_defaults() {
        let content = format!(
            "{}\n[[intents.seed]]\nname = \"weather\"\nphrases = [\"is it raining\"]\n",
            BASE
        );
        let config = parse(&content).unwrap();
        assert_eq!(config.intents.seed.len(), 1);
        assert_eq!(config.intents.seed[0].to_intent().training_phrases, vec!["is it raining"]);
    }

    #[test]
    fn test_rejects_zero_k() {
        let content = format!("{}\n[retrieval]\nk = 0\n", BASE);
        let err = parse(&content).unwrap_err();
        assert!(err.to_string().contains("retrieval.k"));
    }

    #[test]
    fn test_rejects_confidence_out_of_range() {
        let content = format!("{}\n[intents]\nmin_confidence = 1.5\n", BASE);
        assert!(parse(&content).is_err());
    }

    #[test]
    fn test_missing_corpus_section() {
        assert!(parse("[db]\npath = \"x\"\n").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse(include_str!("../config/answers.example.toml")).unwrap();
        assert_eq!(config.intents.seed.len(), 3);
        assert_eq!(
            config.intents.seed[1].reply.as_deref(),
            Some("Bot: Goodbye! Have a great day!")
        );
        assert!(config.corpus.keyword_entities.is_some());
    }

    #[test]
    fn test_minimal_is_valid() {
        Config::minimal().validate().unwrap();
    }
}
