//! Topic index for "Related Topics" annotations.
//!
//! Topics come from three places, later sources overriding earlier ones:
//!
//! 1. Capitalized words in corpus lines (`Goroutine`, `WaitGroup`).
//! 2. Corpus section headings (lines starting with `##`).
//! 3. The keyword-entity file, which carries descriptions and categories.
//!
//! Keys are lowercased; lookups match whole lowercased query words.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::normalize;

/// Category header lines recognized in the keyword-entity file.
const CATEGORY_HEADERS: &[&str] = &[
    "Control Flow Keywords",
    "Function and Variable Keywords",
    "Data Structure Keywords",
];

const NO_INFO_FALLBACK: &str = "Sorry, I couldn't find relevant information.";

fn capitalized_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-zA-Z0-9]*\b").expect("static pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl Topic {
    fn bare(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            category: None,
        }
    }
}

/// Parse a keyword-entity file: `keyword - description` lines grouped under
/// category headers. Blank and unrecognized lines are skipped.
pub fn parse_entities(content: &str) -> Vec<Topic> {
    let mut category: Option<String> = None;
    let mut topics = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if CATEGORY_HEADERS.iter().any(|h| line.starts_with(h)) {
            category = Some(line.to_string());
            continue;
        }
        if let Some((name, description)) = line.split_once('-') {
            topics.push(Topic {
                name: name.trim().to_string(),
                description: Some(description.trim().to_string()),
                category: category.clone(),
            });
        }
    }
    topics
}

#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    topics: HashMap<String, Topic>,
}

impl TopicIndex {
    pub fn build<S: AsRef<str>>(entities: &[Topic], corpus: &[S]) -> Self {
        let mut topics: HashMap<String, Topic> = HashMap::new();

        for line in corpus {
            let line = line.as_ref();
            for m in capitalized_word().find_iter(line) {
                let key = m.as_str().to_lowercase();
                if !normalize::is_stopword(&key) {
                    topics.entry(key).or_insert_with(|| Topic::bare(m.as_str()));
                }
            }
            if let Some(heading) = line.strip_prefix("##") {
                let heading = heading.trim_start_matches('#').trim();
                if !heading.is_empty() {
                    topics.insert(heading.to_lowercase(), Topic::bare(heading));
                }
            }
        }

        for entity in entities {
            if !entity.name.is_empty() {
                topics.insert(entity.name.to_lowercase(), entity.clone());
            }
        }

        Self { topics }
    }

    /// Distinct topics named by the query's words, in query order.
    pub fn lookup(&self, query: &str) -> Vec<&Topic> {
        let lowered = query.to_lowercase();
        let mut seen = HashSet::new();
        let found = normalize::tokenize(&lowered)
            .into_iter()
            .filter(|word| seen.insert(*word))
            .filter_map(|word| self.topics.get(word))
            .collect();
        found
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// One line per topic: its description, or a note that none is known.
pub fn describe(topics: &[&Topic]) -> String {
    if topics.is_empty() {
        return NO_INFO_FALLBACK.to_string();
    }
    topics
        .iter()
        .map(|t| match &t.description {
            Some(d) => format!("{}: {}", t.name, d),
            None => format!("I'm sorry, but I do not have information on: {}", t.name),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
