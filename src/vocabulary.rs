//! In-memory catalog of learnable items, loaded once from an external
//! content source with a built-in seed fallback.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::types::CefrLevel;

/// Columns of the tab-delimited content format:
/// word, level, example text(s) separated by `|`, category, frequency,
/// part of speech.
const COLUMN_COUNT: usize = 6;
const EXAMPLE_SEPARATOR: char = '|';

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    /// Lowercased word, unique within the catalog.
    pub key: String,
    pub level: CefrLevel,
    pub category: String,
    pub example_texts: Vec<String>,
    pub frequency: f64,
    pub part_of_speech: String,
}

/// External content boundary. `fetch` blocks until content is available or
/// fails; on failure the store substitutes the seed catalog.
pub trait ContentSource {
    fn fetch(&self) -> Result<String, LoadError>;
}

impl<F> ContentSource for F
where
    F: Fn() -> Result<String, LoadError>,
{
    fn fetch(&self) -> Result<String, LoadError> {
        self()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    pub level: Option<CefrLevel>,
    pub category: Option<String>,
}

impl WordFilter {
    pub fn matches(&self, word: &WordRecord) -> bool {
        if let Some(level) = self.level {
            if word.level != level {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &word.category != category {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    /// Rows parsed into the catalog.
    pub loaded: usize,
    /// Malformed rows skipped, not fatal.
    pub skipped: usize,
    /// True when the seed catalog was installed instead of source content.
    pub fallback: bool,
}

struct SeedWord {
    word: &'static str,
    level: CefrLevel,
    category: &'static str,
    example: &'static str,
    frequency: f64,
    part_of_speech: &'static str,
}

/// Minimal operable catalog installed when the content source is unreachable
/// or yields nothing. Guarantees the rest of the system always has items.
const SEED_WORDS: &[SeedWord] = &[
    SeedWord {
        word: "cat",
        level: CefrLevel::A1,
        category: "animals",
        example: "The cat sleeps on the sofa.",
        frequency: 0.9,
        part_of_speech: "noun",
    },
    SeedWord {
        word: "run",
        level: CefrLevel::A1,
        category: "actions",
        example: "I run every morning.",
        frequency: 0.95,
        part_of_speech: "verb",
    },
    SeedWord {
        word: "house",
        level: CefrLevel::A1,
        category: "places",
        example: "Their house has a red door.",
        frequency: 0.92,
        part_of_speech: "noun",
    },
    SeedWord {
        word: "beautiful",
        level: CefrLevel::A2,
        category: "adjectives",
        example: "What a beautiful garden.",
        frequency: 0.8,
        part_of_speech: "adjective",
    },
    SeedWord {
        word: "journey",
        level: CefrLevel::B1,
        category: "travel",
        example: "The journey took three hours.",
        frequency: 0.6,
        part_of_speech: "noun",
    },
    SeedWord {
        word: "negotiate",
        level: CefrLevel::B2,
        category: "business",
        example: "They negotiate a new contract.",
        frequency: 0.4,
        part_of_speech: "verb",
    },
    SeedWord {
        word: "ubiquitous",
        level: CefrLevel::C1,
        category: "adjectives",
        example: "Smartphones are ubiquitous now.",
        frequency: 0.2,
        part_of_speech: "adjective",
    },
];

#[derive(Default)]
pub struct VocabularyStore {
    words: HashMap<String, WordRecord>,
}

impl VocabularyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the content source into the catalog. On source failure or an
    /// empty parse, installs the seed set instead so the store is never
    /// left empty.
    pub fn load(&mut self, source: &dyn ContentSource) -> LoadOutcome {
        match source.fetch() {
            Ok(text) => {
                let (words, skipped) = parse_content(&text);
                if words.is_empty() {
                    tracing::warn!(skipped, "content source yielded no rows, using seed catalog");
                    self.install_seed();
                    LoadOutcome {
                        loaded: self.words.len(),
                        skipped,
                        fallback: true,
                    }
                } else {
                    let loaded = words.len();
                    if skipped > 0 {
                        tracing::debug!(loaded, skipped, "skipped malformed content rows");
                    }
                    self.words = words;
                    LoadOutcome {
                        loaded,
                        skipped,
                        fallback: false,
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "content source unavailable, using seed catalog");
                self.install_seed();
                LoadOutcome {
                    loaded: self.words.len(),
                    skipped: 0,
                    fallback: true,
                }
            }
        }
    }

    fn install_seed(&mut self) {
        self.words = SEED_WORDS
            .iter()
            .map(|s| {
                let key = s.word.to_lowercase();
                let record = WordRecord {
                    key: key.clone(),
                    level: s.level,
                    category: s.category.to_string(),
                    example_texts: vec![s.example.to_string()],
                    frequency: s.frequency,
                    part_of_speech: s.part_of_speech.to_string(),
                };
                (key, record)
            })
            .collect();
    }

    pub fn get(&self, key: &str) -> Option<&WordRecord> {
        self.words.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.words.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordRecord> {
        self.words.values()
    }

    pub fn by_level(&self, level: CefrLevel) -> Vec<&WordRecord> {
        self.words.values().filter(|w| w.level == level).collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<&WordRecord> {
        self.words
            .values()
            .filter(|w| w.category == category)
            .collect()
    }

    pub fn random_sample(&self, n: usize, filter: Option<&WordFilter>) -> Vec<&WordRecord> {
        let pool: Vec<&WordRecord> = self
            .words
            .values()
            .filter(|w| filter.map_or(true, |f| f.matches(w)))
            .collect();
        let mut rng = rand::thread_rng();
        pool.choose_multiple(&mut rng, n.min(pool.len()))
            .copied()
            .collect()
    }
}

fn parse_content(text: &str) -> (HashMap<String, WordRecord>, usize) {
    let mut words = HashMap::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_row(line) {
            Some(record) => {
                words.insert(record.key.clone(), record);
            }
            None => skipped += 1,
        }
    }

    (words, skipped)
}

fn parse_row(line: &str) -> Option<WordRecord> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != COLUMN_COUNT {
        return None;
    }

    let word = columns[0].trim();
    if word.is_empty() {
        return None;
    }
    let level = CefrLevel::parse(columns[1])?;
    let example_texts: Vec<String> = columns[2]
        .split(EXAMPLE_SEPARATOR)
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect();
    let category = columns[3].trim();
    if category.is_empty() {
        return None;
    }
    let frequency: f64 = columns[4].trim().parse().ok()?;
    if !(0.0..=1.0).contains(&frequency) {
        return None;
    }
    let part_of_speech = columns[5].trim();

    Some(WordRecord {
        key: word.to_lowercase(),
        level,
        category: category.to_string(),
        example_texts,
        frequency,
        part_of_speech: part_of_speech.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_of(text: &'static str) -> impl ContentSource {
        move || Ok(text.to_string())
    }

    #[test]
    fn parses_valid_rows_and_counts_malformed() {
        let text = "cat\tA1\tThe cat sleeps.|A black cat.\tanimals\t0.9\tnoun\n\
                    broken row without tabs\n\
                    dog\tA1\tThe dog barks.\tanimals\t0.85\tnoun\n";
        let mut store = VocabularyStore::new();
        let outcome = store.load(&source_of(text));

        assert_eq!(outcome.loaded, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(!outcome.fallback);
        assert_eq!(store.get("CAT").unwrap().example_texts.len(), 2);
    }

    #[test]
    fn falls_back_to_seed_on_source_error() {
        let failing = || Err::<String, _>(LoadError::Unavailable("offline".to_string()));
        let mut store = VocabularyStore::new();
        let outcome = store.load(&failing);

        assert!(outcome.fallback);
        assert!(!store.is_empty());
        assert!(store.get("cat").is_some());
    }

    #[test]
    fn falls_back_to_seed_when_all_rows_malformed() {
        let mut store = VocabularyStore::new();
        let outcome = store.load(&source_of("garbage\nmore garbage\n"));

        assert!(outcome.fallback);
        assert_eq!(outcome.skipped, 2);
        assert!(!store.is_empty());
    }

    #[test]
    fn rejects_out_of_range_frequency() {
        assert!(parse_row("cat\tA1\tex\tanimals\t1.5\tnoun").is_none());
        assert!(parse_row("cat\tD9\tex\tanimals\t0.5\tnoun").is_none());
    }

    #[test]
    fn filters_by_level_and_category() {
        let mut store = VocabularyStore::new();
        store.load(&(|| Err::<String, _>(LoadError::Empty)));

        assert!(store.by_level(CefrLevel::A1).len() >= 3);
        assert_eq!(store.by_category("business").len(), 1);

        let filter = WordFilter {
            level: Some(CefrLevel::A1),
            category: None,
        };
        let sample = store.random_sample(2, Some(&filter));
        assert_eq!(sample.len(), 2);
        assert!(sample.iter().all(|w| w.level == CefrLevel::A1));
    }
}
