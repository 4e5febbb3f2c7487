//! Per-language text resources: tokenizer, lemmatizer, stop words and the
//! sentence/sentiment tables, loaded lazily and cached in a registry.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, warn};
use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;
use whatlang::Lang;

use crate::lexicon;

/// Language codes the pipeline accepts. Anything else resolves to English.
pub const SUPPORTED_LANGUAGES: [&str; 5] = ["en", "de", "es", "fr", "pt"];

pub const DEFAULT_LANGUAGE: &str = "en";

/// Options controlling how resources are loaded.
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Use a Snowball stemmer as lemmatizer; otherwise lemmas are the lowercased tokens.
    pub stemming: bool,
    /// Directory holding `<code>.txt` stop-word lists that replace the built-in ones.
    pub stopwords_dir: Option<PathBuf>,
    /// Added to every language's stop words.
    pub extra_stopwords: HashSet<String>,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        ResourceOptions {
            stemming: true,
            stopwords_dir: None,
            extra_stopwords: HashSet::new(),
        }
    }
}

/// Reduces a token to its lemma.
pub enum Lemmatizer {
    Snowball(Stemmer),
    Identity,
}

impl Lemmatizer {
    pub fn lemma(&self, word: &str) -> String {
        match self {
            Lemmatizer::Snowball(stemmer) => stemmer.stem(word).into_owned(),
            Lemmatizer::Identity => word.to_string(),
        }
    }
}

impl fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lemmatizer::Snowball(_) => f.write_str("Snowball"),
            Lemmatizer::Identity => f.write_str("Identity"),
        }
    }
}

/// Immutable text primitives for one resource code.
#[derive(Debug)]
pub struct LanguageResources {
    code: &'static str,
    lemmatizer: Lemmatizer,
    stopwords: HashSet<String>,
    lexicon: HashMap<String, f64>,
    negators: &'static [&'static str],
    boosters: &'static [&'static str],
    abbreviations: &'static [&'static str],
}

impl LanguageResources {
    fn load(code: &'static str, options: &ResourceOptions) -> Self {
        let algorithm = match code {
            "de" => Algorithm::German,
            "es" => Algorithm::Spanish,
            "fr" => Algorithm::French,
            _ => Algorithm::English,
        };
        let lemmatizer = if options.stemming {
            Lemmatizer::Snowball(Stemmer::create(algorithm))
        } else {
            Lemmatizer::Identity
        };

        let mut stopwords = load_stopwords(code, options.stopwords_dir.as_deref());
        stopwords.extend(options.extra_stopwords.iter().map(|w| w.to_lowercase()));

        let mut lexicon = HashMap::new();
        for (word, valence) in lexicon::valences(code) {
            lexicon.insert((*word).to_string(), *valence);
        }
        for (word, valence) in lexicon::valences(code) {
            lexicon.entry(lemmatizer.lemma(word)).or_insert(*valence);
        }

        debug!(
            "Loaded language resources code={} lemmatizer={:?} stopwords={} lexicon={}",
            code,
            lemmatizer,
            stopwords.len(),
            lexicon.len()
        );

        LanguageResources {
            code,
            lemmatizer,
            stopwords,
            lexicon,
            negators: lexicon::negators(code),
            boosters: lexicon::boosters(code),
            abbreviations: lexicon::abbreviations(code),
        }
    }

    /// Resource code actually backing these primitives (`pt` reports `fr`).
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Word tokens, punctuation and whitespace dropped.
    pub fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.unicode_words().collect()
    }

    pub fn lemma(&self, word: &str) -> String {
        self.lemmatizer.lemma(word)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    /// Valence of a lowercase token, by surface form first and lemma second.
    pub fn valence(&self, token: &str) -> Option<f64> {
        self.lexicon
            .get(token)
            .or_else(|| self.lexicon.get(&self.lemma(token)))
            .copied()
    }

    pub fn is_negator(&self, token: &str) -> bool {
        let token = token.replace('’', "'");
        self.negators.iter().any(|n| {
            if n.ends_with('\'') {
                token.starts_with(n)
            } else {
                token == *n
            }
        })
    }

    pub fn is_booster(&self, token: &str) -> bool {
        self.boosters.contains(&token)
    }

    /// Non-empty, trimmed sentences in order.
    ///
    /// Lines are split first, then UAX #29 sentence boundaries; a boundary
    /// right after a known abbreviation is glued back together.
    pub fn sentences(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for line in text.lines() {
            let mut pending = String::new();
            for piece in line.unicode_sentences() {
                pending.push_str(piece);
                if self.ends_with_abbreviation(&pending) {
                    continue;
                }
                push_sentence(&mut out, &pending);
                pending.clear();
            }
            push_sentence(&mut out, &pending);
        }
        out
    }

    fn ends_with_abbreviation(&self, text: &str) -> bool {
        let last = text
            .trim_end()
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or_default()
            .to_lowercase();
        !last.is_empty() && self.abbreviations.iter().any(|a| last == *a)
    }
}

fn push_sentence(out: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn load_stopwords(code: &str, dir: Option<&Path>) -> HashSet<String> {
    let Some(dir) = dir else {
        return builtin_stopwords(code);
    };
    let path = dir.join(format!("{code}.txt"));
    match load_word_list(&path) {
        Ok(words) => words,
        Err(e) => {
            warn!(
                "Stop words for '{}' unavailable at {}: {}; continuing without stop words",
                code,
                path.display(),
                e
            );
            HashSet::new()
        }
    }
}

fn builtin_stopwords(code: &str) -> HashSet<String> {
    let language = match code {
        "de" => stop_words::LANGUAGE::German,
        "es" => stop_words::LANGUAGE::Spanish,
        "fr" => stop_words::LANGUAGE::French,
        _ => stop_words::LANGUAGE::English,
    };
    stop_words::get(language)
        .into_iter()
        .map(|w| w.to_lowercase())
        .collect()
}

/// Parses a one-word-per-line list. Blank lines and `#` comments are skipped.
pub fn parse_word_list(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

pub fn load_word_list(path: &Path) -> std::io::Result<HashSet<String>> {
    Ok(parse_word_list(&fs::read_to_string(path)?))
}

/// Lowercased base code: `pt-BR` becomes `pt`.
pub fn normalize_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resource code for a language code: `pt` borrows `fr`, unknown codes use `en`.
pub fn resource_code(code: &str) -> &'static str {
    match normalize_code(code).as_str() {
        "en" => "en",
        "de" => "de",
        "es" => "es",
        "fr" | "pt" => "fr",
        _ => DEFAULT_LANGUAGE,
    }
}

/// Reliable detection of one of the supported languages.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    if !info.is_reliable() {
        return None;
    }
    match info.lang() {
        Lang::Eng => Some("en"),
        Lang::Deu => Some("de"),
        Lang::Spa => Some("es"),
        Lang::Fra => Some("fr"),
        Lang::Por => Some("pt"),
        _ => None,
    }
}

/// Language code recorded for an answer: the declared one unless missing or `auto`.
pub fn answer_language(declared: Option<&str>, text: &str) -> String {
    match declared.map(normalize_code) {
        Some(code) if !code.is_empty() && code != "auto" => code,
        _ => detect_language(text)
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string(),
    }
}

/// Process-wide cache of loaded resources, keyed by resource code.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    options: ResourceOptions,
    cache: RwLock<HashMap<&'static str, Arc<LanguageResources>>>,
}

impl LanguageRegistry {
    pub fn new(options: ResourceOptions) -> Self {
        LanguageRegistry {
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached resources for `code`, loading them on first use.
    pub fn get_or_load(&self, code: &str) -> Arc<LanguageResources> {
        let key = resource_code(code);
        if let Ok(cache) = self.cache.read() {
            if let Some(resources) = cache.get(key) {
                return Arc::clone(resources);
            }
        }

        let loaded = Arc::new(LanguageResources::load(key, &self.options));
        match self.cache.write() {
            Ok(mut cache) => Arc::clone(cache.entry(key).or_insert(loaded)),
            // a poisoned cache still yields usable resources, just uncached
            Err(_) => loaded,
        }
    }

    /// Resource codes loaded so far, sorted.
    pub fn loaded_codes(&self) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = self
            .cache
            .read()
            .map(|cache| cache.keys().copied().collect())
            .unwrap_or_default();
        codes.sort_unstable();
        codes
    }
}
