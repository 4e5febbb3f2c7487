use std::collections::HashMap;

use crate::language::LanguageResources;

/// Lemmas shorter than this (in chars) are dropped.
pub const MIN_WORD_LEN: usize = 3;

///Extracts the significant words of one sentence, in order of appearance.
///Tokens are lowercased, stop words (surface form or lemma) and purely numeric tokens are dropped,
///the rest is lemmatized and kept when the lemma has at least `MIN_WORD_LEN` chars.
/// # Example
/// ```
/// use survey_insights::{LanguageRegistry, extract_words};
/// let registry = LanguageRegistry::default();
/// let en = registry.get_or_load("en");
/// let words = extract_words("The waiters were friendly!", &en);
/// assert!(words.contains(&"waiter".to_string()));
/// assert!(!words.contains(&"the".to_string()));
/// ```
pub fn extract_words(sentence: &str, resources: &LanguageResources) -> Vec<String> {
    resources
        .tokens(sentence)
        .into_iter()
        .map(|token| token.to_lowercase().replace('’', "'"))
        .filter(|token| !resources.is_stopword(token))
        .filter(|token| !token.chars().all(|c| c.is_numeric() || c == '.' || c == ','))
        .map(|token| resources.lemma(&token))
        .filter(|lemma| lemma.chars().count() >= MIN_WORD_LEN && !resources.is_stopword(lemma))
        .collect()
}

///Takes &[String] and counts the quantity of each word. Returns HashMap<String, u32>,
///with String being the word and u32 the quantity
/// # Example
/// ```
/// use survey_insights::count_words;
/// let words = vec!["one".to_string(), "two".to_string(), "two".to_string()];
/// let counted = count_words(&words);
/// assert_eq!(counted["two"], 2);
/// assert_eq!(counted["one"], 1);
/// ```
pub fn count_words(words: &[String]) -> HashMap<String, u32> {
    let mut frequency: HashMap<String, u32> = HashMap::new();
    for word in words {
        *frequency.entry(word.to_owned()).or_insert(0) += 1;
    }
    frequency
}

///Sort words in HashMap<Word, Frequency> by frequency (descending, ties alphabetical)
///into Vec<(String, u32)>.
/// # Example
/// ```
/// use survey_insights::sort_map_to_vec;
/// use std::collections::HashMap;
/// let mut words_map = HashMap::new();
/// words_map.insert("one".to_string(), 1 as u32);
/// words_map.insert("two".to_string(), 2 as u32);
/// words_map.insert("three".to_string(), 3 as u32);
/// let vec_sorted = sort_map_to_vec(words_map);
/// let expected = vec![
///     ("three".to_string(), 3 as u32),
///     ("two".to_string(), 2 as u32),
///     ("one".to_string(), 1 as u32),
/// ];
/// assert_eq!(vec_sorted, expected);
/// ```
pub fn sort_map_to_vec(frequency: HashMap<String, u32>) -> Vec<(String, u32)> {
    let mut vec_sorted: Vec<(String, u32)> = frequency.into_iter().collect();
    vec_sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    vec_sorted
}
