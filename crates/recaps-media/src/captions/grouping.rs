//! Word grouping: how many words go into each caption.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Policy for choosing caption sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkSizing {
    /// Phrase-aware grouping that keeps function words with what follows.
    #[default]
    Linguistic,
    /// 1, 2 or 3 words with 20/50/30 odds, reproducible for a given seed.
    WeightedRandom { seed: u64 },
}

impl ChunkSizing {
    /// Split `words` into consecutive group sizes (each 1-3) that sum to
    /// `words.len()`.
    pub fn plan(&self, words: &[&str]) -> Vec<usize> {
        match self {
            ChunkSizing::Linguistic => plan_with(words, linguistic_group_size),
            ChunkSizing::WeightedRandom { seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                plan_with(words, |rest| weighted_group_size(rest.len(), rng.gen()))
            }
        }
    }
}

fn plan_with(words: &[&str], mut size_of: impl FnMut(&[&str]) -> usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut index = 0;
    while index < words.len() {
        let rest = &words[index..];
        let size = size_of(rest).clamp(1, rest.len());
        sizes.push(size);
        index += size;
    }
    sizes
}

fn weighted_group_size(remaining: usize, roll: f64) -> usize {
    if remaining <= 2 {
        return remaining;
    }
    if roll < 0.2 {
        1
    } else if roll < 0.7 {
        2
    } else {
        3
    }
}

const ARTICLES: &[&str] = &["a", "an", "the"];

const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "along", "among", "around", "at", "before",
    "behind", "below", "beneath", "beside", "between", "beyond", "by", "down", "during", "for",
    "from", "in", "inside", "into", "near", "of", "off", "on", "onto", "out", "outside", "over",
    "past", "through", "throughout", "to", "toward", "towards", "under", "until", "up", "upon",
    "with", "within", "without",
];

const AUXILIARIES: &[&str] = &[
    "am", "are", "be", "been", "being", "can", "could", "did", "do", "does", "had", "has", "have",
    "is", "may", "might", "must", "shall", "should", "was", "were", "will", "would", "can't",
    "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't", "weren't", "won't", "wouldn't",
    "shouldn't", "couldn't",
];

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your",
    "his", "its", "our", "their", "this", "that", "these", "those", "who", "what", "which",
    "it's", "that's", "there's", "i'm", "you're", "they're", "we're", "he's", "she's",
];

const CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "nor", "so", "yet", "because", "although", "though", "while", "if",
    "unless", "since", "when", "whereas", "then",
];

const QUANTIFIERS: &[&str] = &[
    "all", "any", "both", "each", "every", "few", "less", "many", "more", "most", "much", "no",
    "several", "some",
];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "twenty", "thirty", "forty", "fifty", "hundred", "thousand", "million", "billion",
    "first", "second", "third",
];

/// Fixed phrases kept on one caption. Phrases starting with a word that an
/// earlier rule already handles are left out because they can never match.
const IDIOMS_3: &[[&str; 3]] = &[
    ["as", "a", "result"],
    ["as", "well", "as"],
    ["as", "soon", "as"],
    ["as", "long", "as"],
    ["as", "far", "as"],
    ["step", "by", "step"],
    ["little", "by", "little"],
    ["side", "by", "side"],
];

const IDIOMS_2: &[[&str; 2]] = &[
    ["right", "now"],
    ["kind", "of"],
    ["sort", "of"],
    ["even", "though"],
    ["even", "if"],
    ["rather", "than"],
    ["instead", "of"],
    ["according", "to"],
    ["due", "to"],
    ["thanks", "to"],
    ["next", "to"],
    ["such", "as"],
    ["make", "sure"],
    ["find", "out"],
    ["figure", "out"],
    ["turns", "out"],
    ["not", "only"],
    ["pretty", "much"],
    ["just", "like"],
    ["as", "if"],
];

/// Short adjectives that land harder alone on screen.
const IMPACT_WORDS: &[&str] = &[
    "amazing", "awesome", "brutal", "crazy", "deadly", "epic", "genius", "giant", "huge",
    "iconic", "insane", "massive", "shocking", "wild", "legendary", "wrong", "secret",
    "powerful",
];

/// Words longer than this stand alone.
const LONG_WORD_CHARS: usize = 8;

/// Lowercase a word and strip surrounding punctuation.
pub fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .trim_matches('\'')
        .to_lowercase()
}

fn is_number(word: &str) -> bool {
    if NUMBER_WORDS.contains(&word) {
        return true;
    }
    let digits = word.trim_end_matches(['%', 's']);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '.' || c == '$')
}

fn matches_phrase(rest: &[String], phrase: &[&str]) -> bool {
    rest.len() >= phrase.len() && rest.iter().zip(phrase).all(|(word, expected)| word == expected)
}

/// Size of the group starting at `rest[0]`.
///
/// Rules, first match wins: 1-2 remaining words go together; an article
/// takes its noun; a preposition takes an article and its noun, or one word;
/// auxiliaries, pronouns, conjunctions, quantifiers and numbers take the next
/// word; known idioms stay whole; a long or impactful word stands alone;
/// anything else pairs up.
pub fn linguistic_group_size(rest: &[&str]) -> usize {
    if rest.len() <= 2 {
        return rest.len();
    }

    let lookahead: Vec<String> = rest.iter().take(3).map(|w| normalize(w)).collect();
    let first = lookahead[0].as_str();

    if ARTICLES.contains(&first) {
        return 2;
    }

    if PREPOSITIONS.contains(&first) {
        return if ARTICLES.contains(&lookahead[1].as_str()) { 3 } else { 2 };
    }

    if AUXILIARIES.contains(&first)
        || PRONOUNS.contains(&first)
        || CONJUNCTIONS.contains(&first)
        || QUANTIFIERS.contains(&first)
        || is_number(first)
    {
        return 2;
    }

    if IDIOMS_3.iter().any(|phrase| matches_phrase(&lookahead, phrase)) {
        return 3;
    }
    if IDIOMS_2.iter().any(|phrase| matches_phrase(&lookahead, phrase)) {
        return 2;
    }

    if first.chars().count() > LONG_WORD_CHARS || IMPACT_WORDS.contains(&first) {
        return 1;
    }

    2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_small_remainders_taken_whole() {
        assert_eq!(linguistic_group_size(&words("incredible")), 1);
        assert_eq!(linguistic_group_size(&words("A TEST")), 2);
    }

    #[test]
    fn test_article_and_preposition_rules() {
        assert_eq!(linguistic_group_size(&words("the cell is")), 2);
        assert_eq!(linguistic_group_size(&words("In the beginning there")), 3);
        assert_eq!(linguistic_group_size(&words("of energy for")), 2);
    }

    #[test]
    fn test_function_word_rules() {
        assert_eq!(linguistic_group_size(&words("is basically magic")), 2);
        assert_eq!(linguistic_group_size(&words("They found something")), 2);
        assert_eq!(linguistic_group_size(&words("and then everything")), 2);
        assert_eq!(linguistic_group_size(&words("most people think")), 2);
        assert_eq!(linguistic_group_size(&words("1,000 years ago")), 2);
        assert_eq!(linguistic_group_size(&words("90% of cells")), 2);
    }

    #[test]
    fn test_idioms() {
        assert_eq!(linguistic_group_size(&words("As a result, the")), 3);
        assert_eq!(linguistic_group_size(&words("right NOW! we")), 2);
        assert_eq!(linguistic_group_size(&words("Step by step, you")), 3);
    }

    #[test]
    fn test_standalone_words() {
        assert_eq!(linguistic_group_size(&words("photosynthesis converts light")), 1);
        assert_eq!(linguistic_group_size(&words("Insane, right? yes")), 1);
        assert_eq!(linguistic_group_size(&words("cells convert light")), 2);
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("\"Hello,"), "hello");
        assert_eq!(normalize("it's"), "it's");
        assert_eq!(normalize("'quoted'"), "quoted");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_plan_covers_all_words() {
        let text = words("the quick brown fox jumps over the lazy dog and it is amazing");
        for sizing in [ChunkSizing::Linguistic, ChunkSizing::WeightedRandom { seed: 7 }] {
            let sizes = sizing.plan(&text);
            assert_eq!(sizes.iter().sum::<usize>(), text.len());
            assert!(sizes.iter().all(|&s| (1..=3).contains(&s)));
        }
    }

    #[test]
    fn test_weighted_random_is_reproducible() {
        let text = words("one two three four five six seven eight nine ten eleven twelve");
        let a = ChunkSizing::WeightedRandom { seed: 42 }.plan(&text);
        let b = ChunkSizing::WeightedRandom { seed: 42 }.plan(&text);
        assert_eq!(a, b);
    }

    #[test]
    fn test_weighted_group_size_thresholds() {
        assert_eq!(weighted_group_size(5, 0.1), 1);
        assert_eq!(weighted_group_size(5, 0.5), 2);
        assert_eq!(weighted_group_size(5, 0.9), 3);
        assert_eq!(weighted_group_size(2, 0.1), 2);
        assert_eq!(weighted_group_size(1, 0.9), 1);
    }
}
