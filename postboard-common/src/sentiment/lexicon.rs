use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

static AFINN: Lazy<Lexicon> = Lazy::new(|| {
    Lexicon::from_tsv(include_str!("afinn.tsv")).expect("valid embedded afinn lexicon")
});

/// Tokens that flip the valence of the word right after them.
const NEGATORS: &[&str] = &[
    "arent", "cant", "didnt", "doesnt", "dont", "isnt", "never", "non", "not", "wasnt", "werent",
    "wont",
];

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum LexiconParseError {
    #[error("Line {line} is not a word and a score separated by a tab")]
    MissingScore { line: usize },
    #[error("Line {line} has an invalid score: {source}")]
    InvalidScore {
        line: usize,
        source: std::num::ParseIntError,
    },
}

/// Word valences from -5 to 5.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Lexicon {
    valences: HashMap<String, i32>,
}

/// Result of scoring a text against a [`Lexicon`].
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct SentimentScore {
    pub score: i32,
}

impl Lexicon {
    #[must_use]
    pub fn afinn() -> &'static Lexicon {
        &AFINN
    }

    pub fn from_tsv(source: &str) -> Result<Self, LexiconParseError> {
        let mut valences = HashMap::new();

        for (index, raw_line) in source.lines().enumerate() {
            let line = index + 1;
            let raw_line = raw_line.trim();
            if raw_line.is_empty() || raw_line.starts_with('#') {
                continue;
            }

            let (word, score) = raw_line
                .split_once('\t')
                .ok_or(LexiconParseError::MissingScore { line })?;
            let score = score
                .trim()
                .parse()
                .map_err(|source| LexiconParseError::InvalidScore { line, source })?;

            valences.insert(word.trim().to_lowercase(), score);
        }

        Ok(Self { valences })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.valences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }

    #[must_use]
    pub fn valence(&self, word: &str) -> Option<i32> {
        self.valences.get(word).copied()
    }

    #[must_use]
    pub fn score(&self, text: &str) -> SentimentScore {
        let tokens = tokenize(text);
        let mut result = SentimentScore::default();

        for (index, token) in tokens.iter().enumerate() {
            let Some(mut valence) = self.valence(token) else {
                continue;
            };

            if index > 0 && NEGATORS.contains(&tokens[index - 1].as_str()) {
                valence = -valence;
            }

            result.score += valence;
        }

        result
    }
}

/// Lowercases, drops punctuation (apostrophes included, so "don't" becomes
/// "dont") and splits on whitespace.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_alphanumeric() || c == '-' || c == ' ' => Some(c),
            _ => None,
        })
        .collect();

    cleaned
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
