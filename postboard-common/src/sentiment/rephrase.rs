use crate::sentiment::SentimentLabel;
use once_cell::sync::Lazy;
use regex::Regex;

pub const NEGATIVE_PREFIX: &str = "I felt this could be improved — ";
pub const POSITIVE_PREFIX: &str = "Overall, this seems quite positive — ";
pub const NEUTRAL_PREFIX: &str = "In general, ";

struct Substitution {
    pattern: Regex,
    replacement: &'static str,
}

impl Substitution {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid substitution regex"),
            replacement,
        }
    }
}

// ASCII-only word boundaries and case folding, like JavaScript regexes without the `u` flag.
// Applied in order, so a word matched by an earlier rule never reaches a later one.
static SOFTENING: Lazy<Vec<Substitution>> = Lazy::new(|| {
    vec![
        Substitution::new(r"(?i-u:\b(bad|poor|worst|hate|angry|awful)\b)", "not great"),
        Substitution::new(r"(?i-u:\b(stupid|useless|terrible|annoying|worst)\b)", "less ideal"),
        Substitution::new(r"(?i-u:\b(ugly|disgusting|hate)\b)", "unpleasant"),
        Substitution::new(r"!+", "."),
    ]
});

static BRIGHTENING: Lazy<Vec<Substitution>> = Lazy::new(|| {
    vec![Substitution::new(
        r"(?i-u:\b(good|nice|great|excellent|love)\b)",
        "wonderful",
    )]
});

fn substitute(text: &str, substitutions: &[Substitution]) -> String {
    substitutions
        .iter()
        .fold(text.to_owned(), |text, substitution| {
            substitution
                .pattern
                .replace_all(&text, substitution.replacement)
                .into_owned()
        })
}

/// Rewrites `text` according to the label it was given.
#[must_use]
pub fn rephrase(text: &str, label: SentimentLabel) -> String {
    match label {
        SentimentLabel::Negative => format!("{NEGATIVE_PREFIX}{}", substitute(text, &SOFTENING)),
        SentimentLabel::Positive => {
            format!("{POSITIVE_PREFIX}{}", substitute(text, &BRIGHTENING))
        }
        SentimentLabel::Neutral => format!("{NEUTRAL_PREFIX}{text}"),
    }
}
