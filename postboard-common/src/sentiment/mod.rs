//! Offline comment moderation.
//!
//! A text is scored against a word lexicon; a clearly negative score blocks the
//! comment and comes back with a softened rephrasing the author may submit
//! instead.

mod lexicon;
mod rephrase;

pub use lexicon::{Lexicon, LexiconParseError, SentimentScore};
pub use rephrase::rephrase;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Scores above this are positive.
pub const POSITIVE_THRESHOLD: i32 = 1;
/// Scores below this are negative.
pub const NEGATIVE_THRESHOLD: i32 = -1;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl SentimentLabel {
    #[must_use]
    pub fn from_score(score: i32) -> Self {
        if score > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if score < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct Assessment {
    pub sentiment: SentimentLabel,
    pub rephrased: String,
}

impl Assessment {
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.sentiment == SentimentLabel::Negative
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Validate)]
#[serde(default)]
pub struct AssessmentRequest {
    #[validate(custom(function = "crate::model::validation::comment_text_fits"))]
    pub text: String,
}

/// Labels `text` and proposes a rephrasing, using the embedded lexicon.
#[must_use]
pub fn analyze_and_rephrase(text: &str) -> Assessment {
    analyze_and_rephrase_with(Lexicon::afinn(), text)
}

#[must_use]
pub(crate) fn analyze_and_rephrase_with(lexicon: &Lexicon, text: &str) -> Assessment {
    if text.trim().is_empty() {
        return Assessment::default();
    }

    let sentiment = SentimentLabel::from_score(lexicon.score(text).score);

    Assessment {
        sentiment,
        rephrased: rephrase(text, sentiment),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Assessment, Lexicon, SentimentLabel, analyze_and_rephrase, analyze_and_rephrase_with,
    };

    #[test]
    fn thresholds() {
        assert_eq!(SentimentLabel::from_score(2), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-1), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-2), SentimentLabel::Negative);
    }

    #[test]
    fn blank_text_is_neutral_without_rephrasing() {
        assert_eq!(analyze_and_rephrase("   \n"), Assessment::default());
        assert_eq!(analyze_and_rephrase("").rephrased, "");
    }

    #[test]
    fn negative_comment_is_flagged_and_softened() {
        let assessment = analyze_and_rephrase("This post is awful and useless!");

        assert!(assessment.is_negative());
        assert_eq!(
            assessment.rephrased,
            "I felt this could be improved — This post is not great and less ideal."
        );
    }

    #[test]
    fn positive_comment() {
        let assessment = analyze_and_rephrase("Great article, I love it");

        assert_eq!(assessment.sentiment, SentimentLabel::Positive);
        assert_eq!(
            assessment.rephrased,
            "Overall, this seems quite positive — wonderful article, I wonderful it"
        );
    }

    #[test]
    fn mildly_negative_comment_passes() {
        // "broken" alone scores -1, which is not below the threshold.
        let assessment = analyze_and_rephrase("The link is broken");

        assert_eq!(assessment.sentiment, SentimentLabel::Neutral);
        assert_eq!(assessment.rephrased, "In general, The link is broken");
    }

    #[test]
    fn negated_praise_is_negative() {
        assert!(analyze_and_rephrase("This is not good").is_negative());
    }

    #[test]
    fn custom_lexicon() {
        let lexicon = Lexicon::from_tsv("meh\t-4").unwrap();
        let assessment = analyze_and_rephrase_with(&lexicon, "meh");

        assert!(assessment.is_negative());
        assert_eq!(assessment.rephrased, "I felt this could be improved — meh");
    }

    #[test]
    fn serializes_like_the_frontend_expects() {
        let json = serde_json::to_value(analyze_and_rephrase("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "sentiment": "neutral", "rephrased": "In general, hello" })
        );
    }
}
