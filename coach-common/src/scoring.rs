//! Score estimator
//!
//! Deterministic fallback scores for chunks whose upstream analysis did not
//! supply clarity or confidence. Every function here is pure and total.

use crate::models::{EmotionScores, ScoreSource};

/// Single-token fillers (matched case-insensitively)
pub const FILLER_WORDS: &[&str] = &[
    "um", "uh", "like", "so", "actually", "basically", "right", "okay", "ok",
];

/// Multi-token filler phrases; every token of a match counts as filler
pub const FILLER_PHRASES: &[&[&str]] = &[&["you", "know"]];

/// Confidence used when neither a supplied score nor an emotion signal exists
pub const NO_SIGNAL_CONFIDENCE: f64 = 0.5;

const POSITIVE_EMOTIONS: &[&str] = &["joy", "neutral"];
const NEGATIVE_EMOTIONS: &[&str] = &["sadness", "fear", "anger"];

/// Lower-cased word tokens (runs of alphanumerics/underscore)
pub fn tokenize(transcript: &str) -> Vec<String> {
    transcript
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Filler statistics for a transcript
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillerStats {
    pub words: usize,
    pub filler_count: usize,
}

impl FillerStats {
    pub fn from_transcript(transcript: &str) -> Self {
        let tokens = tokenize(transcript);
        let mut filler_count = 0;
        let mut i = 0;

        while i < tokens.len() {
            if let Some(len) = phrase_match_len(&tokens[i..]) {
                filler_count += len;
                i += len;
                continue;
            }
            if FILLER_WORDS.contains(&tokens[i].as_str()) {
                filler_count += 1;
            }
            i += 1;
        }

        Self {
            words: tokens.len(),
            filler_count,
        }
    }

    pub fn filler_ratio(&self) -> f64 {
        self.filler_count as f64 / self.words.max(1) as f64
    }
}

fn phrase_match_len(tokens: &[String]) -> Option<usize> {
    FILLER_PHRASES
        .iter()
        .find(|phrase| {
            phrase.len() <= tokens.len()
                && phrase.iter().zip(tokens).all(|(p, t)| *p == t.as_str())
        })
        .map(|phrase| phrase.len())
}

/// Clarity in [0,1] as an inverse function of filler density
///
/// A transcript without any word tokens scores 0.0: silence is not clear speech.
pub fn estimate_clarity(transcript: &str) -> f64 {
    let stats = FillerStats::from_transcript(transcript);
    if stats.words == 0 {
        return 0.0;
    }
    (1.0 - stats.filler_ratio() * 2.0).clamp(0.0, 1.0)
}

/// Confidence in [0,1] from an emotion distribution, `None` when there is no signal
///
/// `(joy + neutral) - (sadness + fear + anger)` is mapped affinely so that a
/// zero difference lands on 0.5.
pub fn estimate_confidence(emotions: &EmotionScores) -> Option<f64> {
    if emotions.is_empty() {
        return None;
    }
    let sum = |labels: &[&str]| -> f64 {
        labels
            .iter()
            .map(|label| emotions.get(*label).copied().unwrap_or(0.0))
            .sum()
    };
    let raw = sum(POSITIVE_EMOTIONS) - sum(NEGATIVE_EMOTIONS);
    Some(((raw + 1.0) / 2.0).clamp(0.0, 1.0))
}

/// Finite supplied score clamped into [0,1]; non-finite values count as absent
pub fn supplied_score(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0))
}

/// Supplied clarity when usable, otherwise the transcript estimate
pub fn resolve_clarity(supplied: Option<f64>, transcript: &str) -> (f64, ScoreSource) {
    match supplied_score(supplied) {
        Some(value) => (value, ScoreSource::Analyzer),
        None => (estimate_clarity(transcript), ScoreSource::Estimated),
    }
}

/// Supplied confidence when usable, else the emotion estimate, else the neutral default
pub fn resolve_confidence(supplied: Option<f64>, emotions: &EmotionScores) -> (f64, ScoreSource) {
    if let Some(value) = supplied_score(supplied) {
        return (value, ScoreSource::Analyzer);
    }
    match estimate_confidence(emotions) {
        Some(value) => (value, ScoreSource::Estimated),
        None => (NO_SIGNAL_CONFIDENCE, ScoreSource::Default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emotions(pairs: &[(&str, f64)]) -> EmotionScores {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_transcript_scores_zero() {
        assert_eq!(estimate_clarity(""), 0.0);
        assert_eq!(estimate_clarity("   "), 0.0);
        assert_eq!(estimate_clarity("... !!"), 0.0);
    }

    #[test]
    fn test_clean_transcript_scores_one() {
        assert_eq!(estimate_clarity("I designed the caching layer myself."), 1.0);
    }

    #[test]
    fn test_filler_ratio_doubles_penalty() {
        // 1 filler in 10 tokens -> 1 - 0.2
        let t = "um I led a team of four people on it";
        let stats = FillerStats::from_transcript(t);
        assert_eq!(stats.words, 10);
        assert_eq!(stats.filler_count, 1);
        assert!((estimate_clarity(t) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_fillers_are_case_insensitive_and_punctuation_split() {
        let stats = FillerStats::from_transcript("Um, LIKE... okay.");
        assert_eq!(stats.words, 3);
        assert_eq!(stats.filler_count, 3);
        assert_eq!(estimate_clarity("Um, LIKE... okay."), 0.0);
    }

    #[test]
    fn test_you_know_counts_both_tokens() {
        let stats = FillerStats::from_transcript("it was, you know, hard");
        assert_eq!(stats.words, 5);
        assert_eq!(stats.filler_count, 2);
        // "you" alone is not a filler
        assert_eq!(FillerStats::from_transcript("you did well").filler_count, 0);
    }

    #[test]
    fn test_clarity_always_in_unit_range() {
        let samples = [
            "",
            "um",
            "um uh like so",
            "plain answer with no hesitation",
            "so so so so so so word",
            "you know you know you know",
        ];
        for s in samples {
            let c = estimate_clarity(s);
            assert!((0.0..=1.0).contains(&c), "clarity {} out of range for {:?}", c, s);
        }
    }

    #[test]
    fn test_more_fillers_never_increase_clarity() {
        // Fixed length of 8 tokens, replacing content words with fillers one at a time
        let base = ["we", "shipped", "the", "new", "search", "service", "last", "year"];
        let mut previous = f64::INFINITY;
        for fillers in 0..=base.len() {
            let words: Vec<&str> = base
                .iter()
                .enumerate()
                .map(|(i, w)| if i < fillers { "um" } else { *w })
                .collect();
            let clarity = estimate_clarity(&words.join(" "));
            assert!(clarity <= previous, "clarity rose at {} fillers", fillers);
            previous = clarity;
        }
    }

    #[test]
    fn test_confidence_none_without_signal() {
        assert_eq!(estimate_confidence(&EmotionScores::new()), None);
    }

    #[test]
    fn test_confidence_neutral_signal_is_midpoint() {
        // Labels outside the positive/negative sets contribute nothing
        let e = emotions(&[("surprise", 0.9)]);
        assert_eq!(estimate_confidence(&e), Some(0.5));
    }

    #[test]
    fn test_confidence_affine_mapping() {
        let e = emotions(&[("joy", 0.6), ("neutral", 0.2), ("fear", 0.2)]);
        // raw = 0.8 - 0.2 = 0.6 -> 0.8
        let c = estimate_confidence(&e).unwrap();
        assert!((c - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_clamped() {
        let high = emotions(&[("joy", 1.0), ("neutral", 1.0)]);
        assert_eq!(estimate_confidence(&high), Some(1.0));

        let low = emotions(&[("sadness", 1.0), ("fear", 1.0), ("anger", 1.0)]);
        assert_eq!(estimate_confidence(&low), Some(0.0));
    }

    #[test]
    fn test_confidence_in_unit_range_for_nonempty() {
        let cases = [
            emotions(&[("joy", 0.0)]),
            emotions(&[("anger", 0.7), ("joy", 0.1)]),
            emotions(&[("neutral", 0.99), ("sadness", 0.01)]),
        ];
        for e in &cases {
            let c = estimate_confidence(e).unwrap();
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_resolution_prefers_supplied_scores() {
        assert_eq!(resolve_clarity(Some(0.42), ""), (0.42, ScoreSource::Analyzer));
        assert_eq!(resolve_clarity(None, ""), (0.0, ScoreSource::Estimated));
        assert_eq!(
            resolve_clarity(Some(f64::NAN), "clear words"),
            (1.0, ScoreSource::Estimated)
        );

        let empty = EmotionScores::new();
        assert_eq!(resolve_confidence(Some(0.9), &empty), (0.9, ScoreSource::Analyzer));
        assert_eq!(resolve_confidence(None, &empty), (0.5, ScoreSource::Default));
        let e = emotions(&[("joy", 1.0)]);
        assert_eq!(resolve_confidence(None, &e), (1.0, ScoreSource::Estimated));
    }

    #[test]
    fn test_out_of_range_supplied_scores_are_clamped() {
        assert_eq!(resolve_clarity(Some(85.0), ""), (1.0, ScoreSource::Analyzer));
        assert_eq!(resolve_clarity(Some(-0.2), "clear words"), (0.0, ScoreSource::Analyzer));

        let empty = EmotionScores::new();
        assert_eq!(resolve_confidence(Some(-3.0), &empty), (0.0, ScoreSource::Analyzer));
        assert_eq!(resolve_confidence(Some(1.5), &empty), (1.0, ScoreSource::Analyzer));
        assert_eq!(supplied_score(Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_estimates_are_deterministic() {
        let t = "so basically I, um, rewrote it";
        assert_eq!(estimate_clarity(t).to_bits(), estimate_clarity(t).to_bits());
        let e = emotions(&[("joy", 0.31), ("neutral", 0.27), ("anger", 0.05)]);
        assert_eq!(estimate_confidence(&e), estimate_confidence(&e));
    }
}
