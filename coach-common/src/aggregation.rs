//! Session aggregation
//!
//! Reduces a session's chunk records into per-question reports and an overall
//! summary with recommendations. `aggregate_session` is pure; given the same
//! chunk set it produces the same report, field for field.
//! `complete_session` adds the store round trip (snapshot in, report out).

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    ChunkFeedback, EmotionScores, OverallMetrics, QuestionReport, Session, SessionReport,
    TranscriptFragment,
};
use crate::scoring::{resolve_clarity, resolve_confidence};
use crate::store::SessionStore;
use crate::{Error, Result};

/// Recommendation thresholds
///
/// Values are fixed; they live here rather than inline so the rules read by name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// avg_clarity strictly below this -> reduce fillers
    pub clarity_floor: f64,
    /// avg_confidence strictly below this -> build confidence
    pub confidence_floor: f64,
    /// avg sadness or fear strictly above this -> positive energy
    pub negative_emotion_ceiling: f64,
    /// avg joy strictly above this -> keep it up
    pub joy_highlight: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            clarity_floor: 0.6,
            confidence_floor: 0.6,
            negative_emotion_ceiling: 0.4,
            joy_highlight: 0.6,
        }
    }
}

/// Fixed recommendation catalogue, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ReduceFillers,
    BuildConfidence,
    PositiveEnergy,
    KeepExpressiveness,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::ReduceFillers => {
                "Reduce filler words and pause to form clearer sentences."
            }
            Recommendation::BuildConfidence => {
                "Practice speaking with more confidence; mock interviews help."
            }
            Recommendation::PositiveEnergy => {
                "Try to convey more positive energy and highlight accomplishments."
            }
            Recommendation::KeepExpressiveness => "Good expressiveness. Maintain this energy.",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendations for one question's averages, in rule order
pub fn recommend(
    avg_clarity: Option<f64>,
    avg_confidence: Option<f64>,
    avg_emotions: &EmotionScores,
    thresholds: &Thresholds,
) -> Vec<Recommendation> {
    let emotion = |label: &str| avg_emotions.get(label).copied().unwrap_or(0.0);
    let mut recs = Vec::new();

    if avg_clarity.is_some_and(|c| c < thresholds.clarity_floor) {
        recs.push(Recommendation::ReduceFillers);
    }
    if avg_confidence.is_some_and(|c| c < thresholds.confidence_floor) {
        recs.push(Recommendation::BuildConfidence);
    }
    if emotion("sadness") > thresholds.negative_emotion_ceiling
        || emotion("fear") > thresholds.negative_emotion_ceiling
    {
        recs.push(Recommendation::PositiveEnergy);
    }
    if emotion("joy") > thresholds.joy_highlight {
        recs.push(Recommendation::KeepExpressiveness);
    }

    recs
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Half-to-even rounding of a 0..1 score onto 0..100
pub fn performance_from_clarity(avg_clarity: f64) -> i64 {
    (avg_clarity * 100.0).round_ties_even() as i64
}

/// Aggregate the chunks recorded for one question
pub fn summarize_question(
    question_id: &str,
    chunks: &[ChunkFeedback],
    thresholds: &Thresholds,
) -> QuestionReport {
    let mut clarity_values = Vec::with_capacity(chunks.len());
    let mut confidence_values = Vec::with_capacity(chunks.len());
    let mut transcripts = Vec::with_capacity(chunks.len());
    let mut emotion_values: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for chunk in chunks {
        transcripts.push(TranscriptFragment {
            chunk_index: chunk.chunk_index,
            text: chunk.transcript.clone(),
        });

        let (clarity, _) = resolve_clarity(chunk.clarity_score, &chunk.transcript);
        clarity_values.push(clarity);

        let (confidence, _) = resolve_confidence(chunk.confidence_score, &chunk.emotions);
        confidence_values.push(confidence);

        for (label, score) in &chunk.emotions {
            emotion_values.entry(label.clone()).or_default().push(*score);
        }
    }

    let avg_clarity = mean(&clarity_values);
    let avg_confidence = mean(&confidence_values);
    // Labels are averaged only over the chunks that reported them
    let avg_emotions: EmotionScores = emotion_values
        .iter()
        .filter_map(|(label, values)| mean(values).map(|m| (label.clone(), m)))
        .collect();

    let recommendations = recommend(avg_clarity, avg_confidence, &avg_emotions, thresholds)
        .into_iter()
        .map(|r| r.as_str().to_string())
        .collect();

    QuestionReport {
        question_id: question_id.to_string(),
        chunks: chunks.to_vec(),
        transcripts,
        avg_clarity,
        avg_confidence,
        avg_emotions,
        performance: avg_clarity.map(performance_from_clarity),
        recommendations,
    }
}

/// Question ids in aggregation order: the session's question list first,
/// then orphan chunk groups (ids not in the list) in key order
fn group_order(session: &Session) -> Vec<&str> {
    let mut order: Vec<&str> = session
        .questions
        .iter()
        .map(|q| q.id.as_str())
        .filter(|id| session.chunks.contains_key(*id))
        .collect();
    let mut seen: HashSet<&str> = order.iter().copied().collect();

    for id in session.chunks.keys() {
        if seen.insert(id.as_str()) {
            order.push(id.as_str());
        }
    }
    order
}

/// Build the session report from a session snapshot
pub fn aggregate_session(session: &Session, thresholds: &Thresholds) -> SessionReport {
    let mut questions = Vec::new();
    let mut clarity_means = Vec::new();
    let mut confidence_means = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();
    let mut seen_recommendations: HashSet<String> = HashSet::new();

    for question_id in group_order(session) {
        let chunks = session
            .chunks
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let report = summarize_question(question_id, chunks, thresholds);

        if let Some(c) = report.avg_clarity {
            clarity_means.push(c);
        }
        if let Some(c) = report.avg_confidence {
            confidence_means.push(c);
        }
        for rec in &report.recommendations {
            if seen_recommendations.insert(rec.clone()) {
                recommendations.push(rec.clone());
            }
        }

        if !session.questions.iter().any(|q| q.id == question_id) {
            debug!(
                session_id = %session.id,
                question_id,
                "Aggregating orphan chunk group"
            );
        }
        questions.push(report);
    }

    SessionReport {
        session_id: session.id,
        questions,
        overall: OverallMetrics {
            avg_clarity: mean(&clarity_means),
            avg_confidence: mean(&confidence_means),
            recommendations,
        },
    }
}

/// Aggregate a session from the store and persist the report
///
/// Reads a point-in-time snapshot; chunks arriving while aggregation runs may
/// or may not be included. Calling this again re-aggregates and overwrites.
pub async fn complete_session(
    store: &dyn SessionStore,
    session_id: Uuid,
    thresholds: &Thresholds,
) -> Result<SessionReport> {
    let session = store
        .get(session_id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

    let report = aggregate_session(&session, thresholds);
    store.complete(session_id, report.clone()).await?;

    info!(
        session_id = %session_id,
        questions = report.questions.len(),
        chunks = session.chunk_count(),
        recommendations = report.overall.recommendations.len(),
        "Session aggregated"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkProvenance, NewSession, Question, QuestionKind};
    use chrono::{TimeZone, Utc};

    fn chunk(index: i64, transcript: &str) -> ChunkFeedback {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        ChunkFeedback {
            chunk_index: index,
            chunk_start_time: None,
            chunk_end_time: None,
            transcript: transcript.to_string(),
            clarity_score: None,
            confidence_score: None,
            emotions: EmotionScores::new(),
            audio_reference: format!("/uploads/{}.webm", index),
            saved_at: ts,
            processed_at: ts,
            provenance: ChunkProvenance::default(),
        }
    }

    fn with_clarity(mut c: ChunkFeedback, clarity: f64) -> ChunkFeedback {
        c.clarity_score = Some(clarity);
        c
    }

    fn with_emotions(mut c: ChunkFeedback, pairs: &[(&str, f64)]) -> ChunkFeedback {
        c.emotions = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        c
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            kind: QuestionKind::General,
            domain: None,
        }
    }

    fn session_with(questions: &[&str], chunks: Vec<(&str, ChunkFeedback)>) -> Session {
        let mut session = Session::new(NewSession {
            user_id: None,
            title: "Test".to_string(),
            questions: questions.iter().map(|id| question(id)).collect(),
        });
        for (qid, c) in chunks {
            session.chunks.entry(qid.to_string()).or_default().push(c);
        }
        session
    }

    #[test]
    fn test_mean_of_supplied_clarity() {
        let chunks = vec![
            with_clarity(chunk(0, "a"), 0.8),
            with_clarity(chunk(1, "b"), 0.4),
        ];
        let report = summarize_question("q1", &chunks, &Thresholds::default());
        assert!((report.avg_clarity.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(report.performance, Some(60));
        assert_eq!(report.transcripts.len(), 2);
        assert_eq!(report.chunks, chunks);
    }

    #[test]
    fn test_silent_chunks_still_resolve_scores() {
        let session = session_with(
            &["q1", "q2"],
            vec![
                ("q1", with_clarity(chunk(0, "a clear answer"), 0.9)),
                ("q2", chunk(0, "")),
                ("q2", chunk(1, "")),
            ],
        );
        let report = aggregate_session(&session, &Thresholds::default());
        let q2 = report.question("q2").unwrap();
        assert_eq!(q2.avg_clarity, Some(0.0));
        assert_eq!(q2.avg_confidence, Some(0.5));
        assert_eq!(q2.performance, Some(0));
        assert!(q2.avg_emotions.is_empty());
    }

    #[test]
    fn test_clarity_threshold_boundary() {
        let t = Thresholds::default();
        let below = summarize_question("q", &[with_clarity(chunk(0, "x"), 0.59)], &t);
        assert!(below
            .recommendations
            .contains(&Recommendation::ReduceFillers.to_string()));

        let at = summarize_question("q", &[with_clarity(chunk(0, "x"), 0.6)], &t);
        assert!(!at
            .recommendations
            .contains(&Recommendation::ReduceFillers.to_string()));
    }

    #[test]
    fn test_confidence_threshold_boundary() {
        let t = Thresholds::default();
        let mut low = with_clarity(chunk(0, "x"), 1.0);
        low.confidence_score = Some(0.59);
        let report = summarize_question("q", &[low], &t);
        assert_eq!(
            report.recommendations,
            vec![Recommendation::BuildConfidence.to_string()]
        );

        let mut ok = with_clarity(chunk(0, "x"), 1.0);
        ok.confidence_score = Some(0.6);
        assert!(summarize_question("q", &[ok], &t).recommendations.is_empty());
    }

    #[test]
    fn test_emotion_labels_averaged_over_reporting_chunks_only() {
        let chunks = vec![
            with_emotions(chunk(0, "a"), &[("joy", 0.9), ("fear", 0.1)]),
            with_emotions(chunk(1, "b"), &[("joy", 0.5)]),
            chunk(2, "c"),
        ];
        let report = summarize_question("q", &chunks, &Thresholds::default());
        assert!((report.avg_emotions["joy"] - 0.7).abs() < 1e-9);
        // fear reported once, not diluted by the two chunks without it
        assert!((report.avg_emotions["fear"] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_emotion_recommendations() {
        let t = Thresholds::default();
        let mut sad = with_emotions(with_clarity(chunk(0, "x"), 1.0), &[("sadness", 0.45)]);
        sad.confidence_score = Some(0.9);
        let report = summarize_question("q", &[sad], &t);
        assert_eq!(
            report.recommendations,
            vec![Recommendation::PositiveEnergy.to_string()]
        );

        let mut joyful = with_emotions(with_clarity(chunk(0, "x"), 1.0), &[("joy", 0.61)]);
        joyful.confidence_score = Some(0.9);
        let report = summarize_question("q", &[joyful], &t);
        assert_eq!(
            report.recommendations,
            vec![Recommendation::KeepExpressiveness.to_string()]
        );
    }

    #[test]
    fn test_multiple_recommendations_in_rule_order() {
        let c = with_emotions(chunk(0, "um uh like so"), &[("fear", 0.9)]);
        let report = summarize_question("q", &[c], &Thresholds::default());
        assert_eq!(
            report.recommendations,
            vec![
                Recommendation::ReduceFillers.to_string(),
                Recommendation::BuildConfidence.to_string(),
                Recommendation::PositiveEnergy.to_string(),
            ]
        );
    }

    #[test]
    fn test_overall_is_mean_of_question_means() {
        let session = session_with(
            &["q1", "q2"],
            vec![
                ("q1", with_clarity(chunk(0, "x"), 1.0)),
                ("q1", with_clarity(chunk(1, "x"), 1.0)),
                ("q1", with_clarity(chunk(2, "x"), 1.0)),
                ("q2", with_clarity(chunk(0, "x"), 0.5)),
            ],
        );
        let report = aggregate_session(&session, &Thresholds::default());
        // Chunk-weighted would be 0.875
        assert!((report.overall.avg_clarity.unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_overall_recommendations_deduplicated_first_wins() {
        let session = session_with(
            &["q1", "q2"],
            vec![
                ("q1", with_clarity(chunk(0, "x"), 0.1)),
                ("q2", with_clarity(chunk(0, "x"), 0.2)),
                ("q2", with_emotions(chunk(1, "y"), &[("sadness", 0.99)])),
            ],
        );
        let report = aggregate_session(&session, &Thresholds::default());
        let recs = &report.overall.recommendations;
        let unique: HashSet<&String> = recs.iter().collect();
        assert_eq!(unique.len(), recs.len());
        assert_eq!(recs[0], Recommendation::ReduceFillers.to_string());
        assert!(recs.contains(&Recommendation::PositiveEnergy.to_string()));
    }

    #[test]
    fn test_empty_session_produces_empty_report() {
        let session = session_with(&["q1"], vec![]);
        let report = aggregate_session(&session, &Thresholds::default());
        assert!(report.questions.is_empty());
        assert_eq!(report.overall.avg_clarity, None);
        assert_eq!(report.overall.avg_confidence, None);
        assert!(report.overall.recommendations.is_empty());
        assert_eq!(report.session_id, session.id);
    }

    #[test]
    fn test_orphan_chunks_form_their_own_group() {
        let session = session_with(
            &["q1"],
            vec![
                ("q1", with_clarity(chunk(0, "x"), 0.9)),
                ("unknown", with_clarity(chunk(0, "x"), 0.3)),
            ],
        );
        let report = aggregate_session(&session, &Thresholds::default());
        assert_eq!(report.questions.len(), 2);
        assert_eq!(report.question("unknown").unwrap().avg_clarity, Some(0.3));
    }

    #[test]
    fn test_report_follows_question_order_then_orphans() {
        let session = session_with(
            &["z-general", "a-domain", "m-unanswered"],
            vec![
                ("orphan-b", with_clarity(chunk(0, "x"), 0.5)),
                ("a-domain", with_clarity(chunk(0, "x"), 0.7)),
                ("orphan-a", with_clarity(chunk(0, "x"), 0.5)),
                ("z-general", with_clarity(chunk(0, "x"), 0.9)),
            ],
        );
        let report = aggregate_session(&session, &Thresholds::default());
        let ids: Vec<&str> = report.questions.iter().map(|q| q.question_id.as_str()).collect();
        assert_eq!(ids, vec!["z-general", "a-domain", "orphan-a", "orphan-b"]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["questions"][0]["question_id"], "z-general");
    }

    #[test]
    fn test_out_of_range_chunk_scores_keep_performance_bounded() {
        let mut c = with_clarity(chunk(0, "x"), 85.0);
        c.confidence_score = Some(-3.0);
        let report = summarize_question("q", &[c], &Thresholds::default());
        assert_eq!(report.avg_clarity, Some(1.0));
        assert_eq!(report.avg_confidence, Some(0.0));
        assert_eq!(report.performance, Some(100));
    }

    #[test]
    fn test_storage_order_preserved_not_chunk_index() {
        let chunks = vec![chunk(5, "five"), chunk(1, "one"), chunk(3, "three")];
        let report = summarize_question("q", &chunks, &Thresholds::default());
        let indices: Vec<i64> = report.transcripts.iter().map(|t| t.chunk_index).collect();
        assert_eq!(indices, vec![5, 1, 3]);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let session = session_with(
            &["q1", "q2"],
            vec![
                ("q1", with_emotions(chunk(0, "so I think"), &[("joy", 0.3), ("neutral", 0.4)])),
                ("q2", with_clarity(chunk(0, "x"), 0.77)),
                ("q1", with_emotions(chunk(1, "um right"), &[("anger", 0.2)])),
            ],
        );
        let first = serde_json::to_vec(&aggregate_session(&session, &Thresholds::default())).unwrap();
        let second = serde_json::to_vec(&aggregate_session(&session, &Thresholds::default())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_performance_rounds_half_to_even() {
        assert_eq!(performance_from_clarity(0.625), 62);
        assert_eq!(performance_from_clarity(0.375), 38);
        assert_eq!(performance_from_clarity(1.0), 100);
        assert_eq!(performance_from_clarity(0.0), 0);
    }
}
