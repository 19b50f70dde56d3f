//! Session question composition
//!
//! Order: general, then domain, then résumé questions. Ids are normalized and
//! made unique within the session.

use coach_common::models::{Question, QuestionKind};
use std::collections::HashSet;
use std::sync::Arc;

use super::question_bank::QuestionSource;
use super::resume_questions::resume_questions;

/// Characters of question text used when a question has no id
const ID_FROM_TEXT_CHARS: usize = 24;

/// What to put in a new session's question list
#[derive(Debug, Clone)]
pub struct QuestionPlan {
    pub domain: Option<String>,
    pub resume_text: Option<String>,
    pub num_general: usize,
    pub num_domain: usize,
    pub num_resume: usize,
}

impl Default for QuestionPlan {
    fn default() -> Self {
        Self {
            domain: None,
            resume_text: None,
            num_general: 3,
            num_domain: 3,
            num_resume: 3,
        }
    }
}

pub struct QuestionPlanner {
    source: Arc<dyn QuestionSource>,
}

impl QuestionPlanner {
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self { source }
    }

    pub fn compose(&self, plan: &QuestionPlan) -> Vec<Question> {
        let domain = plan.domain.as_deref().filter(|d| !d.trim().is_empty());

        let mut questions = self.source.sample(QuestionKind::General, None, plan.num_general);
        questions.extend(self.source.sample(QuestionKind::Domain, domain, plan.num_domain));

        if let Some(resume) = plan.resume_text.as_deref().filter(|r| !r.trim().is_empty()) {
            questions.extend(resume_questions(resume, plan.num_resume));
        }

        normalize_ids(questions)
    }
}

/// Id from the question text: leading characters with spaces replaced by `-`
fn id_from_text(text: &str) -> String {
    text.chars().take(ID_FROM_TEXT_CHARS).collect()
}

/// Fill missing ids, replace spaces, and suffix duplicates with `-2`, `-3`, ...
pub fn normalize_ids(questions: Vec<Question>) -> Vec<Question> {
    let mut seen: HashSet<String> = HashSet::new();

    questions
        .into_iter()
        .map(|mut question| {
            let base = if question.id.trim().is_empty() {
                id_from_text(&question.text)
            } else {
                question.id.clone()
            };
            let base = base.replace(' ', "-");

            let mut id = base.clone();
            let mut n = 2;
            while seen.contains(&id) {
                id = format!("{}-{}", base, n);
                n += 1;
            }
            seen.insert(id.clone());

            question.id = id;
            question
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::question_bank::StaticQuestionBank;

    fn q(id: &str, text: &str) -> Question {
        Question {
            id: id.to_string(),
            text: text.to_string(),
            kind: QuestionKind::General,
            domain: None,
        }
    }

    #[test]
    fn test_normalize_fills_missing_ids() {
        let out = normalize_ids(vec![q("", "Walk me through your last project please")]);
        assert_eq!(out[0].id, "Walk-me-through-your-las");
    }

    #[test]
    fn test_normalize_dedupes() {
        let out = normalize_ids(vec![q("g 1", "a"), q("g-1", "b"), q("g-1", "c")]);
        let ids: Vec<&str> = out.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["g-1", "g-1-2", "g-1-3"]);
    }

    #[test]
    fn test_compose_order_and_counts() {
        let planner = QuestionPlanner::new(Arc::new(StaticQuestionBank::with_seed(11)));
        let plan = QuestionPlan {
            domain: Some("ai-ml".to_string()),
            resume_text: Some("Shipped a recommendation service in Python.".to_string()),
            num_general: 2,
            num_domain: 2,
            num_resume: 2,
        };

        let questions = planner.compose(&plan);
        let kinds: Vec<QuestionKind> = questions.iter().map(|q| q.kind).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionKind::General,
                QuestionKind::General,
                QuestionKind::Domain,
                QuestionKind::Domain,
                QuestionKind::Resume,
                QuestionKind::Resume,
            ]
        );
        assert!(questions[2..4].iter().all(|q| q.domain.as_deref() == Some("ai-ml")));

        let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), questions.len());
    }

    #[test]
    fn test_compose_without_resume() {
        let planner = QuestionPlanner::new(Arc::new(StaticQuestionBank::with_seed(5)));
        let plan = QuestionPlan {
            resume_text: Some("   ".to_string()),
            ..Default::default()
        };

        let questions = planner.compose(&plan);
        assert_eq!(questions.len(), 6);
        assert!(questions.iter().all(|q| q.kind != QuestionKind::Resume));
    }
}
