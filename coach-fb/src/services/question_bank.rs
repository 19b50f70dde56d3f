//! Built-in question banks
//!
//! General questions are drawn from a fixed bank; domain questions from a
//! domain bank filtered by domain, falling back to the whole domain bank when
//! the domain is absent or unknown.

use coach_common::models::{Question, QuestionKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

/// Source of interview questions used at session creation
pub trait QuestionSource: Send + Sync {
    /// Up to `count` questions of `kind`, in presentation order
    fn sample(&self, kind: QuestionKind, domain: Option<&str>, count: usize) -> Vec<Question>;
}

struct BankEntry {
    id: &'static str,
    domain: Option<&'static str>,
    text: &'static str,
}

const GENERAL_QUESTIONS: &[BankEntry] = &[
    BankEntry { id: "g-1", domain: None, text: "Tell me about yourself." },
    BankEntry { id: "g-2", domain: None, text: "What are your strengths and weaknesses?" },
    BankEntry { id: "g-3", domain: None, text: "Why do you want to work here?" },
    BankEntry { id: "g-4", domain: None, text: "Describe a time you showed leadership." },
    BankEntry { id: "g-5", domain: None, text: "How do you handle tight deadlines?" },
];

const DOMAIN_QUESTIONS: &[BankEntry] = &[
    BankEntry { id: "ai-1", domain: Some("ai-ml"), text: "Explain the bias-variance tradeoff." },
    BankEntry { id: "ai-2", domain: Some("ai-ml"), text: "How do you handle class imbalance in datasets?" },
    BankEntry { id: "ai-3", domain: Some("ai-ml"), text: "Describe a recent ML project you worked on." },
    BankEntry { id: "fs-1", domain: Some("fullstack"), text: "Explain how REST APIs differ from GraphQL." },
    BankEntry { id: "fs-2", domain: Some("fullstack"), text: "How do you ensure frontend performance?" },
    BankEntry { id: "fs-3", domain: Some("fullstack"), text: "Describe a deployment pipeline you built." },
];

impl BankEntry {
    fn to_question(&self, kind: QuestionKind) -> Question {
        Question {
            id: self.id.to_string(),
            text: self.text.to_string(),
            kind,
            domain: self.domain.map(str::to_string),
        }
    }
}

/// Random sampler over the built-in banks
pub struct StaticQuestionBank {
    rng: Mutex<StdRng>,
}

impl StaticQuestionBank {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sampling for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw(&self, pool: Vec<&BankEntry>, kind: QuestionKind, count: usize) -> Vec<Question> {
        let mut pool = pool;
        {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            pool.shuffle(&mut *rng);
        }
        pool.truncate(count);
        pool.into_iter().map(|entry| entry.to_question(kind)).collect()
    }
}

impl Default for StaticQuestionBank {
    fn default() -> Self {
        Self::new()
    }
}

impl QuestionSource for StaticQuestionBank {
    fn sample(&self, kind: QuestionKind, domain: Option<&str>, count: usize) -> Vec<Question> {
        match kind {
            QuestionKind::General => self.draw(GENERAL_QUESTIONS.iter().collect(), kind, count),
            QuestionKind::Domain => {
                let wanted = domain.map(|d| d.trim().to_lowercase());
                let filtered: Vec<&BankEntry> = DOMAIN_QUESTIONS
                    .iter()
                    .filter(|entry| entry.domain.map(str::to_string) == wanted)
                    .collect();

                let pool = if filtered.is_empty() {
                    DOMAIN_QUESTIONS.iter().collect()
                } else {
                    filtered
                };
                self.draw(pool, kind, count)
            }
            // Résumé and generated questions are not bank-backed
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_general_sample_is_distinct() {
        let bank = StaticQuestionBank::with_seed(7);
        let questions = bank.sample(QuestionKind::General, None, 3);
        assert_eq!(questions.len(), 3);

        let ids: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(questions.iter().all(|q| q.kind == QuestionKind::General));
    }

    #[test]
    fn test_sample_capped_at_bank_size() {
        let bank = StaticQuestionBank::with_seed(1);
        assert_eq!(bank.sample(QuestionKind::General, None, 50).len(), GENERAL_QUESTIONS.len());
        assert!(bank.sample(QuestionKind::General, None, 0).is_empty());
    }

    #[test]
    fn test_domain_filter() {
        let bank = StaticQuestionBank::with_seed(3);
        let questions = bank.sample(QuestionKind::Domain, Some("Fullstack"), 3);
        assert_eq!(questions.len(), 3);
        assert!(questions
            .iter()
            .all(|q| q.domain.as_deref() == Some("fullstack") && q.id.starts_with("fs-")));
    }

    #[test]
    fn test_unknown_domain_falls_back_to_whole_bank() {
        let bank = StaticQuestionBank::with_seed(3);
        let questions = bank.sample(QuestionKind::Domain, Some("quantum-basket-weaving"), 10);
        assert_eq!(questions.len(), DOMAIN_QUESTIONS.len());

        let questions = bank.sample(QuestionKind::Domain, None, 2);
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = StaticQuestionBank::with_seed(42).sample(QuestionKind::General, None, 3);
        let b = StaticQuestionBank::with_seed(42).sample(QuestionKind::General, None, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_resume_kind_not_bank_backed() {
        let bank = StaticQuestionBank::new();
        assert!(bank.sample(QuestionKind::Resume, None, 3).is_empty());
    }
}
