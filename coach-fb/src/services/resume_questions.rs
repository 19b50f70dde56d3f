//! Résumé-based question templates
//!
//! Questions are filled in this order until `max_questions` is reached:
//! 1. One per skill keyword found in the résumé
//! 2. One per project-like sentence (longer than 20 characters)
//! 3. A generic résumé prompt

use coach_common::models::{Question, QuestionKind};

/// Skill keywords matched case-insensitively as whole words
pub const SKILL_KEYWORDS: &[&str] = &[
    "python",
    "java",
    "c++",
    "pytorch",
    "tensorflow",
    "sklearn",
    "react",
    "node",
    "docker",
    "kubernetes",
    "nlp",
    "transformers",
    "sql",
    "postgres",
    "aws",
    "gcp",
    "azure",
];

const MIN_PROJECT_SENTENCE_CHARS: usize = 20;
const PROJECT_EXCERPT_CHARS: usize = 120;

const FALLBACK_QUESTION: &str =
    "Tell me about a project listed on your resume and the technical challenges you encountered.";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when `keyword` occurs in `haystack` not flanked by word characters
fn contains_word(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Skills from [`SKILL_KEYWORDS`] mentioned in the résumé, in keyword order
pub fn extract_skills(resume_text: &str) -> Vec<&'static str> {
    let text = resume_text.to_lowercase();
    SKILL_KEYWORDS
        .iter()
        .copied()
        .filter(|skill| contains_word(&text, skill))
        .collect()
}

fn project_sentences(resume_text: &str) -> Vec<&str> {
    resume_text
        .split(['.', '\n'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_PROJECT_SENTENCE_CHARS)
        .collect()
}

fn resume_question(id: String, text: String) -> Question {
    Question {
        id,
        text,
        kind: QuestionKind::Resume,
        domain: None,
    }
}

/// Template questions for a résumé
pub fn resume_questions(resume_text: &str, max_questions: usize) -> Vec<Question> {
    let resume_text = resume_text.trim();
    let mut out = Vec::with_capacity(max_questions);

    for (i, skill) in extract_skills(resume_text).into_iter().take(max_questions).enumerate() {
        out.push(resume_question(
            format!("resume-skill-{}", i),
            format!(
                "You listed experience with {skill}. Describe one project where you used {skill}: \
                 your role, technical choices, and outcome."
            ),
        ));
    }

    if !resume_text.is_empty() {
        for (i, sentence) in project_sentences(resume_text).into_iter().enumerate() {
            if out.len() >= max_questions {
                break;
            }
            let excerpt: String = sentence.chars().take(PROJECT_EXCERPT_CHARS).collect();
            out.push(resume_question(
                format!("resume-proj-{}", i),
                format!("I see: \"{}\". Can you explain this project and your contributions?", excerpt),
            ));
        }
    }

    while out.len() < max_questions {
        out.push(resume_question(
            format!("resume-fallback-{}", out.len()),
            FALLBACK_QUESTION.to_string(),
        ));
    }

    out
}
