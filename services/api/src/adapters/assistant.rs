//! services/api/src/adapters/assistant.rs
//!
//! The scripted chat assistant. It implements the `ChatAssistant` port with
//! keyword-matched canned answers; there is no model behind it.

use async_trait::async_trait;
use learnhub_core::catalog::Catalog;
use learnhub_core::ports::{ChatAssistant, PortResult};
use regex::Regex;
use std::sync::OnceLock;

const FALLBACK: &str = "I'm not sure about that one yet. Try asking about courses, mentors, \
quizzes, certificates or scheduling a session.";

#[derive(Clone, Copy, Debug, PartialEq)]
enum Topic {
    Greeting,
    Certificates,
    Mentoring,
    Quizzes,
    Courses,
}

/// Keyword patterns in priority order. Matching is on whole words so "they"
/// is not a greeting and "latest" is not a test.
fn topics() -> &'static [(Topic, Regex)] {
    static TOPICS: OnceLock<Vec<(Topic, Regex)>> = OnceLock::new();
    TOPICS.get_or_init(|| {
        [
            (Topic::Greeting, r"\b(?:hello|hi|hey)\b"),
            (Topic::Certificates, r"\bcertificates?\b"),
            (Topic::Mentoring, r"\b(?:mentors?|sessions?|schedul\w*|book\w*)\b"),
            (Topic::Quizzes, r"\b(?:quiz\w*|tests?|exams?)\b"),
            (Topic::Courses, r"\b(?:courses?|learn\w*|recommend\w*)\b"),
        ]
        .into_iter()
        .map(|(topic, pattern)| (topic, Regex::new(pattern).expect("topic pattern is valid")))
        .collect()
    })
}

fn topic_of(text: &str) -> Option<Topic> {
    topics()
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(topic, _)| *topic)
}

#[derive(Clone)]
pub struct ScriptedAssistant {
    catalog: &'static Catalog,
}

impl ScriptedAssistant {
    pub fn new(catalog: &'static Catalog) -> Self {
        Self { catalog }
    }

    fn answer(&self, message: &str) -> String {
        let text = message.to_lowercase();
        if text.trim().is_empty() {
            return "Ask me anything about your learning.".to_string();
        }

        match topic_of(&text) {
            Some(Topic::Greeting) => "Hi! How can I help with your learning today?".to_string(),
            Some(Topic::Certificates) => "Certificates are issued automatically once every lesson \
in a course is complete. You can find them on your certificates page."
                .to_string(),
            Some(Topic::Mentoring) => {
                let available = self.catalog.mentors().iter().filter(|m| m.available).count();
                format!(
                    "There are {available} mentors available right now. Open the mentor directory \
to book a session or start an instant call."
                )
            }
            Some(Topic::Quizzes) => "Quizzes unlock after the lesson before them. Pass one and \
the lesson is marked complete for you."
                .to_string(),
            Some(Topic::Courses) => {
                let titles: Vec<&str> = self
                    .catalog
                    .courses()
                    .iter()
                    .map(|c| c.title.as_str())
                    .collect();
                format!("You could start with one of these: {}.", titles.join(", "))
            }
            None => FALLBACK.to_string(),
        }
    }
}

#[async_trait]
impl ChatAssistant for ScriptedAssistant {
    async fn reply(&self, message: &str) -> PortResult<String> {
        Ok(self.answer(message))
    }
}
