//! Language detection and question translation.
//!
//! Detection runs on a short prefix of the patient description. Translation
//! is batch-per-trial: all questions go out in one numbered prompt and the
//! reply is re-split by its numbering.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::agent::{json_extract, AgentConfig, AgentSession};
use crate::config::{AgentDefaults, LanguageConfig};
use crate::error::Result;
use crate::questions::Question;

const DETECTOR_AGENT: &str = "language_detector";
const TRANSLATOR_AGENT: &str = "translator";

/// Languages the pipeline will translate into. Anything else falls back to
/// English.
pub const SUPPORTED: &[(&str, &str)] = &[
    ("en", "English"),
    ("fr", "French"),
    ("es", "Spanish"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ar", "Arabic"),
];

pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[derive(Debug, Deserialize)]
struct DetectionReply {
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    language_name: String,
}

pub struct LanguageService {
    session: Arc<AgentSession>,
    sample_chars: usize,
}

impl LanguageService {
    pub fn new(
        session: Arc<AgentSession>,
        defaults: &AgentDefaults,
        config: &LanguageConfig,
    ) -> Self {
        session.register(
            AgentConfig::from_defaults(DETECTOR_AGENT, defaults)
                .with_description("Identifies the language of patient text")
                .with_temperature(0.0),
        );
        session.register(
            AgentConfig::from_defaults(TRANSLATOR_AGENT, defaults)
                .with_description("Translates screening questions for patients"),
        );
        Self {
            session,
            sample_chars: config.detection_sample_chars,
        }
    }

    /// Detects the language of `text`, returning a supported code. Falls
    /// back to `en` whenever the reply cannot be matched to one.
    pub async fn detect_language(&self, text: &str) -> Result<String> {
        let sample: String = text.chars().take(self.sample_chars).collect();
        if sample.trim().is_empty() {
            return Ok("en".to_string());
        }

        let supported = SUPPORTED
            .iter()
            .map(|(code, name)| format!("{code} ({name})"))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Identify the language of the text below. Supported languages: \
             {supported}.\n\nText:\n{sample}\n\n\
             Respond with JSON only: {{\"language_code\": \"xx\", \
             \"language_name\": \"...\"}}"
        );

        let reply = self.session.chat_with_retry(DETECTOR_AGENT, &prompt).await?;
        let code = resolve_language(&reply);
        info!(language = %code, "Detected patient language");
        Ok(code)
    }

    /// Translates one plain text into the target language. English is a
    /// no-op.
    pub async fn translate_text(&self, text: &str, target: &str) -> Result<String> {
        if target == "en" || text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let name = language_name(target).unwrap_or(target);
        let prompt = format!(
            "Translate the following text into {name}. Keep the meaning \
             exact and the tone plain. Respond with the translation only, \
             no commentary.\n\n{text}"
        );
        self.session.chat_with_retry(TRANSLATOR_AGENT, &prompt).await
    }

    /// Translates a batch of questions in place, preserving identifiers and
    /// recording the original wording on each question. English is a no-op.
    pub async fn translate_questions(
        &self,
        questions: &mut [Question],
        target: &str,
    ) -> Result<()> {
        if target == "en" || questions.is_empty() {
            return Ok(());
        }
        let name = language_name(target).unwrap_or(target);
        let numbered = questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Translate these {count} yes/no screening questions into {name}. \
             Keep each one a single yes/no question. Reply with the same \
             numbered list, one translation per line, nothing else.\n\n{numbered}",
            count = questions.len(),
        );

        let reply = self.session.chat_with_retry(TRANSLATOR_AGENT, &prompt).await?;
        let translations = parse_numbered_translations(&reply, questions.len());
        if translations.len() != questions.len() {
            warn!(
                expected = questions.len(),
                got = translations.len(),
                "Translation count mismatch, keeping original wording"
            );
            return Ok(());
        }
        for (question, translated) in questions.iter_mut().zip(translations) {
            question.original_question = Some(std::mem::replace(&mut question.text, translated));
        }
        Ok(())
    }
}

/// Pulls a supported language code out of a detection reply. Tries the JSON
/// shape first, then scans the raw text for a code or a language name.
fn resolve_language(reply: &str) -> String {
    if let Some(value) = json_extract::first_object(reply) {
        if let Ok(parsed) = serde_json::from_value::<DetectionReply>(value) {
            let code = parsed.language_code.trim().to_lowercase();
            if language_name(&code).is_some() {
                return code;
            }
            let name = parsed.language_name.trim().to_lowercase();
            if let Some((code, _)) = SUPPORTED.iter().find(|(_, n)| n.to_lowercase() == name) {
                return code.to_string();
            }
        }
    }

    let lower = reply.to_lowercase();
    for (code, name) in SUPPORTED {
        if lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == *code)
            || lower.contains(&name.to_lowercase())
        {
            return code.to_string();
        }
    }
    "en".to_string()
}

/// Splits a numbered reply back into individual translations. Lines led by
/// `N.` or `N)` markers win; if no markers are found, the first `expected`
/// non-empty lines are taken instead.
fn parse_numbered_translations(reply: &str, expected: usize) -> Vec<String> {
    let mut numbered = Vec::new();
    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = strip_number_marker(line) {
            if !rest.is_empty() {
                numbered.push(rest.to_string());
            }
        }
    }
    if numbered.len() == expected {
        return numbered;
    }

    reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(expected)
        .map(|l| strip_number_marker(l).unwrap_or(l).to_string())
        .collect()
}

fn strip_number_marker(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .map(str::trim)
}
