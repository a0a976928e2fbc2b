//! Request-derived expectations the validators check against.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::request::GenerationRequest;
use crate::text;

static QUESTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})[\s-]*(?:questions?|qs)\b")
        .expect("QUESTIONS_RE regex should compile")
});

static WEEKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})[\s-]*weeks?\b").expect("WEEKS_RE regex should compile")
});

/// Topic words that make shell commands or code snippets relevant.
const COMMAND_VOCABULARY: &[&str] = &[
    "bash", "cli", "code", "command", "commands", "configure", "curl", "docker", "git",
    "install", "kubectl", "linux", "nmap", "powershell", "python", "script", "scripting",
    "scripts", "shell", "snippet", "snippets", "terminal", "tool", "tools", "wireshark",
];

/// What the validators should expect from a draft for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GateContext {
    pub expected_questions: Option<u32>,
    pub expected_weeks: Option<u32>,
    pub certification: Option<String>,
    pub focus_area: Option<String>,
    /// Significant topic tokens, in first-seen order.
    pub topic_keywords: Vec<String>,
    /// Whether the topic asks for commands, tooling or code.
    pub commands_relevant: bool,
}

impl GateContext {
    /// Resolve explicit parameters, falling back to what the topic states.
    pub fn from_request(request: &GenerationRequest) -> Self {
        let topic = request.topic.as_str();
        let params = &request.params;
        Self {
            expected_questions: params
                .questions
                .or_else(|| capture_number(&QUESTIONS_RE, topic)),
            expected_weeks: params.weeks.or_else(|| capture_number(&WEEKS_RE, topic)),
            certification: non_blank(params.certification.as_deref()),
            focus_area: non_blank(params.focus_area.as_deref()),
            topic_keywords: text::keywords(topic),
            commands_relevant: mentions_commands(topic),
        }
    }
}

fn capture_number(re: &Regex, topic: &str) -> Option<u32> {
    re.captures(topic)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
        .filter(|n| *n > 0)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn mentions_commands(topic: &str) -> bool {
    super::mentions_any(topic, COMMAND_VOCABULARY)
}
