//! Inbound generation request handed over by the command layer.

use serde::{Deserialize, Serialize};

use crate::kinds::ContentKind;

/// Optional structured parameters collected by the command layer.
///
/// Anything left `None` is inferred from the topic text where possible
/// (see [`crate::gate::GateContext::from_request`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    /// Exact number of quiz questions requested.
    pub questions: Option<u32>,
    /// Plan or roadmap length in weeks.
    pub weeks: Option<u32>,
    /// Certification a study plan targets (e.g. "OSCP").
    pub certification: Option<String>,
    /// Focus area a study plan should emphasise.
    pub focus_area: Option<String>,
}

/// A topic request for one content kind.
///
/// `topic` is untrusted free text. Length capping and injection screening
/// happen upstream; prompts still fence it off as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ContentKind,
    pub topic: String,
    #[serde(default)]
    pub params: RequestParams,
}

impl GenerationRequest {
    pub fn new(kind: ContentKind, topic: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            params: RequestParams::default(),
        }
    }

    pub fn with_questions(mut self, questions: u32) -> Self {
        self.params.questions = Some(questions);
        self
    }

    pub fn with_weeks(mut self, weeks: u32) -> Self {
        self.params.weeks = Some(weeks);
        self
    }

    pub fn with_certification(mut self, certification: impl Into<String>) -> Self {
        self.params.certification = Some(certification.into());
        self
    }

    pub fn with_focus_area(mut self, focus_area: impl Into<String>) -> Self {
        self.params.focus_area = Some(focus_area.into());
        self
    }
}
