//! Content-kind registry.
//!
//! Each [`ContentKind`] maps to one static [`KindSpec`] bundling everything
//! the pipeline needs for that kind: length/structure profile, token hints,
//! prompt rules, refinement directives, validator and packing layout. The
//! orchestrator and packer select behaviour by lookup, never by branching
//! on the kind, so a new kind is one new table entry.
//!
//! | Kind        | Validator                  | Recovery pass | Numbered sections |
//! |-------------|----------------------------|---------------|-------------------|
//! | Explanation | `gate::explanation`        | yes           | yes (5)           |
//! | Roadmap     | `gate::roadmap`            | no            | no                |
//! | Quiz        | `gate::quiz`               | yes           | no                |
//! | StudyPlan   | `gate::study_plan`         | yes           | no                |
//! | RedTeam     | `gate::red_team`           | yes           | no                |
//! | Generic     | universal checks only      | no            | no                |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gate::{self, GateContext, QualityIssue};
use crate::packer::{PackOptions, SectionLayout};
use crate::prompts;

/// Declared category of a requested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Explanation,
    Roadmap,
    Quiz,
    StudyPlan,
    RedTeam,
    Generic,
}

impl ContentKind {
    /// Parse a user-facing kind name. Unknown names fall back to `Generic`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace('_', "-").as_str() {
            "explanation" | "explain" => Self::Explanation,
            "roadmap" => Self::Roadmap,
            "quiz" => Self::Quiz,
            "study-plan" | "studyplan" => Self::StudyPlan,
            "red-team" | "redteam" | "red-team-brief" => Self::RedTeam,
            _ => Self::Generic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explanation => "explanation",
            Self::Roadmap => "roadmap",
            Self::Quiz => "quiz",
            Self::StudyPlan => "study-plan",
            Self::RedTeam => "red-team",
            Self::Generic => "generic",
        }
    }

    pub fn all() -> &'static [ContentKind] {
        &[
            Self::Explanation,
            Self::Roadmap,
            Self::Quiz,
            Self::StudyPlan,
            Self::RedTeam,
            Self::Generic,
        ]
    }

    /// Registry entry for this kind.
    pub fn spec(self) -> &'static KindSpec {
        lookup(self)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Universal length and structure floor for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentTypeProfile {
    pub min_chars: usize,
    pub max_chars: Option<usize>,
    pub min_headings: usize,
    pub min_bullets: usize,
}

/// Output-token hints for the three generation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenHints {
    pub first: u32,
    pub refine: u32,
    pub recovery: u32,
}

/// Everything the pipeline knows about one content kind.
#[derive(Debug)]
pub struct KindSpec {
    pub kind: ContentKind,
    pub profile: ContentTypeProfile,
    pub hints: TokenHints,
    /// Required section titles, in order. Empty when the kind has none.
    pub sections: &'static [&'static str],
    /// Whether `sections` are numbered 1..N and delivered one chunk each.
    pub numbered_sections: bool,
    /// Static structure rules appended to the first-draft prompt.
    pub structure_rules: &'static [&'static str],
    /// Request-specific correction directives for refinement prompts.
    pub directives: fn(&GateContext) -> Vec<String>,
    /// Type-specific structural checks.
    pub validator: fn(&str, &GateContext) -> Vec<QualityIssue>,
    /// Whether a third, recovery pass is worth its cost.
    pub recovery_pass: bool,
    /// Accept a first draft whose only issue is overshooting `max_chars`
    /// by at most this fraction.
    pub length_tolerance: Option<f64>,
}

impl KindSpec {
    /// Packer section layout, present only for numbered-section kinds.
    pub fn section_layout(&self) -> Option<SectionLayout> {
        self.numbered_sections.then_some(SectionLayout {
            titles: self.sections,
        })
    }

    /// Packing options for this kind derived from a base configuration.
    pub fn pack_options(&self, base: &PackOptions) -> PackOptions {
        PackOptions {
            sections: self.section_layout(),
            ..base.clone()
        }
    }
}

pub const EXPLANATION_SECTIONS: &[&str] = &[
    "Overview",
    "How It Works",
    "Practical Examples",
    "Common Pitfalls",
    "Key Takeaways",
];

pub const STUDY_PLAN_SECTIONS: &[&str] = &[
    "Overview",
    "Weekly Breakdown",
    "Resources",
    "Practice Labs",
    "Alignment Notes",
    "Final Checklist",
];

pub const RED_TEAM_SECTIONS: &[&str] = &[
    "Objective",
    "Scope and Rules of Engagement",
    "Threat Model",
    "Reconnaissance",
    "Initial Access",
    "Execution and Persistence",
    "Privilege Escalation",
    "Lateral Movement",
    "Defender Notes",
    "Reporting",
];

fn no_directives(_ctx: &GateContext) -> Vec<String> {
    Vec::new()
}

fn no_checks(_doc: &str, _ctx: &GateContext) -> Vec<QualityIssue> {
    Vec::new()
}

static EXPLANATION: KindSpec = KindSpec {
    kind: ContentKind::Explanation,
    profile: ContentTypeProfile {
        min_chars: 1200,
        max_chars: Some(4200),
        min_headings: 5,
        min_bullets: 2,
    },
    hints: TokenHints {
        first: 1400,
        refine: 1900,
        recovery: 2400,
    },
    sections: EXPLANATION_SECTIONS,
    numbered_sections: true,
    structure_rules: prompts::EXPLANATION_RULES,
    directives: prompts::explanation_directives,
    validator: gate::explanation::validate,
    recovery_pass: true,
    length_tolerance: Some(0.12),
};

static ROADMAP: KindSpec = KindSpec {
    kind: ContentKind::Roadmap,
    profile: ContentTypeProfile {
        min_chars: 1400,
        max_chars: Some(6000),
        min_headings: 4,
        min_bullets: 6,
    },
    hints: TokenHints {
        first: 1600,
        refine: 2200,
        recovery: 2800,
    },
    sections: &[],
    numbered_sections: false,
    structure_rules: prompts::ROADMAP_RULES,
    directives: prompts::roadmap_directives,
    validator: gate::roadmap::validate,
    recovery_pass: false,
    length_tolerance: Some(0.12),
};

static QUIZ: KindSpec = KindSpec {
    kind: ContentKind::Quiz,
    profile: ContentTypeProfile {
        min_chars: 600,
        max_chars: Some(4000),
        min_headings: 1,
        min_bullets: 0,
    },
    hints: TokenHints {
        first: 1200,
        refine: 1600,
        recovery: 2000,
    },
    sections: &[],
    numbered_sections: false,
    structure_rules: prompts::QUIZ_RULES,
    directives: prompts::quiz_directives,
    validator: gate::quiz::validate,
    recovery_pass: true,
    length_tolerance: None,
};

static STUDY_PLAN: KindSpec = KindSpec {
    kind: ContentKind::StudyPlan,
    profile: ContentTypeProfile {
        min_chars: 1800,
        max_chars: Some(7000),
        min_headings: 6,
        min_bullets: 8,
    },
    hints: TokenHints {
        first: 2000,
        refine: 2600,
        recovery: 3200,
    },
    sections: STUDY_PLAN_SECTIONS,
    numbered_sections: false,
    structure_rules: prompts::STUDY_PLAN_RULES,
    directives: prompts::study_plan_directives,
    validator: gate::study_plan::validate,
    recovery_pass: true,
    length_tolerance: Some(0.12),
};

static RED_TEAM: KindSpec = KindSpec {
    kind: ContentKind::RedTeam,
    profile: ContentTypeProfile {
        min_chars: 2000,
        max_chars: Some(7500),
        min_headings: 10,
        min_bullets: 10,
    },
    hints: TokenHints {
        first: 1800,
        refine: 2400,
        recovery: 3000,
    },
    sections: RED_TEAM_SECTIONS,
    numbered_sections: false,
    structure_rules: prompts::RED_TEAM_RULES,
    directives: prompts::red_team_directives,
    validator: gate::red_team::validate,
    recovery_pass: true,
    length_tolerance: Some(0.12),
};

static GENERIC: KindSpec = KindSpec {
    kind: ContentKind::Generic,
    profile: ContentTypeProfile {
        min_chars: 200,
        max_chars: Some(3800),
        min_headings: 0,
        min_bullets: 0,
    },
    hints: TokenHints {
        first: 1100,
        refine: 1500,
        recovery: 1900,
    },
    sections: &[],
    numbered_sections: false,
    structure_rules: prompts::GENERIC_RULES,
    directives: no_directives,
    validator: no_checks,
    recovery_pass: false,
    length_tolerance: Some(0.12),
};

/// Registry lookup.
pub fn lookup(kind: ContentKind) -> &'static KindSpec {
    match kind {
        ContentKind::Explanation => &EXPLANATION,
        ContentKind::Roadmap => &ROADMAP,
        ContentKind::Quiz => &QUIZ,
        ContentKind::StudyPlan => &STUDY_PLAN,
        ContentKind::RedTeam => &RED_TEAM,
        ContentKind::Generic => &GENERIC,
    }
}
