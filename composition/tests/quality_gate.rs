//! Quality gate scenarios over realistic drafts, one per content kind.

use composition::kinds::RED_TEAM_SECTIONS;
use composition::{evaluate, ContentKind, GateContext, GenerationRequest};

const QUIZ: &str = "\
# TCP Fundamentals Quiz

Answer each question, then check your choices against the key at the end.

1. Which flag opens a TCP connection during the three-way handshake?
A) SYN
B) FIN
C) RST
D) PSH

2. What does the receiver send after getting the first SYN segment?
A) ACK only
B) SYN-ACK
C) FIN-ACK
D) Nothing at all

3. Which TCP state follows a passive close when the application has not yet closed?
A) TIME_WAIT
B) CLOSE_WAIT
C) LISTEN
D) SYN_SENT

4. What field lets the receiver advertise how much data it can accept?
A) Urgent pointer
B) Checksum
C) Window size
D) Data offset

5. Why does an endpoint linger in TIME_WAIT after closing a connection?
A) To renegotiate the maximum segment size
B) To retransmit lost SYN segments
C) To let delayed duplicate segments expire
D) To keep the congestion window warm

## Answer Key
1. A
2. B
3. B
4. C
5. C
";

fn quiz_ctx() -> GateContext {
    GateContext::from_request(&GenerationRequest::new(
        ContentKind::Quiz,
        "5 questions on TCP connection handling",
    ))
}

#[test]
fn quiz_with_matching_answer_key_passes() {
    let ctx = quiz_ctx();
    assert_eq!(ctx.expected_questions, Some(5));
    let report = evaluate(ContentKind::Quiz, QUIZ, &ctx);
    assert!(report.pass, "{report}");
}

#[test]
fn quiz_with_short_answer_key_fails_on_mismatch() {
    let doc = QUIZ.replace("5. C\n", "");
    let report = evaluate(ContentKind::Quiz, &doc, &quiz_ctx());
    assert!(!report.pass);
    assert!(report
        .messages()
        .iter()
        .any(|m| m.contains("Answer key has 4 entries but the quiz has 5 questions")));
}

#[test]
fn quiz_missing_options_is_reported() {
    let doc = QUIZ.replace("D) PSH\n", "");
    let report = evaluate(ContentKind::Quiz, &doc, &quiz_ctx());
    assert!(report
        .messages()
        .iter()
        .any(|m| m.contains("missing four labeled options (A-D): 1")));
}

// ── Roadmap ─────────────────────────────────────────────────────────

fn roadmap(declared: u32, weeks: u32) -> String {
    let mut doc = format!(
        "# Cloud Security Roadmap\n\n**Duration:** {} Weeks\n\nA staged path from fundamentals to \
         hands-on cloud defense, with one theme per week and a small deliverable at the end of each.\n\n",
        declared
    );
    for w in 1..=weeks {
        doc.push_str(&format!(
            "### Week {w}: Theme {w}\n\
             - Study the core concepts for theme {w} using the provider documentation and notes\n\
             - Build a small lab exercise for theme {w} and record what you observed\n\
             - Review the week with a short written summary and three open questions\n\n"
        ));
    }
    doc
}

#[test]
fn roadmap_declaring_six_weeks_with_four_fails_coverage() {
    let report = evaluate(ContentKind::Roadmap, &roadmap(6, 4), &GateContext::default());
    assert!(!report.pass);
    assert!(report
        .messages()
        .iter()
        .any(|m| m.contains("Week coverage incomplete")));
}

#[test]
fn complete_roadmap_passes() {
    let report = evaluate(ContentKind::Roadmap, &roadmap(6, 6), &GateContext::default());
    assert!(report.pass, "{report}");
}

#[test]
fn requested_weeks_override_declared_duration() {
    let ctx = GateContext {
        expected_weeks: Some(8),
        ..Default::default()
    };
    let report = evaluate(ContentKind::Roadmap, &roadmap(6, 6), &ctx);
    assert!(!report.pass);
    assert!(report.messages().iter().any(|m| m.contains("must reach Week 8")));
}

// ── Explanation ─────────────────────────────────────────────────────

const EXPLANATION: &str = "\
## 1. Overview
DNS resolution is the process that turns a human friendly name such as example.org into the \
address a client can actually connect to. Every browser visit, package download and API call \
starts with this lookup, so its speed and integrity shape the whole experience. Understanding \
resolution helps you debug slow pages, spot misconfigured records and reason about attacks \
that target the naming layer. It is also one of the oldest protocols still in daily use.

## 2. How It Works
A stub resolver on the client sends the query to a recursive resolver, usually run by the ISP \
or the local network. The recursive resolver checks its cache first. On a miss it asks a root \
server, which refers it to the top level domain servers, which in turn refer it to the \
authoritative servers for the zone. The authoritative answer comes back with a time to live, \
and the recursive resolver caches it for that long before returning the address to the client. \
Negative answers are cached too, which is why a freshly created record can appear to be missing \
for a while.

## 3. Practical Examples
When a site loads slowly, compare the resolution time against the connection time to see \
which layer is responsible. Walk through a lookup by hand once so the referral chain feels \
concrete, and keep notes on what each server returned.
- Compare answers from two different recursive resolvers to spot stale caches
- Inspect the time to live on a record before planning a migration
- Lower the time to live a day ahead of changing an important record

## 4. Common Pitfalls
Most resolution problems come from caching behaviour that people forget about, or from \
records that were edited without considering who still holds the old answer.
- Avoid changing records with long time to live values right before a launch
- Never assume every client sees the same answer at the same moment
- Verify that negative caching is not hiding a record you just created

## 5. Key Takeaways
- Resolution is a chain of referrals ending at the authoritative servers
- Caching at every level trades freshness for speed
- Practice zone changes in a lab before touching production records
";

fn explanation_ctx() -> GateContext {
    GateContext::from_request(&GenerationRequest::new(
        ContentKind::Explanation,
        "How DNS resolution works",
    ))
}

#[test]
fn complete_explanation_passes() {
    let report = evaluate(ContentKind::Explanation, EXPLANATION, &explanation_ctx());
    assert!(report.pass, "{report}");
}

#[test]
fn explanation_missing_section_fails() {
    let doc = EXPLANATION.replace("## 4. Common Pitfalls", "## Gotchas");
    let report = evaluate(ContentKind::Explanation, &doc, &explanation_ctx());
    assert!(!report.pass);
    let messages = report.messages();
    assert!(messages
        .iter()
        .any(|m| m.contains("Missing required sections: Common Pitfalls")));
    assert!(messages
        .iter()
        .any(|m| m.contains("Expected exactly 5 numbered sections, found 4")));
}

#[test]
fn explanation_thin_section_fails() {
    let rest = EXPLANATION.find("## 2. How It Works").unwrap();
    let doc = format!(
        "## 1. Overview\nDNS resolution turns names such as example.org into addresses that \
         clients can connect to.\n\n{}",
        &EXPLANATION[rest..]
    );
    let report = evaluate(ContentKind::Explanation, &doc, &explanation_ctx());
    assert!(!report.pass);
    assert!(report
        .issues
        .iter()
        .any(|i| i.check == "explanation_depth" && i.detail.contains("Section 'Overview' is too thin")));
}

#[test]
fn command_topics_require_code_blocks() {
    let ctx = GateContext::from_request(&GenerationRequest::new(
        ContentKind::Explanation,
        "DNS resolution with the dig command",
    ));
    assert!(ctx.commands_relevant);
    let report = evaluate(ContentKind::Explanation, EXPLANATION, &ctx);
    assert!(report
        .messages()
        .iter()
        .any(|m| m.contains("at least 2 fenced code blocks")));
}

// ── Study plan ──────────────────────────────────────────────────────

const STUDY_PLAN: &str = "\
# Security+ Study Plan

## Overview
This four week plan prepares you for the Security+ exam with a steady emphasis on network \
defense. Each week pairs reading with a hands-on lab so concepts stick. The plan assumes about \
eight hours of study per week. By the end you should be comfortable with every exam domain.

## Weekly Breakdown
Follow the table in order and keep a short journal of what each lab taught you about the \
material. If a week runs long, carry the milestone into the next week rather than skipping it, \
and revisit the journal before the practice exams.

| Week | Focus | Topics | Labs | Milestone |
|---|---|---|---|---|
| 1 | Network defense basics | Threats, attacks and vulnerabilities | Packet capture walkthrough | Domain 1 quiz above 80 percent |
| 2 | Network defense architecture | Segmentation, firewalls and secure design | Firewall rule review | Diagram of a segmented network |
| 3 | Identity and access | Authentication, authorization and accounting | Directory hardening lab | Access control checklist |
| 4 | Operations and response | Incident response, forensics and governance | Log triage exercise | Full practice exam |

## Resources
- Official exam objectives document from the certification body
- One current study guide with end of chapter questions
- A video course to review weak domains before the exam
- Community flashcards for ports, protocols and acronyms

## Practice Labs
- Capture and inspect traffic between two virtual machines in an isolated lab
- Write and test firewall rules that block a simulated scan
- Harden a directory service and verify least privilege access
- Triage a sample log bundle and write a short incident summary

## Alignment Notes
- Weeks 1 and 2 map to the threats and architecture domains
- Week 3 maps to the identity and access management objectives
- Week 4 maps to operations, incident response and governance

## Final Checklist
- Review every exam objective and mark weak areas
- Retake the practice exam until you score above 85 percent
- Memorise common ports and their protocols
- Confirm the exam appointment and identification requirements
- Rest the day before the exam and skim your lab journal
";

fn study_plan_ctx() -> GateContext {
    GateContext::from_request(
        &GenerationRequest::new(ContentKind::StudyPlan, "Security+ in 4 weeks")
            .with_certification("Security+")
            .with_focus_area("network defense"),
    )
}

#[test]
fn complete_study_plan_passes() {
    let ctx = study_plan_ctx();
    assert_eq!(ctx.expected_weeks, Some(4));
    let report = evaluate(ContentKind::StudyPlan, STUDY_PLAN, &ctx);
    assert!(report.pass, "{report}");
}

#[test]
fn study_plan_table_gaps_and_br_tags_fail() {
    let doc = STUDY_PLAN
        .replace("| 4 | Operations", "| 5 | Operations")
        .replace("Threats, attacks", "Threats,<br>attacks");
    let report = evaluate(ContentKind::StudyPlan, &doc, &study_plan_ctx());
    let messages = report.messages();
    assert!(messages.iter().any(|m| m.contains("covers 3 of 4 weeks")));
    assert!(messages.iter().any(|m| m.contains("<br>")));
}

fn study_plan_messages(doc: &str, ctx: &GateContext) -> Vec<String> {
    let report = evaluate(ContentKind::StudyPlan, doc, ctx);
    assert!(!report.pass, "{report}");
    report.messages()
}

/// Replace the body between two headings of the fixture.
fn with_section_body(from: &str, to: &str, body: &str) -> String {
    let start = STUDY_PLAN.find(from).unwrap() + from.len();
    let end = STUDY_PLAN.find(to).unwrap();
    format!("{}\n{}\n\n{}", &STUDY_PLAN[..start], body, &STUDY_PLAN[end..])
}

#[test]
fn study_plan_overview_sentence_count_is_enforced() {
    let doc = STUDY_PLAN
        .replace(". Each week pairs", ", and each week pairs")
        .replace(". The plan assumes", ", and the plan assumes");
    let messages = study_plan_messages(&doc, &study_plan_ctx());
    assert!(messages
        .iter()
        .any(|m| m.contains("Overview should be 3-5 sentences, found 2")));
}

#[test]
fn study_plan_must_name_the_certification() {
    let ctx = GateContext::from_request(
        &GenerationRequest::new(ContentKind::StudyPlan, "CySA+ in 4 weeks")
            .with_certification("CySA+")
            .with_focus_area("network defense"),
    );
    let messages = study_plan_messages(STUDY_PLAN, &ctx);
    assert!(messages
        .iter()
        .any(|m| m.contains("never mentions the target certification 'CySA+'")));
}

#[test]
fn study_plan_short_checklist_fails() {
    let doc = STUDY_PLAN.replace("- Rest the day before the exam and skim your lab journal\n", "");
    let messages = study_plan_messages(&doc, &study_plan_ctx());
    assert!(messages.iter().any(|m| m
        .contains("Section 'Final Checklist' needs at least 5 itemized lines, found 4")));
}

#[test]
fn study_plan_short_alignment_notes_fail() {
    let doc = STUDY_PLAN.replace("- Week 4 maps to operations, incident response and governance\n", "");
    let messages = study_plan_messages(&doc, &study_plan_ctx());
    assert!(messages.iter().any(|m| m
        .contains("Section 'Alignment Notes' needs at least 3 itemized lines, found 2")));
}

#[test]
fn study_plan_sections_out_of_order_fail() {
    let resources = STUDY_PLAN.find("## Resources").unwrap();
    let labs = STUDY_PLAN.find("## Practice Labs").unwrap();
    let notes = STUDY_PLAN.find("## Alignment Notes").unwrap();
    let doc = format!(
        "{}{}{}{}",
        &STUDY_PLAN[..resources],
        &STUDY_PLAN[labs..notes],
        &STUDY_PLAN[resources..labs],
        &STUDY_PLAN[notes..]
    );
    let messages = study_plan_messages(&doc, &study_plan_ctx());
    assert!(messages
        .iter()
        .any(|m| m.contains("Sections out of order: 'Practice Labs' must come after 'Resources'")));
}

#[test]
fn study_plan_thin_section_fails() {
    let doc = with_section_body(
        "## Resources",
        "## Practice Labs",
        "- Official exam objectives\n- One study guide",
    );
    let messages = study_plan_messages(&doc, &study_plan_ctx());
    assert!(messages
        .iter()
        .any(|m| m.contains("Section 'Resources' is too thin: 6 words (minimum 30)")));
}

#[test]
fn study_plan_truncated_mid_section_fails() {
    let doc = format!("{}\n- Also remember to:\n", STUDY_PLAN.trim_end());
    let report = evaluate(ContentKind::StudyPlan, &doc, &study_plan_ctx());
    assert!(report.messages().iter().any(|m| m.contains("truncated")));
}

// ── Red-team brief ──────────────────────────────────────────────────

fn brief(defender_notes: &str) -> String {
    RED_TEAM_SECTIONS
        .iter()
        .map(|name| {
            let body = if *name == "Defender Notes" {
                defender_notes.to_string()
            } else {
                format!(
                    "- {name}: document the authorized activities for this phase, the tooling \
                     involved and how it maps to technique T1059.001 in the engagement plan\n\
                     - Record evidence for the {name} phase so the final report can reproduce \
                     every step within the agreed scope"
                )
            };
            format!("## {name}\n{body}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[test]
fn complete_brief_passes() {
    let doc = brief(
        "- Alert on Sysmon event ID 1 for encoded PowerShell launched by office applications\n\
         - Forward EDR telemetry to the SIEM and hunt for unusual parent-child process chains",
    );
    let report = evaluate(ContentKind::RedTeam, &doc, &GateContext::default());
    assert!(report.pass, "{report}");
}

#[test]
fn brief_without_detection_guidance_fails() {
    let doc = brief(
        "- Defenders should be aware of this whole engagement and its various phases over time\n\
         - Share the plan with the blue team leads ahead of the exercise window as agreed",
    );
    let report = evaluate(ContentKind::RedTeam, &doc, &GateContext::default());
    assert!(!report.pass);
    assert_eq!(report.issues[0].check, "red_team_detection");
}

#[test]
fn report_serializes_to_json() {
    let report = evaluate(ContentKind::Quiz, "# Quiz", &GateContext::default());
    let json: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
    assert_eq!(json["pass"], false);
    assert!(json["issues"].as_array().is_some_and(|a| !a.is_empty()));
}
