//! Prompt construction and advice extraction

use serde_json::{json, Value};

use crate::error::Error;
use crate::models::HealthAdvice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    SuspectedIssue,
    ActionPlan,
    NaturalRemedy,
    Tip,
}

impl Section {
    const ALL: [Section; 4] = [
        Section::SuspectedIssue,
        Section::ActionPlan,
        Section::NaturalRemedy,
        Section::Tip,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::SuspectedIssue => "Suspected Issue",
            Section::ActionPlan => "Action Plan",
            Section::NaturalRemedy => "Natural Remedy",
            Section::Tip => "Tip",
        }
    }

    fn json_key(self) -> &'static str {
        match self {
            Section::SuspectedIssue => "suspectedIssue",
            Section::ActionPlan => "actionPlan",
            Section::NaturalRemedy => "naturalRemedy",
            Section::Tip => "tip",
        }
    }

    /// Heading spellings, lowercase, longest first within a section
    fn headings(self) -> &'static [&'static str] {
        match self {
            Section::SuspectedIssue => &["suspected issues", "suspected issue", "suspected problem"],
            Section::ActionPlan => &["action plan"],
            Section::NaturalRemedy => &["natural remedies", "natural remedy"],
            Section::Tip => &["general tips", "general tip", "tips", "tip"],
        }
    }

    /// `suspectedIssue`, `suspected_issue` and `Suspected Issue` all normalize alike
    fn matches_key(self, key: &str) -> bool {
        let normalized = normalize_key(key);
        normalized == normalize_key(self.json_key())
            || self.headings().iter().any(|h| normalize_key(h) == normalized)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Build the consultation prompt for a farmer's description
pub fn build_prompt(input: &str) -> String {
    format!(
        "You are a Poultry Health Consultant in Nigeria. Based on the farmer's description, provide:\n\
         1. Suspected Issue: The most likely disease or health problem\n\
         2. Action Plan: Immediate steps to take\n\
         3. Natural Remedy: Low-cost, locally available solutions\n\
         4. Tip: General advice to improve poultry health\n\
         \n\
         Farmer's input: {}\n\
         \n\
         Respond with a JSON object with the string fields \"suspectedIssue\", \"actionPlan\", \
         \"naturalRemedy\" and \"tip\". If you cannot, use one section per heading, \
         each heading followed by a colon.",
        input.trim()
    )
}

/// Response schema requesting the four advice fields
pub fn advice_schema() -> Value {
    let properties: serde_json::Map<String, Value> = Section::ALL
        .iter()
        .map(|s| (s.json_key().to_string(), json!({ "type": "STRING" })))
        .collect();
    let required: Vec<&str> = Section::ALL.iter().map(|s| s.json_key()).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

/// Extract advice from model output.
///
/// Structured JSON is preferred, including JSON inside a Markdown code fence.
/// Free text falls back to heading-based sections, tolerating numbering,
/// emoji, Markdown emphasis and content on the heading line or the lines
/// after it. Any section left empty is an error naming what is missing.
pub fn parse_advice(text: &str) -> Result<HealthAdvice, Error> {
    let sections = match parse_json(text) {
        Some(sections) => sections,
        None => parse_sections(text),
    };

    let missing: Vec<&str> = Section::ALL
        .iter()
        .zip(sections.iter())
        .filter(|(_, content)| content.as_deref().map_or(true, |c| c.trim().is_empty()))
        .map(|(section, _)| section.title())
        .collect();
    if !missing.is_empty() {
        return Err(Error::parse(format!(
            "advice is missing sections: {}",
            missing.join(", ")
        )));
    }

    let [suspected_issue, action_plan, natural_remedy, tip] =
        sections.map(|s| s.unwrap_or_default().trim().to_string());
    Ok(HealthAdvice {
        suspected_issue,
        action_plan,
        natural_remedy,
        tip,
    })
}

fn parse_json(text: &str) -> Option<[Option<String>; 4]> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&text[start..=end]).ok()?;
    let object = value.as_object()?;

    let mut sections: [Option<String>; 4] = Default::default();
    for (key, value) in object {
        if let Some(index) = Section::ALL.iter().position(|s| s.matches_key(key)) {
            sections[index] = json_text(value);
        }
    }
    Some(sections)
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let lines: Vec<String> = items.iter().filter_map(json_text).collect();
            Some(lines.join("\n"))
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Markup that may surround a heading: bullets, emphasis, emoji, numbering
fn strip_heading_prefix(line: &str) -> &str {
    let line = line.trim_start_matches(|c: char| !c.is_alphanumeric());
    let line = line.trim_start_matches(|c: char| c.is_ascii_digit());
    line.trim_start_matches(|c: char| !c.is_alphanumeric())
}

/// If `line` is a heading, its section and any content on the same line
fn heading(line: &str) -> Option<(Section, &str)> {
    let stripped = strip_heading_prefix(line);
    let lower = stripped.to_lowercase();

    for section in Section::ALL {
        for name in section.headings() {
            if !lower.starts_with(name) {
                continue;
            }
            let Some(rest) = stripped.get(name.len()..) else {
                continue;
            };
            let rest = rest.trim_start_matches(['*', '_', ' ', '\t']);
            let rest = if let Some(after) = rest.strip_prefix(':') {
                after
            } else if let Some(after) = rest.strip_prefix(['-', '–']) {
                after
            } else if rest.is_empty() {
                rest
            } else {
                continue;
            };
            return Some((section, rest.trim_matches(['*', '_', ' ', '\t'])));
        }
    }
    None
}

fn parse_sections(text: &str) -> [Option<String>; 4] {
    let mut sections: [Option<String>; 4] = Default::default();
    let mut current: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.starts_with("```") {
            continue;
        }

        if let Some((section, inline)) = heading(line) {
            let index = Section::ALL.iter().position(|s| *s == section).unwrap_or(0);
            // Repeated headings keep the first occurrence.
            if sections[index].is_some() {
                current = None;
                continue;
            }
            sections[index] = Some(inline.to_string());
            current = Some(index);
            continue;
        }

        if let Some(index) = current {
            if let Some(content) = sections[index].as_mut() {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(line);
            }
        }
    }

    for content in sections.iter_mut().flatten() {
        *content = content.trim().to_string();
    }
    sections
}
