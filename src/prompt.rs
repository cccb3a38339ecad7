//! Tutor system prompt builder with roleplay and reply-language lines

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Fixed persona lines, always present and always first
const PERSONA_LINES: [&str; 4] = [
    "You are Genie, a friendly English tutor for kids.",
    "Explain concepts simply with examples and ask engaging questions.",
    "Keep replies short (1-3 sentences) and encouraging.",
    "Use simple vocabulary and a warm tone.",
];

/// Roleplay scenario selectable by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scenario {
    #[serde(rename = "At School")]
    AtSchool,
    #[serde(rename = "At Store")]
    AtStore,
    #[serde(rename = "At Home")]
    AtHome,
}

impl Scenario {
    /// Every scenario, in display order
    pub const ALL: [Self; 3] = [Self::AtSchool, Self::AtStore, Self::AtHome];

    /// Human-readable label, also the wire value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AtSchool => "At School",
            Self::AtStore => "At Store",
            Self::AtHome => "At Home",
        }
    }
}

/// Language the tutor should reply in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Chinese,
    Japanese,
    Korean,
    Vietnamese,
}

impl Language {
    /// Every language, in display order
    pub const ALL: [Self; 10] = [
        Self::English,
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Italian,
        Self::Portuguese,
        Self::Chinese,
        Self::Japanese,
        Self::Korean,
        Self::Vietnamese,
    ];

    /// Human-readable label, also the wire value
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Italian => "Italian",
            Self::Portuguese => "Portuguese",
            Self::Chinese => "Chinese",
            Self::Japanese => "Japanese",
            Self::Korean => "Korean",
            Self::Vietnamese => "Vietnamese",
        }
    }
}

/// Value that did not match a known selector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownSelector {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for Scenario {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSelector {
                kind: "scenario",
                value: s.to_string(),
            })
    }
}

impl FromStr for Language {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSelector {
                kind: "language",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse an optional selector where blank means "off"
///
/// # Errors
///
/// Returns `UnknownSelector` for a non-blank value that matches nothing
pub fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, UnknownSelector>
where
    T: FromStr<Err = UnknownSelector>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

/// Roleplay text for the prompt
///
/// Known scenarios are normalized to their label. Any other non-blank text is
/// kept as given.
#[must_use]
pub fn roleplay_scenario(raw: Option<&str>) -> Option<String> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(
            value
                .parse::<Scenario>()
                .map_or_else(|_| value.to_string(), |s| s.label().to_string()),
        ),
    }
}

/// Build the tutor system prompt
///
/// Persona lines come first, then the roleplay line and the reply-language
/// line when those are selected. Lines are joined with `\n`.
#[must_use]
pub fn build_system_prompt(scenario: Option<&str>, language: Option<Language>) -> String {
    let mut lines: Vec<String> = PERSONA_LINES.iter().map(ToString::to_string).collect();

    if let Some(scenario) = scenario {
        lines.push(format!("Roleplay mode: {scenario}"));
    }
    if let Some(language) = language {
        lines.push(format!("Always reply in {language}."));
    }

    lines.join("\n")
}
