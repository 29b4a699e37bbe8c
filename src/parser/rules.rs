//! Season detection rules, evaluated in a fixed priority order.
//!
//! Each rule knows how to find its token, how to turn the captured text into a
//! season number, and how to remove its token from the name afterwards.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// S01E05, S01E05v2, S01E01-E24, S2E3-4
static EPISODE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bS(\d+)E\d+(?:v\d+)?(?:-E?\d+(?:v\d+)?)?\b").unwrap()
});

// S01, S2, S01v2
static SEASON_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d+)(?:v\d+)?\b").unwrap());

// 2nd Season, 3rd Season, 4th Season
static ORDINAL_SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([2-9])(?:nd|rd|th)\s+Season\b").unwrap());

// Season 2, Season02
static SEASON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSeason\s*(\d+)").unwrap());

static PART_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bPart\s+(\d+)").unwrap());

static PART_ROMAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bPart\s+(II|III|IV|V|VI|VII|VIII|IX)\b").unwrap()
});

static COUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bCour\s+(\d+)").unwrap());

// Removal patterns tolerate a separating dash before the token ("Show - S2")
static STRIP_SEASON_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-?\s*\bS\d+(?:v\d+)?\b").unwrap());
static STRIP_ORDINAL_SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-?\s*\b\d+(?:st|nd|rd|th)\s+Season\b").unwrap());
static STRIP_SEASON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-?\s*\bSeason\s*\d+").unwrap());
static STRIP_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*-?\s*\bPart\s+(?:\d+|II|III|IV|V|VI|VII|VIII|IX)\b").unwrap()
});
static STRIP_COUR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*-?\s*\bCour\s+\d+").unwrap());

const ROMAN_NUMERALS: [(&str, u32); 8] = [
    ("II", 2),
    ("III", 3),
    ("IV", 4),
    ("V", 5),
    ("VI", 6),
    ("VII", 7),
    ("VIII", 8),
    ("IX", 9),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonRule {
    /// `S<n>E<m>`; everything from the token onward is episode detail
    EpisodeCode,
    SeasonCode,
    OrdinalSeason,
    SeasonWord,
    PartNumber,
    PartRoman,
    Cour,
}

/// Priority order. The first rule that matches decides the season.
pub const SEASON_RULES: [SeasonRule; 7] = [
    SeasonRule::EpisodeCode,
    SeasonRule::SeasonCode,
    SeasonRule::OrdinalSeason,
    SeasonRule::SeasonWord,
    SeasonRule::PartNumber,
    SeasonRule::PartRoman,
    SeasonRule::Cour,
];

/// A successful rule match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonMatch {
    pub rule: SeasonRule,
    pub season: u32,
    /// Byte offset where the matched token starts
    pub start: usize,
}

impl SeasonRule {
    fn pattern(&self) -> &'static Regex {
        match self {
            SeasonRule::EpisodeCode => &EPISODE_CODE,
            SeasonRule::SeasonCode => &SEASON_CODE,
            SeasonRule::OrdinalSeason => &ORDINAL_SEASON,
            SeasonRule::SeasonWord => &SEASON_WORD,
            SeasonRule::PartNumber => &PART_NUMBER,
            SeasonRule::PartRoman => &PART_ROMAN,
            SeasonRule::Cour => &COUR,
        }
    }

    /// Try this rule against `name`
    pub fn apply(&self, name: &str) -> Option<SeasonMatch> {
        let caps = self.pattern().captures(name)?;
        let start = caps.get(0)?.start();
        let season = self.extract(&caps)?;

        Some(SeasonMatch {
            rule: *self,
            season,
            start,
        })
    }

    fn extract(&self, caps: &Captures<'_>) -> Option<u32> {
        let raw = caps.get(1)?.as_str();
        match self {
            SeasonRule::PartRoman => roman_to_season(raw),
            _ => parse_season_number(raw),
        }
    }

    /// Remove this rule's token from `name`.
    ///
    /// `EpisodeCode` has nothing to strip: the name was already cut before it.
    pub fn strip(&self, name: &str) -> String {
        let pattern: &Regex = match self {
            SeasonRule::EpisodeCode => return name.to_string(),
            SeasonRule::SeasonCode => &STRIP_SEASON_CODE,
            SeasonRule::OrdinalSeason => &STRIP_ORDINAL_SEASON,
            SeasonRule::SeasonWord => &STRIP_SEASON_WORD,
            SeasonRule::PartNumber | SeasonRule::PartRoman => &STRIP_PART,
            SeasonRule::Cour => &STRIP_COUR,
        };
        pattern.replace_all(name, "").into_owned()
    }

    pub fn truncates_name(&self) -> bool {
        matches!(self, SeasonRule::EpisodeCode)
    }
}

/// Find the season using the first rule that matches
pub fn detect_season(name: &str) -> Option<SeasonMatch> {
    SEASON_RULES.iter().find_map(|rule| rule.apply(name))
}

/// Parse a season number; leading zeros are ignored ("01" -> 1, "00" -> 0)
pub fn parse_season_number(raw: &str) -> Option<u32> {
    let trimmed = raw.trim_start_matches('0');
    if trimmed.is_empty() {
        return if raw.is_empty() { None } else { Some(0) };
    }
    trimmed.parse().ok()
}

fn roman_to_season(raw: &str) -> Option<u32> {
    let upper = raw.to_ascii_uppercase();
    ROMAN_NUMERALS
        .iter()
        .find(|(numeral, _)| *numeral == upper)
        .map(|(_, value)| *value)
}
