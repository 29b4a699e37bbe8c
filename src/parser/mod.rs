mod rules;
mod types;

pub use rules::{detect_season, parse_season_number, SeasonMatch, SeasonRule, SEASON_RULES};
pub use types::*;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::classifier::DEFAULT_VIDEO_EXTENSIONS;

// Trailing video extension: "Show.S01E01.mkv"
static VIDEO_EXTENSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i)\.(?:{})$", DEFAULT_VIDEO_EXTENSIONS.join("|"));
    Regex::new(&pattern).unwrap()
});

// Leading [Group] tag
static GROUP_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[[^\]]*\]\s*").unwrap());

// Four digits with an optional "p" so that 1080p / 2160p can be rejected as years
static YEAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{4})(p)?\b").unwrap());

// v2, v3 revision markers
static VERSION_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\bv\d+\b").unwrap());

// Episode ranges: E01-E24, EP01-EP11 (a single E05 goes too)
static EPISODE_CODE_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(?\bEP?\s?\d+(?:\s?-\s?(?:EP?\s?)?\d+)?\b\)?").unwrap()
});

// (01-24)
static EPISODE_PAREN_RANGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\d+\s?-\s?\d+\)").unwrap());

// " - 00-23"
static EPISODE_DASH_RANGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+-\s*\d+-\d+\b").unwrap());

// Trailing [1080p], (BD FLAC), ...
static TRAILING_BRACKET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\[\(][^\]\)]*[\]\)]\s*$").unwrap());

// Technical keywords: everything from the first one onward is release metadata
static TECH_KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \s+
        (?:
            2160p | 1080p | 720p | 480p | 4k
          | bd | blu-?ray
          | web-?dl | web-?rip
          | hevc | x26[45] | h\.?26[45] | av1
          | flac | aac
          | dual-?audio | multi-?subs? | eng-?subs?
          | dual | multi
          | batch | complete | remux
          | ddp\d
          | nf | amzn | cr
        )
        (?:\s.*|$)",
    )
    .unwrap()
});

static LEADING_DASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-+\s*").unwrap());
static TRAILING_DASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-+\s*$").unwrap());

static MULTI_SPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MIN_YEAR: u32 = 1970;
const MAX_YEAR: u32 = 2030;

/// Derive a clean show name and optional season from a release folder or file name.
///
/// Never fails: an input made only of metadata yields an empty name.
pub fn parse_release_name(input: &str) -> ParseResult {
    let mut name = VIDEO_EXTENSION_REGEX.replace(input.trim(), "").into_owned();

    while GROUP_TAG_REGEX.is_match(&name) {
        name = GROUP_TAG_REGEX.replace(&name, "").into_owned();
    }

    name = normalize_separators(&name);

    let year = detect_year(&name);

    let season_match = detect_season(&name);
    if let Some(m) = &season_match {
        if m.rule.truncates_name() {
            name.truncate(m.start);
        }
    }

    name = VERSION_TAG_REGEX.replace_all(&name, "").into_owned();

    if let Some(m) = &season_match {
        name = m.rule.strip(&name);
    }

    name = strip_episode_ranges(&name);

    while TRAILING_BRACKET_REGEX.is_match(&name) {
        name = TRAILING_BRACKET_REGEX.replace(&name, "").into_owned();
    }

    name = TECH_KEYWORD_REGEX.replace(&name, "").into_owned();

    name = TRAILING_DASH_REGEX.replace(&name, "").into_owned();
    name = LEADING_DASH_REGEX.replace(&name, "").into_owned();

    if let Some(year) = year {
        name = remove_year(&name, year);
    }

    name = MULTI_SPACE_REGEX.replace_all(&name, " ").trim().to_string();

    if let Some(year) = year {
        if !name.is_empty() {
            name = format!("{} ({})", name, year);
        }
    }

    ParseResult {
        name,
        season: season_match.map(|m| m.season),
    }
}

/// Dot-style names ("Show.Name.S01") become space separated; underscores always do
fn normalize_separators(name: &str) -> String {
    let dots = name.matches('.').count();
    let spaces = name.matches(' ').count();

    let spaced = if dots > spaces && dots >= 2 {
        name.replace('.', " ")
    } else {
        name.to_string()
    };

    spaced.replace('_', " ")
}

fn detect_year(name: &str) -> Option<u32> {
    YEAR_REGEX.captures_iter(name).find_map(|caps| {
        if caps.get(2).is_some() {
            return None;
        }
        let year: u32 = caps.get(1)?.as_str().parse().ok()?;
        (MIN_YEAR..=MAX_YEAR).contains(&year).then_some(year)
    })
}

fn strip_episode_ranges(name: &str) -> String {
    let name = EPISODE_PAREN_RANGE_REGEX.replace_all(name, "");
    let name = EPISODE_CODE_RANGE_REGEX.replace_all(&name, "");
    EPISODE_DASH_RANGE_REGEX.replace_all(&name, "").into_owned()
}

fn remove_year(name: &str, year: u32) -> String {
    let year = year.to_string();
    name.replace(&format!("({})", year), "")
        .split_whitespace()
        .filter(|word| *word != year)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_parsed(input: &str, name: &str, season: Option<u32>) {
        let result = parse_release_name(input);
        assert_eq!(result.name, name, "name for {:?}", input);
        assert_eq!(result.season, season, "season for {:?}", input);
    }

    // ============ Reference Fixtures ============

    #[test]
    fn test_group_tag_with_season_code() {
        assert_parsed("[SubsPlease] Frieren S01 (1080p) [HEVC]", "Frieren", Some(1));
    }

    #[test]
    fn test_season_word_keeps_dotted_title() {
        assert_parsed("[sam] Dr. STONE Season 2 [BD 1080p FLAC]", "Dr. STONE", Some(2));
    }

    #[test]
    fn test_part_roman_numeral() {
        assert_parsed("[Group] JoJo Part III [BD 1080p]", "JoJo", Some(3));
    }

    #[test]
    fn test_dotted_movie_with_year() {
        assert_parsed(
            "One.Piece.Film.Red.2022.1080p.AMZN.WEB-DL.DDP5.1.H.264-VARYG.mkv",
            "One Piece Film Red (2022)",
            None,
        );
    }

    #[test]
    fn test_episode_code_truncates_episode_title() {
        assert_parsed(
            "Frieren.Beyond.Journeys.End.S02E05.Logistics.in.the.Northern.Plateau.1080p.NF.WEB-DL...mkv",
            "Frieren Beyond Journeys End",
            Some(2),
        );
    }

    // ============ Separators and Group Tags ============

    #[test]
    fn test_multiple_group_tags() {
        assert_parsed("[Group1] [Group2] My Show S02 [1080p]", "My Show", Some(2));
    }

    #[test]
    fn test_dot_style_naming() {
        assert_parsed("Show.Name.S01.1080p.BluRay.FLAC", "Show Name", Some(1));
        assert_parsed("Bocchi.the.Rock.S01.1080p.WEB-DL.AAC", "Bocchi the Rock", Some(1));
    }

    #[test]
    fn test_underscore_naming() {
        assert_parsed("[Group] Show_Name_S03 [720p]", "Show Name", Some(3));
    }

    // ============ Season Patterns ============

    #[test]
    fn test_ordinal_season() {
        assert_parsed(
            "[SubsPlease] Mushoku Tensei 2nd Season [BD 1080p FLAC]",
            "Mushoku Tensei",
            Some(2),
        );
        assert_parsed("[Group] Some Anime 3rd Season [1080p]", "Some Anime", Some(3));
    }

    #[test]
    fn test_season_with_leading_zero() {
        assert_parsed("[Group] Show Name Season 01 [1080p]", "Show Name", Some(1));
        assert_parsed("[Group] Show Name Season 00 [1080p]", "Show Name", Some(0));
    }

    #[test]
    fn test_part_number() {
        assert_parsed("[Group] Attack on Titan Part 2 [1080p]", "Attack on Titan", Some(2));
        assert_parsed("[Group] JoJo Part IV [BD]", "JoJo", Some(4));
    }

    #[test]
    fn test_cour() {
        assert_parsed("[Group] 86 Eighty-Six Cour 2 [1080p]", "86 Eighty-Six", Some(2));
    }

    #[test]
    fn test_season_code_after_dash() {
        assert_parsed("[Group] Show Name - S2 [1080p]", "Show Name", Some(2));
    }

    #[test]
    fn test_episode_code_range() {
        assert_parsed("[Group] Show S01E01-E24 [1080p]", "Show", Some(1));
    }

    // ============ Episode Ranges and Metadata ============

    #[test]
    fn test_parenthesized_episode_range() {
        assert_parsed("[SubsPlease] Dr. STONE (01-24) (1080p)", "Dr. STONE", None);
    }

    #[test]
    fn test_ep_prefixed_range() {
        assert_parsed("[Group] Show EP01-EP11 [1080p]", "Show", None);
    }

    #[test]
    fn test_dash_episode_range() {
        assert_parsed("[Group] Show - 01-12 [1080p]", "Show", None);
    }

    #[test]
    fn test_technical_keywords() {
        assert_parsed("[Group] Vinland Saga 1080p x265 FLAC Batch", "Vinland Saga", None);
        assert_parsed("[Group] Spy x Family Complete [1080p] [Batch]", "Spy x Family", None);
    }

    #[test]
    fn test_complex_batch_release() {
        assert_parsed(
            "[Erai-raws] Sousou no Frieren S01 (01-28) [1080p][Multiple Subtitle] [Batch]",
            "Sousou no Frieren",
            Some(1),
        );
    }

    #[test]
    fn test_version_tag_removed() {
        assert_parsed("[Group] Show Name S01 v2 [1080p]", "Show Name", Some(1));
    }

    #[test]
    fn test_version_tag_attached_to_code() {
        assert_parsed("[Grp] Show - S01E05v2 [1080p]", "Show", Some(1));
        assert_parsed("[Grp] Show S02v3 [1080p]", "Show", Some(2));
        assert_parsed("Show.Name.S01E01v2-E12v2.1080p", "Show Name", Some(1));
    }

    // ============ Years ============

    #[test]
    fn test_parenthesized_year_kept() {
        assert_parsed("[SubsPlease] Akira (1988) [1080p]", "Akira (1988)", None);
    }

    #[test]
    fn test_resolution_is_not_a_year() {
        assert_parsed("Some Movie 2160p", "Some Movie", None);
    }

    #[test]
    fn test_year_out_of_range_is_kept_as_text() {
        assert_parsed("Space Odyssey 2150", "Space Odyssey 2150", None);
    }

    #[test]
    fn test_detect_year() {
        assert_eq!(detect_year("Movie 2022 1080p"), Some(2022));
        assert_eq!(detect_year("Movie 1080p"), None);
        assert_eq!(detect_year("Movie 1969"), None);
        assert_eq!(detect_year("Movie 2030"), Some(2030));
    }

    // ============ Edge Cases ============

    #[test]
    fn test_pure_metadata_yields_empty_name() {
        assert_parsed("[Group] [1080p]", "", None);
    }

    #[test]
    fn test_plain_name_unchanged() {
        assert_parsed("  Cowboy Bebop  ", "Cowboy Bebop", None);
    }

    #[test]
    fn test_video_extension_stripped() {
        assert_parsed("Cowboy Bebop.mkv", "Cowboy Bebop", None);
        assert_parsed("Cowboy Bebop.MP4", "Cowboy Bebop", None);
    }

    #[test]
    fn test_deterministic() {
        let input = "[Group] Show.Name.S01.1080p";
        assert_eq!(parse_release_name(input), parse_release_name(input));
    }
}
