//! Parses album folder names into year/name/edition/pattern, and classifies
//! enhanced (type-folder) nesting.

use crate::core::config::{MAX_YEAR, MIN_YEAR};
use crate::domain::models::AlbumType;
use regex::Regex;
use std::sync::OnceLock;

/// The naming convention a single folder name matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    DefaultWithEdition,
    DefaultNoEdition,
    LegacyWithEdition,
    LegacyNoEdition,
    Invalid,
}

impl PatternKind {
    /// The string stored in `FolderStructure::detected_patterns`, with the
    /// `enhanced_` prefix applied when the album sits under a type folder.
    pub fn as_str(&self, enhanced: bool) -> &'static str {
        match (self, enhanced) {
            (PatternKind::DefaultWithEdition, false) => "default_with_edition",
            (PatternKind::DefaultWithEdition, true) => "enhanced_default_with_edition",
            (PatternKind::DefaultNoEdition, false) => "default_no_edition",
            (PatternKind::DefaultNoEdition, true) => "enhanced_default_no_edition",
            (PatternKind::LegacyWithEdition, false) => "legacy_with_edition",
            (PatternKind::LegacyWithEdition, true) => "enhanced_legacy_with_edition",
            (PatternKind::LegacyNoEdition, false) => "legacy_no_edition",
            (PatternKind::LegacyNoEdition, true) => "enhanced_legacy_no_edition",
            (PatternKind::Invalid, _) => "invalid",
        }
    }
}

/// The result of parsing a single folder name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFolder {
    pub year: String,
    pub album_name: String,
    pub edition: String,
    /// The edition text as it appeared in the folder name, before
    /// `normalize_edition` mapped it to its canonical form. Empty when no
    /// edition was parsed. Kept alongside `edition` so callers can tell a
    /// folder that already used canonical formatting from one that didn't.
    pub edition_raw: String,
    pub pattern: PatternKind,
    pub enhanced: bool,
    pub album_type: Option<AlbumType>,
}

const EDITION_KEYWORDS: &[&str] = &[
    "deluxe",
    "limited",
    "anniversary",
    "remastered",
    "remaster",
    "remix",
    "special",
    "expanded",
    "director's cut",
    "collector's",
    "premium",
    "ultimate",
    "bonus",
    "extended",
    "platinum",
    "gold",
    "complete",
    "definitive",
    "live",
    "demo",
    "instrumental",
    "split",
    "acoustic",
    "unplugged",
];

const TYPE_FOLDER_KEYWORDS: &[(&str, AlbumType)] = &[
    ("live", AlbumType::Live),
    ("greatest hits", AlbumType::Compilation),
    ("ep", AlbumType::EP),
    ("demo", AlbumType::Demo),
    ("instrumental", AlbumType::Instrumental),
    ("split", AlbumType::Split),
];

fn type_name_keywords(t: AlbumType) -> &'static [&'static str] {
    match t {
        AlbumType::Live => &["live", "concert", "unplugged", "acoustic"],
        AlbumType::Demo => &["demo", "demos"],
        AlbumType::EP => &["ep"],
        AlbumType::Single => &["single"],
        AlbumType::Compilation => &["compilation", "greatest hits", "best of"],
        AlbumType::Instrumental => &["instrumental"],
        AlbumType::Split => &["split", "vs.", "vs", "versus", "with"],
        AlbumType::Album => &[],
    }
}

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(19[5-9]\d|20[0-2]\d|2030)$").expect("valid regex"))
}

fn default_with_edition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}) - (.+?) \((.+?)\)$").expect("valid regex"))
}

fn default_no_edition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}) - (.+)$").expect("valid regex"))
}

fn legacy_with_edition_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?) \((.+?)\)$").expect("valid regex"))
}

fn whitespace_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn trailing_periods_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.{2,}$").expect("valid regex"))
}

/// Stateless folder-name parser. Grouped as a type (rather than free
/// functions) so a future caller can hold configuration such as a custom
/// edition vocabulary without changing the call sites.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderParser;

impl FolderParser {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid_year(&self, year: &str) -> bool {
        year_regex().is_match(year)
    }

    fn year_in_range(year: &str) -> bool {
        year.parse::<u32>()
            .map(|y| (MIN_YEAR..=MAX_YEAR).contains(&y))
            .unwrap_or(false)
    }

    pub fn is_valid_edition(&self, candidate: &str) -> bool {
        let lower = candidate.to_lowercase();
        EDITION_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }

    /// Collapse whitespace, space out punctuation, and strip trailing noise.
    pub fn normalize_album_name(&self, name: &str) -> String {
        let collapsed = whitespace_run_regex().replace_all(name.trim(), " ");
        let mut spaced = String::with_capacity(collapsed.len());
        let chars: Vec<char> = collapsed.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            spaced.push(c);
            if matches!(c, '.' | ',' | ':') {
                let next_is_space = chars.get(i + 1).map(|n| n.is_whitespace()).unwrap_or(true);
                let next_is_digit_after_dot = c == '.' && chars.get(i + 1).map(|n| n.is_ascii_digit()).unwrap_or(false);
                if !next_is_space && !next_is_digit_after_dot {
                    spaced.push(' ');
                }
            }
        }
        let trimmed = trailing_periods_regex().replace(&spaced, "");
        trimmed.trim_end_matches(',').trim().to_string()
    }

    /// Map a free-text edition string to its canonical form.
    pub fn normalize_edition(&self, edition: &str) -> String {
        let lower = edition.trim().to_lowercase();
        let canonical = match lower.as_str() {
            "deluxe" | "deluxe edition" => "Deluxe Edition",
            "limited" | "limited edition" => "Limited Edition",
            "anniversary" | "anniversary edition" => "Anniversary Edition",
            "remaster" | "remastered" => "Remastered",
            "remix" => "Remix",
            "special" | "special edition" => "Special Edition",
            "expanded" | "expanded edition" => "Expanded Edition",
            "director's cut" => "Director's Cut",
            "collector's" | "collector's edition" => "Collector's Edition",
            "premium" | "premium edition" => "Premium Edition",
            "ultimate" | "ultimate edition" => "Ultimate Edition",
            "bonus" | "bonus edition" => "Bonus Edition",
            "extended" | "extended edition" => "Extended Edition",
            "platinum" | "platinum edition" => "Platinum Edition",
            "gold" | "gold edition" => "Gold Edition",
            "complete" | "complete edition" => "Complete Edition",
            "definitive" | "definitive edition" => "Definitive Edition",
            _ => return title_case(edition.trim()),
        };
        canonical.to_string()
    }

    /// Parse a single folder name in isolation (no enhanced-structure context).
    pub fn parse_folder_name(&self, name: &str) -> ParsedFolder {
        let name = name.trim();
        if name.is_empty() {
            return ParsedFolder {
                year: String::new(),
                album_name: String::new(),
                edition: String::new(),
                edition_raw: String::new(),
                pattern: PatternKind::Invalid,
                enhanced: false,
                album_type: None,
            };
        }

        if let Some(caps) = default_with_edition_regex().captures(name) {
            let year = caps[1].to_string();
            let candidate_name = caps[2].to_string();
            let candidate_edition = caps[3].to_string();
            if Self::year_in_range(&year) && self.is_valid_edition(&candidate_edition) {
                return ParsedFolder {
                    year,
                    album_name: self.normalize_album_name(&candidate_name),
                    edition: self.normalize_edition(&candidate_edition),
                    edition_raw: candidate_edition,
                    pattern: PatternKind::DefaultWithEdition,
                    enhanced: false,
                    album_type: None,
                };
            }
            // Not a recognized edition: fold the parenthetical back into the name.
            let folded = format!("{} ({})", candidate_name, candidate_edition);
            return ParsedFolder {
                year,
                album_name: self.normalize_album_name(&folded),
                edition: String::new(),
                edition_raw: String::new(),
                pattern: PatternKind::DefaultNoEdition,
                enhanced: false,
                album_type: None,
            };
        }

        if let Some(caps) = default_no_edition_regex().captures(name) {
            let year = caps[1].to_string();
            if Self::year_in_range(&year) {
                return ParsedFolder {
                    year,
                    album_name: self.normalize_album_name(&caps[2]),
                    edition: String::new(),
                    edition_raw: String::new(),
                    pattern: PatternKind::DefaultNoEdition,
                    enhanced: false,
                    album_type: None,
                };
            }
        }

        if let Some(caps) = legacy_with_edition_regex().captures(name) {
            let candidate_name = caps[1].to_string();
            let candidate_edition = caps[2].to_string();
            if self.is_valid_edition(&candidate_edition) {
                return ParsedFolder {
                    year: String::new(),
                    album_name: self.normalize_album_name(&candidate_name),
                    edition: self.normalize_edition(&candidate_edition),
                    edition_raw: candidate_edition,
                    pattern: PatternKind::LegacyWithEdition,
                    enhanced: false,
                    album_type: None,
                };
            }
        }

        ParsedFolder {
            year: String::new(),
            album_name: self.normalize_album_name(name),
            edition: String::new(),
            edition_raw: String::new(),
            pattern: PatternKind::LegacyNoEdition,
            enhanced: false,
            album_type: None,
        }
    }

    /// Detect whether `parent_name` is a type folder, returning the type if so.
    pub fn detect_type_folder(&self, parent_name: &str) -> Option<AlbumType> {
        if let Some(t) = AlbumType::from_folder_name(parent_name) {
            return Some(t);
        }
        let lower = parent_name.to_lowercase();
        TYPE_FOLDER_KEYWORDS
            .iter()
            .find(|(kw, _)| lower.contains(kw))
            .map(|(_, t)| *t)
    }

    /// Infer an album's type from its own folder/album name when no type
    /// folder parent is present.
    pub fn detect_type_from_name(&self, album_name: &str) -> AlbumType {
        let lower = album_name.to_lowercase();
        for t in AlbumType::ALL {
            if type_name_keywords(t).iter().any(|kw| lower.contains(kw)) {
                return t;
            }
        }
        AlbumType::Album
    }

    /// Parse a folder name together with its immediate parent directory name,
    /// applying enhanced-structure (type-folder) detection.
    pub fn parse_with_parent(&self, name: &str, parent_name: Option<&str>) -> ParsedFolder {
        let mut parsed = self.parse_folder_name(name);
        let type_folder = parent_name.and_then(|p| self.detect_type_folder(p));
        if let Some(t) = type_folder {
            parsed.enhanced = true;
            parsed.album_type = Some(t);
        } else {
            parsed.album_type = Some(self.detect_type_from_name(&parsed.album_name));
        }
        parsed
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_with_recognized_edition() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("1995 - The Bends (Deluxe Edition)");
        assert_eq!(parsed.pattern, PatternKind::DefaultWithEdition);
        assert_eq!(parsed.year, "1995");
        assert_eq!(parsed.album_name, "The Bends");
        assert_eq!(parsed.edition, "Deluxe Edition");
        assert_eq!(parsed.edition_raw, "Deluxe Edition");
    }

    #[test]
    fn keeps_raw_edition_text_distinct_from_normalized_form() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("2001 - Amnesiac (deluxe)");
        assert_eq!(parsed.edition_raw, "deluxe");
        assert_eq!(parsed.edition, "Deluxe Edition");
        assert_ne!(parsed.edition_raw, parsed.edition);
    }

    #[test]
    fn folds_unrecognized_parenthetical_into_name() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("2001 - Amnesiac (Japan Import)");
        assert_eq!(parsed.pattern, PatternKind::DefaultNoEdition);
        assert_eq!(parsed.year, "2001");
        assert!(parsed.album_name.contains("Amnesiac"));
        assert!(parsed.album_name.contains("Japan Import"));
    }

    #[test]
    fn parses_default_no_edition() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("2007 - In Rainbows");
        assert_eq!(parsed.pattern, PatternKind::DefaultNoEdition);
        assert_eq!(parsed.year, "2007");
        assert_eq!(parsed.album_name, "In Rainbows");
    }

    #[test]
    fn rejects_out_of_range_year_as_legacy() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("1920 - Old Recording");
        assert_eq!(parsed.pattern, PatternKind::LegacyNoEdition);
        assert_eq!(parsed.year, "");
    }

    #[test]
    fn parses_legacy_with_edition() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("OK Computer (Remastered)");
        assert_eq!(parsed.pattern, PatternKind::LegacyWithEdition);
        assert_eq!(parsed.album_name, "OK Computer");
        assert_eq!(parsed.edition, "Remastered");
    }

    #[test]
    fn parses_legacy_no_edition() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("Kid A");
        assert_eq!(parsed.pattern, PatternKind::LegacyNoEdition);
        assert_eq!(parsed.album_name, "Kid A");
    }

    #[test]
    fn empty_input_is_invalid() {
        let parser = FolderParser::new();
        let parsed = parser.parse_folder_name("");
        assert_eq!(parsed.pattern, PatternKind::Invalid);
    }

    #[test]
    fn detects_type_folder_by_plural() {
        let parser = FolderParser::new();
        assert_eq!(parser.detect_type_folder("EPs"), Some(AlbumType::EP));
        assert_eq!(parser.detect_type_folder("Live"), Some(AlbumType::Live));
        assert_eq!(parser.detect_type_folder("Random"), None);
    }

    #[test]
    fn parse_with_parent_sets_enhanced_and_type() {
        let parser = FolderParser::new();
        let parsed = parser.parse_with_parent("2010 - Unplugged Session", Some("Live"));
        assert!(parsed.enhanced);
        assert_eq!(parsed.album_type, Some(AlbumType::Live));
    }

    #[test]
    fn parse_with_parent_infers_type_from_name_when_no_type_folder() {
        let parser = FolderParser::new();
        let parsed = parser.parse_with_parent("2012 - Some Demo", None);
        assert!(!parsed.enhanced);
        assert_eq!(parsed.album_type, Some(AlbumType::Demo));
    }

    #[test]
    fn normalize_album_name_collapses_whitespace_and_strips_trailing_noise() {
        let parser = FolderParser::new();
        assert_eq!(parser.normalize_album_name("Kid  A.."), "Kid A");
        assert_eq!(parser.normalize_album_name("Hail,"), "Hail");
    }
}
