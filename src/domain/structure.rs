//! Classifies a band folder's overall naming convention and scores its
//! compliance/consistency.

use crate::domain::models::{
    ComplianceDistribution, FolderStructure, HealthIndicators, StructureConsistency,
    StructureIssue, StructureRecommendation, StructureType,
};
use crate::domain::parser::{FolderParser, PatternKind};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One album folder discovered while walking a band directory.
#[derive(Debug, Clone)]
struct WalkedAlbum {
    name: String,
    pattern: PatternKind,
    enhanced: bool,
    has_year: bool,
    year_valid: bool,
    has_edition: bool,
    edition_normalized: bool,
}

/// Walks a band folder and produces its `FolderStructure` classification.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructureDetector {
    parser: FolderParser,
}

impl StructureDetector {
    pub fn new() -> Self {
        Self {
            parser: FolderParser::new(),
        }
    }

    /// Walk `band_dir`'s immediate children, classifying type folders vs.
    /// direct albums, and return the resulting `FolderStructure`.
    pub fn detect(&self, band_dir: &Path) -> std::io::Result<FolderStructure> {
        let mut albums = Vec::new();
        let mut type_folders_found = Vec::new();
        let mut empty_type_folders = Vec::new();
        let mut saw_type_folder = false;
        let mut saw_direct_album = false;

        for entry in fs::read_dir(band_dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy().to_string();
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }

            if let Some(album_type) = self.parser.detect_type_folder(&name) {
                let children: Vec<_> = fs::read_dir(&path)?
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_dir() && !e.file_name().to_string_lossy().starts_with('.'))
                    .collect();
                if children.is_empty() {
                    empty_type_folders.push(name.clone());
                    continue;
                }
                saw_type_folder = true;
                type_folders_found.push(album_type.as_str().to_string());
                for child in children {
                    let child_name = child.file_name().to_string_lossy().to_string();
                    albums.push(self.walk_album(&child_name, Some(&name)));
                }
            } else {
                saw_direct_album = true;
                albums.push(self.walk_album(&name, None));
            }
        }

        let mut structure = FolderStructure::default();
        structure.type_folders_found = type_folders_found;
        structure.albums_analyzed = albums.len();

        if albums.is_empty() {
            structure.structure_type = StructureType::Unknown;
            structure.consistency = StructureConsistency::Unknown;
            return Ok(structure);
        }

        let mut pattern_counts: HashMap<&'static str, usize> = HashMap::new();
        let mut compliance_scores = Vec::with_capacity(albums.len());
        let mut albums_with_year = 0usize;
        let mut albums_in_type_folders = 0usize;

        for album in &albums {
            let pattern_str = album.pattern.as_str(album.enhanced);
            *pattern_counts.entry(pattern_str).or_insert(0) += 1;
            if album.has_year {
                albums_with_year += 1;
            }
            if album.enhanced {
                albums_in_type_folders += 1;
            }
            let score = Self::compliance_score(album);
            structure.compliance_distribution.record(score);
            if score < 25 {
                structure.issues.push(StructureIssue::CriticalComplianceAlbum {
                    album_name: album.name.clone(),
                    score,
                });
            }
            compliance_scores.push(score);
        }

        structure.detected_patterns = pattern_counts.keys().map(|s| s.to_string()).collect();
        structure.detected_patterns.sort();
        structure.albums_with_year = albums_with_year;
        structure.albums_without_year = albums.len() - albums_with_year;
        structure.albums_in_type_folders = albums_in_type_folders;

        let most_common_count = pattern_counts.values().copied().max().unwrap_or(0);
        let consistency_score =
            ((most_common_count as f64 / albums.len() as f64) * 100.0).round() as i32;
        structure.consistency_score = consistency_score;

        let avg_compliance =
            compliance_scores.iter().sum::<i32>() as f64 / compliance_scores.len() as f64;
        let year_prefix_ratio = albums_with_year as f64 / albums.len() as f64;
        let type_organization_bonus =
            ((albums_in_type_folders as f64 / albums.len() as f64) * 20.0).round() as i32;
        let overall_score = (avg_compliance * 0.6
            + consistency_score as f64 * 0.3
            + year_prefix_ratio * 10.0
            + type_organization_bonus as f64)
            .round() as i32;
        structure.structure_score = overall_score.clamp(0, 100);

        structure.structure_type = if saw_type_folder && !saw_direct_album {
            StructureType::Enhanced
        } else if saw_type_folder && saw_direct_album {
            StructureType::Mixed
        } else if !saw_type_folder
            && albums
                .iter()
                .any(|a| matches!(a.pattern, PatternKind::DefaultWithEdition | PatternKind::DefaultNoEdition))
        {
            StructureType::Default
        } else {
            StructureType::Legacy
        };

        structure.consistency = match structure.consistency_score {
            s if s >= 90 => StructureConsistency::Consistent,
            s if s >= 70 => StructureConsistency::MostlyConsistent,
            _ => StructureConsistency::Inconsistent,
        };

        structure.health_indicators = HealthIndicators {
            has_year_prefixes: albums_with_year == albums.len(),
            consistent_patterns: matches!(structure.consistency, StructureConsistency::Consistent),
            uses_type_folders: saw_type_folder,
            good_compliance: avg_compliance >= 70.0,
            minimal_issues: structure.issues.len() <= 1,
        };

        if structure.albums_without_year > 0 {
            structure.issues.push(StructureIssue::MissingYearPrefixes {
                count: structure.albums_without_year,
            });
            structure
                .recommendations
                .push(StructureRecommendation::AddYearPrefixes);
        }

        let non_standard_editions = albums
            .iter()
            .filter(|a| a.has_edition && !a.edition_normalized)
            .count();
        if non_standard_editions > 0 {
            structure
                .issues
                .push(StructureIssue::NonStandardEditionFormatting {
                    count: non_standard_editions,
                });
            structure
                .recommendations
                .push(StructureRecommendation::NormalizeEditionFormatting);
        }

        if saw_type_folder && saw_direct_album {
            structure.issues.push(StructureIssue::MixedDirectAndNestedAlbums);
            structure
                .recommendations
                .push(StructureRecommendation::MigrateToEnhanced);
        }

        if !empty_type_folders.is_empty() {
            for folder in &empty_type_folders {
                structure
                    .issues
                    .push(StructureIssue::EmptyTypeFolder { folder: folder.clone() });
            }
            structure
                .recommendations
                .push(StructureRecommendation::RemoveEmptyTypeFolders {
                    folders: empty_type_folders,
                });
        }

        if structure.detected_patterns.len() > 2 {
            structure.issues.push(StructureIssue::TooManyDistinctPatterns {
                pattern_count: structure.detected_patterns.len(),
            });
        }

        let critical_count = structure.compliance_distribution.critical
            + structure.compliance_distribution.poor;
        if critical_count > 0 {
            structure
                .recommendations
                .push(StructureRecommendation::ImproveCompliance {
                    album_count: critical_count,
                });
        }

        Ok(structure)
    }

    fn walk_album(&self, name: &str, parent: Option<&str>) -> WalkedAlbum {
        let parsed = self.parser.parse_with_parent(name, parent);
        let has_year = !parsed.year.is_empty();
        let year_valid = has_year && self.parser.is_valid_year(&parsed.year);
        let has_edition = !parsed.edition.is_empty();
        let edition_normalized = has_edition && parsed.edition_raw == parsed.edition;
        WalkedAlbum {
            name: parsed.album_name.clone(),
            pattern: parsed.pattern,
            enhanced: parsed.enhanced,
            has_year,
            year_valid,
            has_edition,
            edition_normalized,
        }
    }

    /// Per-album compliance score (0-100 clamped), per spec §4.2.
    fn compliance_score(album: &WalkedAlbum) -> i32 {
        let mut score: i32 = 100;
        if !album.has_year {
            score -= 30;
        } else if !album.year_valid {
            score -= 15;
        }
        if album.name.trim().len() < 2 {
            score -= 40;
        }
        if album.has_edition {
            if album.edition_normalized {
                score += 5;
            } else {
                score -= 5;
            }
        }
        if album.enhanced {
            score += 10;
        }
        score.clamp(0, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn make_album_dir(root: &Path, name: &str) {
        fs::create_dir_all(root.join(name)).unwrap();
    }

    #[test]
    fn classifies_default_structure() {
        let dir = tempdir().unwrap();
        make_album_dir(dir.path(), "1995 - The Bends");
        make_album_dir(dir.path(), "1997 - OK Computer (Deluxe Edition)");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert_eq!(structure.structure_type, StructureType::Default);
        assert_eq!(structure.albums_analyzed, 2);
        assert_eq!(structure.albums_with_year, 2);
    }

    #[test]
    fn classifies_enhanced_structure() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Album").join("1995 - The Bends")).unwrap();
        fs::create_dir_all(dir.path().join("Live").join("2001 - Live Session")).unwrap();
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert_eq!(structure.structure_type, StructureType::Enhanced);
        assert_eq!(structure.albums_in_type_folders, 2);
    }

    #[test]
    fn classifies_mixed_structure() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Live").join("2001 - Live Session")).unwrap();
        make_album_dir(dir.path(), "1995 - The Bends");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert_eq!(structure.structure_type, StructureType::Mixed);
    }

    #[test]
    fn classifies_legacy_structure_without_year_prefixes() {
        let dir = tempdir().unwrap();
        make_album_dir(dir.path(), "The Bends");
        make_album_dir(dir.path(), "OK Computer");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert_eq!(structure.structure_type, StructureType::Legacy);
        assert!(structure
            .issues
            .iter()
            .any(|i| matches!(i, StructureIssue::MissingYearPrefixes { .. })));
    }

    #[test]
    fn empty_type_folder_is_reported_and_excluded() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("EPs")).unwrap();
        make_album_dir(dir.path(), "1995 - The Bends");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert!(structure
            .issues
            .iter()
            .any(|i| matches!(i, StructureIssue::EmptyTypeFolder { .. })));
        assert_eq!(structure.albums_analyzed, 1);
    }

    #[test]
    fn non_canonical_edition_formatting_is_flagged() {
        let dir = tempdir().unwrap();
        make_album_dir(dir.path(), "2001 - Amnesiac (deluxe)");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert!(structure
            .issues
            .iter()
            .any(|i| matches!(i, StructureIssue::NonStandardEditionFormatting { count: 1 })));
        assert!(structure
            .recommendations
            .contains(&StructureRecommendation::NormalizeEditionFormatting));
    }

    #[test]
    fn canonical_edition_formatting_is_not_flagged() {
        let dir = tempdir().unwrap();
        make_album_dir(dir.path(), "2001 - Amnesiac (Deluxe Edition)");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert!(!structure
            .issues
            .iter()
            .any(|i| matches!(i, StructureIssue::NonStandardEditionFormatting { .. })));
    }

    #[test]
    fn migration_recommended_for_mixed_structure() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Live").join("2001 - Live Session")).unwrap();
        make_album_dir(dir.path(), "1995 - The Bends");
        let detector = StructureDetector::new();
        let structure = detector.detect(dir.path()).unwrap();
        assert!(structure.migration_recommended());
    }
}
