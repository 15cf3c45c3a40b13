//! `validate-structure`: reports folder-structure compliance for every band
//! under the configured music root.
//!
//! Exit codes: 0 when every band's structure has no issues, 1 when at least
//! one band could not be read, 2 when issues were found but all bands were
//! readable.

use band_archivist::core::config::LibraryConfig;
use band_archivist::domain::structure::StructureDetector;
use band_archivist::domain::models::StructureConsistency;
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let music_root = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => match LibraryConfig::from_env() {
            Ok(cfg) => cfg.music_root,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        },
    };

    let entries = match std::fs::read_dir(&music_root) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("error reading {}: {}", music_root.display(), e);
            std::process::exit(1);
        }
    };

    let detector = StructureDetector::new();
    let mut saw_read_error = false;
    let mut saw_issue = false;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => {
                saw_read_error = true;
                continue;
            }
        };
        if !entry.path().is_dir() {
            continue;
        }
        let band_name = entry.file_name().to_string_lossy().into_owned();
        match detector.detect(&entry.path()) {
            Ok(structure) => {
                println!(
                    "{}: {:?} structure, score {}, consistency {:?}",
                    band_name, structure.structure_type, structure.structure_score, structure.consistency
                );
                if !structure.issues.is_empty() || structure.consistency == StructureConsistency::Inconsistent {
                    saw_issue = true;
                    for issue in &structure.issues {
                        println!("  issue: {:?}", issue);
                    }
                }
            }
            Err(e) => {
                eprintln!("{}: could not read structure: {}", band_name, e);
                saw_read_error = true;
            }
        }
    }

    if saw_read_error {
        std::process::exit(1);
    } else if saw_issue {
        std::process::exit(2);
    }
    std::process::exit(0);
}
