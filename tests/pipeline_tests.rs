use band_archivist::{MigrationEngine, MigrationRequest, MigrationType, QueryEngine, QueryRequest, Scanner};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn touch(path: &Path) {
    fs::write(path, b"").unwrap();
}

fn make_default_band(root: &Path, band: &str, albums: &[&str]) {
    let band_dir = root.join(band);
    for album in albums {
        let album_dir = band_dir.join(album);
        fs::create_dir_all(&album_dir).unwrap();
        touch(&album_dir.join("01 Track.mp3"));
    }
}

#[test]
fn scan_then_query_finds_band_by_search() {
    let root = tempdir().unwrap();
    make_default_band(root.path(), "Radiohead", &["1997 - OK Computer", "2000 - Kid A"]);
    make_default_band(root.path(), "Sigur Ros", &["2002 - Untitled"]);

    let scanner = Scanner::new();
    scanner.scan(root.path()).unwrap();

    let engine = QueryEngine::new();
    let mut request = QueryRequest::default();
    request.filters.search = Some("radio".into());
    let response = engine.query(root.path(), request).unwrap();

    assert_eq!(response.bands.len(), 1);
    assert_eq!(response.bands[0].name, "Radiohead");
    assert_eq!(response.bands[0].albums_count, 2);
}

#[test]
fn scan_then_query_paginates_results() {
    let root = tempdir().unwrap();
    for name in ["Alpha", "Bravo", "Charlie", "Delta"] {
        make_default_band(root.path(), name, &["2001 - Debut"]);
    }

    let scanner = Scanner::new();
    scanner.scan(root.path()).unwrap();

    let engine = QueryEngine::new();
    let mut request = QueryRequest::default();
    request.page = 1;
    request.page_size = 2;
    let first_page = engine.query(root.path(), request.clone()).unwrap();
    assert_eq!(first_page.bands.len(), 2);
    assert!(first_page.has_next);
    assert!(!first_page.has_previous);

    request.page = 2;
    let second_page = engine.query(root.path(), request).unwrap();
    assert_eq!(second_page.bands.len(), 2);
    assert!(!second_page.has_next);
    assert!(second_page.has_previous);
}

#[test]
fn migrate_default_to_enhanced_then_rescan_preserves_album_count() {
    let root = tempdir().unwrap();
    make_default_band(root.path(), "Opeth", &["1995 - Orchid", "2001 - Blackwater Park"]);

    let scanner = Scanner::new();
    let before = scanner.scan(root.path()).unwrap();
    assert_eq!(before.bands[0].local_albums_count, 2);

    let engine = MigrationEngine::new();
    let request = MigrationRequest::new("Opeth", MigrationType::DefaultToEnhanced);
    let (result, _log) = engine.migrate_band_structure(root.path(), request).unwrap();
    assert_eq!(result.albums_failed, 0);
    assert!(root.path().join("Opeth").join("Album").join("1995 - Orchid").exists());
    assert!(root.path().join("Opeth").join("Album").join("2001 - Blackwater Park").exists());

    let after = scanner.scan(root.path()).unwrap();
    assert_eq!(after.bands[0].local_albums_count, 2);
}

#[test]
fn dry_run_migration_does_not_touch_filesystem() {
    let root = tempdir().unwrap();
    make_default_band(root.path(), "Tool", &["1993 - Undertow"]);

    let engine = MigrationEngine::new();
    let mut request = MigrationRequest::new("Tool", MigrationType::DefaultToEnhanced);
    request.dry_run = true;
    let (result, _log) = engine.migrate_band_structure(root.path(), request).unwrap();

    assert!(result.dry_run);
    assert!(root.path().join("Tool").join("1993 - Undertow").exists());
    assert!(!root.path().join("Tool").join("Album").exists());
}
