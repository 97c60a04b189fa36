//! Integration tests for allfiles
//!
//! Each test builds a small tree in a temp dir, runs a full listing through
//! the public API and inspects the written output.

use allfiles::config::{CliArgs, FileConfig, ListingConfig};
use allfiles::error::{ListerError, StoreError};
use allfiles::fields::{DeclaredType, ExtractedRow, FieldDescriptor, FieldSpec, FieldValue};
use allfiles::session::ListingSession;
use allfiles::store::{StoreBackend, StoreGuard, StoreKind, StoreOptions};
use allfiles::walker::WalkerKind;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn make_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/old")).unwrap();
    fs::create_dir_all(root.join("tmp")).unwrap();
    fs::write(root.join("readme.md"), vec![b'r'; 100]).unwrap();
    fs::write(root.join("docs/guide.pdf"), vec![0u8; 3000]).unwrap();
    fs::write(root.join("docs/old/notes.txt"), b"notes").unwrap();
    fs::write(root.join("tmp/scratch.bin"), vec![0u8; 10]).unwrap();
}

fn args(root: &Path, output: &Path, store: &str) -> CliArgs {
    CliArgs {
        root: Some(root.to_path_buf()),
        force: true,
        outputfile: Some(output.to_path_buf()),
        store: Some(store.to_string()),
        new_root: Some("R:".to_string()),
        prune: vec!["tmp".to_string()],
        ..Default::default()
    }
}

fn run(config: ListingConfig) -> allfiles::ListingReport {
    let walker = config.walker.build(config.prune.clone());
    let session = ListingSession::new(config).unwrap();
    session.run(walker.as_ref()).unwrap()
}

#[test]
fn test_text_listing_end_to_end() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.txt");
    let config = ListingConfig::from_args(args(root.path(), &output, "text")).unwrap();
    let report = run(config);

    assert!(report.completed);
    assert_eq!(report.files_seen, 3);
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.outputs, vec![output.clone()]);

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "sizehuman\tfilepath\n\
         2.9K\tR:/docs/guide.pdf\n\
         5.0B\tR:/docs/old/notes.txt\n\
         100.0B\tR:/readme.md\n"
    );
}

#[test]
fn test_json_listing_end_to_end() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.json");
    let mut cli = args(root.path(), &output, "json");
    cli.strict_json = true;
    let report = run(ListingConfig::from_args(cli).unwrap());
    assert_eq!(report.rows_written, 3);

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["schema"]["sizehuman"], "text");
    assert_eq!(value["schema"]["filepath"], "text");

    let data = value["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[2]["filepath"], "R:/readme.md");
    assert_eq!(data[2]["sizehuman"], "100.0B");
}

#[test]
fn test_json_listing_keeps_legacy_trailing_comma() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.json");
    run(ListingConfig::from_args(args(root.path(), &output, "json")).unwrap());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("{\n\"schema\": "));
    assert!(content.ends_with("},\n]}\n"));
}

#[test]
fn test_sqlite_listing_with_config_file() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.db");
    let file = FileConfig::parse(
        Path::new("allfiles.toml"),
        r#"
        table = "files"

        [[fields]]
        name = "sizebytes"
        type = "number"
        stat = "size"

        [[fields]]
        name = "extension"
        type = "text"

        [[fields]]
        name = "filepath"
        type = "text"
        "#,
    )
    .unwrap();
    let config = ListingConfig::from_parts(args(root.path(), &output, "sqlite"), file).unwrap();
    let report = run(config);
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.bytes, 3105);

    let conn = Connection::open(&output).unwrap();
    let rows: Vec<(i64, i64, Option<String>, String)> = conn
        .prepare("SELECT \"index\", sizebytes, extension, filepath FROM files ORDER BY \"index\"")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(
        rows,
        vec![
            (1, 3000, Some("pdf".to_string()), "R:/docs/guide.pdf".to_string()),
            (2, 5, Some("txt".to_string()), "R:/docs/old/notes.txt".to_string()),
            (3, 100, Some("md".to_string()), "R:/readme.md".to_string()),
        ]
    );
}

#[test]
fn test_second_run_backs_up_previous_listing() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.txt");
    run(ListingConfig::from_args(args(root.path(), &output, "text")).unwrap());
    fs::remove_file(root.path().join("readme.md")).unwrap();
    run(ListingConfig::from_args(args(root.path(), &output, "text")).unwrap());

    let backup = out.path().join("bck.listing.txt");
    assert_eq!(fs::read_to_string(&backup).unwrap().lines().count(), 4);
    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 3);
}

#[cfg(unix)]
#[test]
fn test_find_walker_matches_native_walker() {
    if std::process::Command::new("find").arg("--version").output().is_err() {
        return;
    }
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let native_out = out.path().join("native.txt");
    run(ListingConfig::from_args(args(root.path(), &native_out, "text")).unwrap());

    let find_out = out.path().join("find.txt");
    let mut config = ListingConfig::from_args(args(root.path(), &find_out, "text")).unwrap();
    config.walker = WalkerKind::Find;
    run(config);

    let sorted = |p: &Path| {
        let mut lines: Vec<String> = fs::read_to_string(p)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    };
    assert_eq!(sorted(&native_out), sorted(&find_out));
}

#[test]
fn test_unknown_field_fails_before_output_exists() {
    let root = tempdir().unwrap();
    let out = tempdir().unwrap();
    make_tree(root.path());

    let output = out.path().join("listing.txt");
    let mut config = ListingConfig::from_args(args(root.path(), &output, "text")).unwrap();
    config.fields = FieldSpec::new(vec![FieldDescriptor::custom("md5", DeclaredType::Text)]).unwrap();

    let err = ListingSession::new(config).err().unwrap();
    assert!(matches!(err, ListerError::Extraction(_)));
    assert!(!output.exists());
}

#[test]
fn test_store_guard_finishes_on_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");

    {
        let backend = StoreBackend::create(StoreKind::Json, &path, &StoreOptions::default());
        let mut guard = StoreGuard::open(backend).unwrap();
        guard.declare_schema(None, &FieldSpec::default()).unwrap();
    }

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["data"].as_array().unwrap().len(), 0);
}

#[test]
fn test_sqlite_requires_table_name() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("x.db");
    let backend = StoreBackend::create(StoreKind::Sqlite, &path, &StoreOptions::default());
    let mut guard = StoreGuard::open(backend).unwrap();

    guard.declare_schema(None, &FieldSpec::default()).unwrap();
    let row = [
        ("sizehuman".to_string(), FieldValue::Text("1.0K".to_string())),
        ("filepath".to_string(), FieldValue::Text("R:/a.txt".to_string())),
    ]
    .into_iter()
    .collect::<ExtractedRow>();

    let err = guard.insert(&row).unwrap_err();
    assert!(matches!(err, StoreError::TableNameRequired { .. }));
}
