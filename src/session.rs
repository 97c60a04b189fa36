//! Listing session: drives traversal, extraction and storage
//!
//! ```text
//! for each output target:
//!     backup ─► create backend ─► setup ─► declare_schema
//!     for each root mapped to the target:
//!         for each raw path from the PathSource:
//!             normalize ─► stat ─► extract ─► insert
//!     finish (explicit, or by StoreGuard on any early exit)
//! ```
//!
//! Paths are processed strictly one after another. A failed stat only skips
//! that file; anything that breaks the output aborts the run.

use crate::backup::make_backup;
use crate::config::{ListingConfig, RootMapping};
use crate::error::Result;
use crate::fields::{stat_path, ExtractedRow, FieldExtractor};
use crate::notify::{finished_message, Notifier};
use crate::progress::{ProgressReporter, StageCounter};
use crate::store::{StoreBackend, StoreGuard};
use crate::walker::{normalize_path, resolve_raw, PathSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often the spinner message is refreshed, in paths
const SPINNER_INTERVAL: u64 = 64;

/// Totals of one run
#[derive(Debug, Clone, Default)]
pub struct ListingReport {
    /// Paths delivered by the traversal, including ones that failed
    pub files_seen: u64,
    pub rows_written: u64,
    /// Skipped files and dropped rows
    pub errors: u64,
    /// Sum of file sizes of written rows
    pub bytes: u64,
    pub duration: Duration,
    /// False if the run was interrupted
    pub completed: bool,
    pub outputs: Vec<PathBuf>,
}

/// Running counters shared across roots and targets
#[derive(Debug)]
struct Totals {
    stage: StageCounter,
    rows: u64,
    errors: u64,
    bytes: u64,
    outputs: Vec<PathBuf>,
}

/// One listing run over all configured roots
pub struct ListingSession {
    config: ListingConfig,
    extractor: FieldExtractor,
    notifier: Notifier,
    shutdown: Arc<AtomicBool>,
    progress: Option<ProgressReporter>,
}

impl ListingSession {
    /// Build a session. Fails fast if a field cannot be extracted.
    pub fn new(config: ListingConfig) -> Result<Self> {
        let extractor = FieldExtractor::new(&config.fields)?;
        debug!(fields = extractor.field_count(), "Field extractor ready");
        let notifier = Notifier::new(config.notify_command.as_deref());
        Ok(Self {
            config,
            extractor,
            notifier,
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Attach a live spinner
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Flag checked between paths; setting it stops the run cleanly
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Walk every root with `source` and write the listing.
    ///
    /// The final file count is logged whether the run succeeds, fails or is
    /// interrupted. The notification only fires for a completed run.
    pub fn run(&self, source: &dyn PathSource) -> Result<ListingReport> {
        let start = Instant::now();
        let mut totals = Totals {
            stage: StageCounter::starting_at(self.config.stage_size, start),
            rows: 0,
            errors: 0,
            bytes: 0,
            outputs: Vec::new(),
        };

        info!(
            walker = source.name(),
            store = %self.config.store,
            roots = self.config.roots.len(),
            "Starting listing"
        );

        let result = self.run_targets(source, &mut totals);

        if let Some(ref p) = self.progress {
            p.finish_and_clear();
        }
        info!("finished -- found {} files!", totals.stage.files());

        let completed = result?;
        if completed {
            self.notifier.notify(&finished_message(&totals.outputs));
        } else {
            warn!("Listing was interrupted before completion");
        }

        Ok(ListingReport {
            files_seen: totals.stage.files(),
            rows_written: totals.rows,
            errors: totals.errors,
            bytes: totals.bytes,
            duration: start.elapsed(),
            completed,
            outputs: totals.outputs,
        })
    }

    /// Returns false when interrupted
    fn run_targets(&self, source: &dyn PathSource, totals: &mut Totals) -> Result<bool> {
        if self.config.per_root_output {
            for root in &self.config.roots {
                let output = self.config.output_for(root);
                if !self.write_target(output, std::slice::from_ref(root), source, totals)? {
                    return Ok(false);
                }
            }
            Ok(true)
        } else {
            self.write_target(self.config.output.clone(), &self.config.roots, source, totals)
        }
    }

    /// Write all `roots` into one output
    fn write_target(
        &self,
        output: PathBuf,
        roots: &[RootMapping],
        source: &dyn PathSource,
        totals: &mut Totals,
    ) -> Result<bool> {
        match make_backup(&output, &self.config.backup_prefix) {
            Ok(Some(backup)) => debug!(backup = %backup.path().display(), "Previous output kept"),
            Ok(None) => {}
            Err(e) => warn!("Backup failed, overwriting anyway: {}", e),
        }

        let backend = StoreBackend::create(self.config.store, &output, &self.config.store_options);
        let mut store = StoreGuard::open(backend)?;
        store.declare_schema(Some(self.config.table.as_str()), &self.config.fields)?;
        totals.outputs.push(output);

        let rows_before = store.rows_written();
        let mut completed = true;
        for root in roots {
            if !self.walk_root(root, source, &mut store, totals)? {
                completed = false;
                break;
            }
        }
        totals.rows += store.rows_written() - rows_before;

        // On error paths above the guard finishes the store when dropped
        let path = store.finish()?;
        debug!(output = %path.display(), "Output closed");
        Ok(completed)
    }

    /// Process every path below one root; returns false when interrupted
    fn walk_root(
        &self,
        root: &RootMapping,
        source: &dyn PathSource,
        store: &mut StoreGuard,
        totals: &mut Totals,
    ) -> Result<bool> {
        info!(
            root = %root.source.display(),
            replacement = %root.replacement,
            output = %store.path().display(),
            "Listing root"
        );

        for item in source.paths(&root.source)? {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(false);
            }

            let raw = match item {
                Ok(raw) => raw,
                Err(e) if e.is_recoverable() => {
                    warn!("{}", e);
                    totals.errors += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.process_path(root, &raw, store, totals)?;

            if let Some(report) = totals.stage.tick(&raw) {
                match self.progress {
                    Some(ref p) => p.println(&report.to_string()),
                    None => info!("{}", report),
                }
            }
            if let Some(ref p) = self.progress {
                let files = totals.stage.files();
                if files % SPINNER_INTERVAL == 1 {
                    p.update(files, totals.errors, totals.bytes, &raw);
                }
            }
        }

        Ok(!self.shutdown.load(Ordering::SeqCst))
    }

    fn process_path(
        &self,
        root: &RootMapping,
        raw: &str,
        store: &mut StoreGuard,
        totals: &mut Totals,
    ) -> Result<()> {
        let shown_path = normalize_path(raw, &root.replacement);
        let fs_path = resolve_raw(&root.source, raw);

        let meta = match stat_path(&fs_path) {
            Ok(meta) => meta,
            Err(e) if e.is_recoverable() => {
                warn!(line = %raw.trim(), "{}", e);
                totals.errors += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let row = self.extractor.extract(&shown_path, &meta);
        match store.insert(&row) {
            Ok(()) => {
                totals.bytes += meta.len();
                Ok(())
            }
            Err(e) if e.is_row_recoverable() => {
                warn!(path = %shown_path, "Row dropped: {}", e);
                debug!(row = %self.describe(&row), "Dropped row");
                totals.errors += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `name=value` pairs for diagnostics, text quoted
    fn describe(&self, row: &ExtractedRow) -> String {
        row.iter()
            .map(|(name, value)| {
                format!("{}={}", name, value.repr(self.config.fields.type_of(name)))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ListerError, WalkError};
    use crate::walker::{NativeWalker, PathIter};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Collects formatted log output of a scoped subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Delivers a fixed list of raw paths, like a traversal that raced deletes
    struct FixedSource(Vec<&'static str>);

    impl PathSource for FixedSource {
        fn paths(&self, _root: &Path) -> std::result::Result<PathIter, WalkError> {
            let items: Vec<std::result::Result<String, WalkError>> =
                self.0.iter().map(|s| Ok(s.to_string())).collect();
            Ok(Box::new(items.into_iter()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn config(root: &Path, output: &Path) -> ListingConfig {
        let args = crate::config::CliArgs {
            root: Some(root.to_path_buf()),
            force: true,
            outputfile: Some(output.to_path_buf()),
            new_root: Some("R:".to_string()),
            prune: vec!["nothing-to-prune".to_string()],
            ..Default::default()
        };
        ListingConfig::from_args(args).unwrap()
    }

    #[test]
    fn test_listing_with_native_walker() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::create_dir_all(root.path().join("sub")).unwrap();
        fs::write(root.path().join("a.txt"), vec![b'a'; 10]).unwrap();
        fs::write(root.path().join("sub/b.bin"), vec![0u8; 2_097_152]).unwrap();

        let output = out.path().join("list.txt");
        let session = ListingSession::new(config(root.path(), &output)).unwrap();
        let report = session.run(&NativeWalker::default()).unwrap();

        assert!(report.completed);
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.errors, 0);
        assert_eq!(report.bytes, 2_097_162);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "sizehuman\tfilepath\n10.0B\tR:/a.txt\n2.0M\tR:/sub/b.bin\n"
        );
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), vec![b'a'; 10]).unwrap();

        let output = out.path().join("list.txt");
        let session = ListingSession::new(config(root.path(), &output)).unwrap();
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let report = tracing::subscriber::with_default(subscriber, || {
            session
                .run(&FixedSource(vec!["./a.txt", "./sub/b.bin"]))
                .unwrap()
        });

        assert!(report.completed);
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.rows_written, 1);
        assert_eq!(report.errors, 1);
        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(content.lines().nth(1), Some("10.0B\tR:/a.txt"));

        // Exactly one diagnostic, naming the missing file
        let log = logs.contents();
        let warnings: Vec<&str> = log.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{}", log);
        assert!(warnings[0].contains("sub/b.bin"));
        assert!(log.contains("finished -- found 2 files!"));
    }

    #[test]
    fn test_existing_output_is_backed_up() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), b"x").unwrap();
        let output = out.path().join("list.txt");
        fs::write(&output, b"previous listing").unwrap();

        let session = ListingSession::new(config(root.path(), &output)).unwrap();
        session.run(&NativeWalker::default()).unwrap();

        let backup = out.path().join("bck.list.txt");
        assert_eq!(fs::read(&backup).unwrap(), b"previous listing");
        assert!(fs::read_to_string(&output).unwrap().starts_with("sizehuman"));
    }

    #[test]
    fn test_interrupted_run_still_finishes_output() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(root.path().join("a.txt"), b"x").unwrap();

        let output = out.path().join("list.json");
        let mut cfg = config(root.path(), &output);
        cfg.store = crate::store::StoreKind::Json;
        let session = ListingSession::new(cfg).unwrap();
        session.shutdown_flag().store(true, Ordering::SeqCst);

        let report = session.run(&NativeWalker::default()).unwrap();
        assert!(!report.completed);
        assert_eq!(report.files_seen, 0);
        let content = fs::read_to_string(&output).unwrap();
        assert!(content.trim_end().ends_with("]}"));
    }

    #[test]
    fn test_stage_reports_count_all_roots() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        for i in 0..5 {
            fs::write(root.path().join(format!("f{}.txt", i)), b"x").unwrap();
        }
        let output = out.path().join("list.txt");
        let mut cfg = config(root.path(), &output);
        cfg.stage_size = 2;
        let session = ListingSession::new(cfg).unwrap();
        let report = session.run(&NativeWalker::default()).unwrap();
        assert_eq!(report.files_seen, 5);
    }

    #[test]
    fn test_per_root_outputs() {
        let c = tempdir().unwrap();
        let d = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(c.path().join("one.txt"), b"1").unwrap();
        fs::write(d.path().join("two.txt"), b"22").unwrap();

        let output = out.path().join("all.txt");
        let mut cfg = config(c.path(), &output);
        cfg.roots = vec![
            RootMapping::new(c.path().to_path_buf(), Some("c:".into())),
            RootMapping::new(d.path().to_path_buf(), Some("d:".into())),
        ];
        cfg.per_root_output = true;

        let report = ListingSession::new(cfg)
            .unwrap()
            .run(&NativeWalker::default())
            .unwrap();
        assert_eq!(report.outputs.len(), 2);
        assert_eq!(report.rows_written, 2);
        assert_eq!(
            fs::read_to_string(out.path().join("all.c.txt")).unwrap(),
            "sizehuman\tfilepath\n1.0B\tc:/one.txt\n"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("all.d.txt")).unwrap(),
            "sizehuman\tfilepath\n2.0B\td:/two.txt\n"
        );
    }

    #[test]
    fn test_unimplemented_field_fails_before_output() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let output = out.path().join("list.txt");
        let mut cfg = config(root.path(), &output);
        cfg.fields = crate::fields::FieldSpec::new(vec![crate::fields::FieldDescriptor::custom(
            "checksum",
            crate::fields::DeclaredType::Text,
        )])
        .unwrap();

        assert!(matches!(
            ListingSession::new(cfg),
            Err(ListerError::Extraction(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_walker_failure_still_closes_output() {
        struct Broken;
        impl PathSource for Broken {
            fn paths(&self, root: &Path) -> std::result::Result<PathIter, WalkError> {
                Err(WalkError::Spawn {
                    command: format!("broken {}", root.display()),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
            }
            fn name(&self) -> &'static str {
                "broken"
            }
        }

        let root = tempdir().unwrap();
        let out = tempdir().unwrap();
        let output = out.path().join("list.json");
        let mut cfg = config(root.path(), &output);
        cfg.store = crate::store::StoreKind::Json;

        let err = ListingSession::new(cfg).unwrap().run(&Broken).unwrap_err();
        assert!(matches!(err, ListerError::Walk(WalkError::Spawn { .. })));
        assert!(fs::read_to_string(&output).unwrap().ends_with("]}\n"));
    }
}
