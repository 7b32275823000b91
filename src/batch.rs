use crate::error::{PrepError, Result};
use crate::formats::TargetFormat;
use crate::processing::{process_image_pipeline, ConversionOptions, ConversionResult};
use crate::utils::{
    compression_ratio, create_progress_spinner, format_file_size, is_image_file,
    size_reduction_percent,
};
use crate::validation::looks_like_glob;
use glob::glob;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, info_span, warn};
use walkdir::{DirEntry, WalkDir};

/// One file to process and where its output goes, relative to an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub input: PathBuf,
    pub relative: PathBuf,
}

impl WorkItem {
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.relative)
    }
}

type EntryFilter = fn(&DirEntry) -> bool;

/// Lazy, depth-first sequence of [`WorkItem`]s for one input path.
pub struct WorkItems {
    source: Source,
    format: TargetFormat,
    excluded: Option<PathBuf>,
}

enum Source {
    Single(Option<PathBuf>),
    Walk {
        root: PathBuf,
        entries: walkdir::FilterEntry<walkdir::IntoIter, EntryFilter>,
    },
    Glob(glob::Paths),
}

impl WorkItems {
    /// Never yield anything at or below `dir`. Used so an output tree nested
    /// inside the input tree isn't fed back into the batch.
    pub fn excluding(mut self, dir: &Path) -> Self {
        self.excluded = Some(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()));
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded
            .as_deref()
            .map_or(false, |excluded| path.starts_with(excluded))
    }
}

impl Iterator for WorkItems {
    type Item = Result<WorkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let format = self.format;
        loop {
            let candidate = match &mut self.source {
                Source::Single(path) => {
                    let path = path.take()?;
                    let relative = mirrored_path(&path, None, format);
                    return Some(Ok(WorkItem {
                        input: path,
                        relative,
                    }));
                }
                Source::Walk { root, entries } => {
                    let entry = match entries.next()? {
                        Ok(entry) => entry,
                        Err(e) => return Some(Err(PrepError::from(e))),
                    };
                    let path = entry.path();
                    let excluded = self
                        .excluded
                        .as_deref()
                        .map_or(false, |excluded| path.starts_with(excluded));
                    if excluded {
                        if entry.file_type().is_dir() {
                            entries.skip_current_dir();
                        }
                        continue;
                    }
                    if !entry.file_type().is_file() || !is_image_file(path) {
                        continue;
                    }
                    WorkItem {
                        input: path.to_path_buf(),
                        relative: mirrored_path(path, Some(root.as_path()), format),
                    }
                }
                Source::Glob(paths) => {
                    let path = match paths.next()? {
                        Ok(path) => path,
                        Err(e) => return Some(Err(PrepError::Io(e.into_error()))),
                    };
                    if !path.is_file() || !is_image_file(&path) {
                        continue;
                    }
                    WorkItem {
                        relative: mirrored_path(&path, None, format),
                        input: path,
                    }
                }
            };

            if self.is_excluded(&candidate.input) {
                continue;
            }
            return Some(Ok(candidate));
        }
    }
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

/// Resolves `input` into the files to process.
///
/// A file is processed alone. A directory is walked in file-name order,
/// top level only unless `recursive`. A path that doesn't exist is tried as a
/// glob pattern.
pub fn walk_inputs(input: &Path, format: TargetFormat, recursive: bool) -> Result<WorkItems> {
    let source = if input.is_file() {
        Source::Single(Some(input.to_path_buf()))
    } else if input.is_dir() {
        let root = input
            .canonicalize()
            .map_err(|_| PrepError::FileNotFound(input.to_path_buf()))?;
        let mut walker = WalkDir::new(&root).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }
        let entries = walker.into_iter().filter_entry(is_visible as EntryFilter);
        Source::Walk { root, entries }
    } else {
        if !looks_like_glob(input) {
            return Err(PrepError::FileNotFound(input.to_path_buf()));
        }
        let pattern = input.to_string_lossy();
        let paths = glob(&pattern)
            .map_err(|e| PrepError::InvalidOption(format!("bad glob pattern {}: {}", pattern, e)))?;
        Source::Glob(paths)
    };

    Ok(WorkItems {
        source,
        format,
        excluded: None,
    })
}

/// Output location of `input` relative to the output root: the path below
/// `root` when given, otherwise just the file name, with the target extension.
pub fn mirrored_path(input: &Path, root: Option<&Path>, format: TargetFormat) -> PathBuf {
    let relative = root
        .and_then(|root| input.strip_prefix(root).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| input.file_name().map(PathBuf::from))
        .unwrap_or_else(|| input.to_path_buf());
    relative.with_extension(format.extension())
}

/// What one successfully processed file looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub original_size: usize,
    pub optimized_size: usize,
    pub width: u32,
    pub height: u32,
}

impl ConversionSummary {
    pub fn new(input: &Path, result: &ConversionResult) -> Self {
        Self {
            input: input.to_path_buf(),
            output: result.output_path.clone(),
            original_size: result.original_size,
            optimized_size: result.optimized_size,
            width: result.width,
            height: result.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Converted(ConversionSummary),
    Skipped { input: PathBuf, reason: String },
    Failed { input: PathBuf, reason: String },
}

impl FileOutcome {
    pub fn from_result(input: &Path, result: Result<ConversionSummary>) -> Self {
        match result {
            Ok(summary) => FileOutcome::Converted(summary),
            Err(e) if e.is_skip() => FileOutcome::Skipped {
                input: input.to_path_buf(),
                reason: e.to_string(),
            },
            Err(e) => FileOutcome::Failed {
                input: input.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }

    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Converted(summary) => &summary.input,
            FileOutcome::Skipped { input, .. } | FileOutcome::Failed { input, .. } => input,
        }
    }

    fn log(&self) {
        match self {
            FileOutcome::Converted(s) => info!(
                "✅ {} -> {}x{}, {} -> {} ({:.1}% smaller)",
                s.input.display(),
                s.width,
                s.height,
                format_file_size(s.original_size as u64),
                format_file_size(s.optimized_size as u64),
                size_reduction_percent(s.original_size as u64, s.optimized_size as u64)
            ),
            FileOutcome::Skipped { input, reason } => {
                warn!("⏭️  Skipped {}: {}", input.display(), reason)
            }
            FileOutcome::Failed { input, reason } => {
                error!("❌ Failed {}: {}", input.display(), reason)
            }
        }
    }
}

/// Per-file outcomes of one batch, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.converted().count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }

    pub fn total_original_size(&self) -> u64 {
        self.converted().map(|s| s.original_size as u64).sum()
    }

    pub fn total_optimized_size(&self) -> u64 {
        self.converted().map(|s| s.optimized_size as u64).sum()
    }

    /// Total optimized bytes over total original bytes of converted files.
    pub fn aggregate_ratio(&self) -> f64 {
        compression_ratio(self.total_original_size(), self.total_optimized_size())
    }

    /// True when every file made it through.
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0 && self.failed() == 0
    }

    fn converted(&self) -> impl Iterator<Item = &ConversionSummary> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Converted(summary) => Some(summary),
            _ => None,
        })
    }

    pub fn log_summary(&self, title: &str, started: Instant) {
        info!("📊 {} summary:", title);
        info!("  📁 Processed: {}", self.processed());
        info!("  ⏭️  Skipped: {}", self.skipped());
        info!("  ❌ Failed: {}", self.failed());
        info!(
            "  📦 Total size: {} -> {}",
            format_file_size(self.total_original_size()),
            format_file_size(self.total_optimized_size())
        );
        info!("  🎯 Aggregate compression ratio: {:.3}", self.aggregate_ratio());
        info!("  ⏱️  Total time: {:.2?}", started.elapsed());
    }
}

/// Feeds every item through `process`, one at a time. A failing file is
/// recorded and logged; it never stops the batch.
pub fn run_batch<I, F>(items: I, progress: &ProgressBar, mut process: F) -> BatchReport
where
    I: IntoIterator<Item = Result<WorkItem>>,
    F: FnMut(&WorkItem) -> Result<ConversionSummary>,
{
    let mut report = BatchReport::default();

    for item in items {
        let outcome = match item {
            Ok(item) => {
                let span = info_span!("file", path = %item.input.display());
                let _guard = span.enter();
                progress.set_message(item.relative.display().to_string());
                FileOutcome::from_result(&item.input, process(&item))
            }
            Err(e) => {
                let input = match &e {
                    PrepError::WalkdirError(walk_err) => {
                        walk_err.path().map(Path::to_path_buf).unwrap_or_default()
                    }
                    _ => PathBuf::new(),
                };
                FileOutcome::Failed {
                    input,
                    reason: e.to_string(),
                }
            }
        };

        progress.suspend(|| outcome.log());
        progress.inc(1);
        report.record(outcome);
    }

    report
}

/// The batch converter: every image under `input` is fitted and written below
/// `output`, mirroring relative paths. Nothing is sent anywhere.
pub fn batch_convert_images(
    input: &Path,
    output: &Path,
    options: &ConversionOptions,
    show_progress: bool,
) -> Result<BatchReport> {
    info!("🚀 Starting batch conversion");
    info!("📁 Input: {}", input.display());
    info!("📁 Output: {}", output.display());
    info!(
        "⚙️  Format: {}, quality: {}, max size: {}px, recursive: {}",
        options.format, options.quality, options.max_long_edge, options.recursive
    );

    let started = Instant::now();
    let items = walk_inputs(input, options.format, options.recursive)?;

    fs::create_dir_all(output)
        .map_err(|_| PrepError::DirectoryCreationFailed(output.to_path_buf()))?;
    let items = items.excluding(output);

    let progress = create_progress_spinner("Converting...", show_progress);
    let report = run_batch(items, &progress, |item| {
        let output_path = item.output_path(output);
        let result = process_image_pipeline(&item.input, &output_path, options)?;
        Ok(ConversionSummary::new(&item.input, &result))
    });
    progress.finish_and_clear();

    if report.is_empty() {
        warn!("⚠️  No image files found in {}", input.display());
        return Ok(report);
    }

    report.log_summary("Conversion", started);
    Ok(report)
}
