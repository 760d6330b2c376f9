//! Download orchestrator.
//!
//! Fans out over courses, lectures, and items, with every network-touching
//! unit of work gated by one shared semaphore. Course and lecture page
//! failures propagate; individual file and video failures are logged and
//! skipped so one broken item never sinks the rest of the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::future::{join, join_all};
use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, LectureFile};
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::filename::{destination_path, sanitize_filename};
use crate::media::MediaResolver;

/// Inclusive bounds on the shared concurrency limit.
pub const MIN_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 100;

/// Run counters, updated from concurrent tasks.
#[derive(Debug, Default)]
pub struct RunStats {
    total_courses: AtomicUsize,
    courses: AtomicUsize,
    files: AtomicUsize,
    videos: AtomicUsize,
    skipped: AtomicUsize,
}

impl RunStats {
    fn set_total_courses(&self, total: usize) {
        self.total_courses.store(total, Ordering::SeqCst);
    }

    fn add_course(&self) {
        self.courses.fetch_add(1, Ordering::SeqCst);
    }

    fn add_file(&self) {
        self.files.fetch_add(1, Ordering::SeqCst);
    }

    fn add_video(&self) {
        self.videos.fetch_add(1, Ordering::SeqCst);
    }

    fn add_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of courses in this run.
    pub fn total_courses(&self) -> usize {
        self.total_courses.load(Ordering::SeqCst)
    }

    /// Courses fully processed so far.
    pub fn courses(&self) -> usize {
        self.courses.load(Ordering::SeqCst)
    }

    /// Files downloaded so far.
    pub fn files(&self) -> usize {
        self.files.load(Ordering::SeqCst)
    }

    /// Videos downloaded so far.
    pub fn videos(&self) -> usize {
        self.videos.load(Ordering::SeqCst)
    }

    /// Items skipped because the destination already existed.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }
}

/// Orchestrates a whole download run.
pub struct DownloadEngine {
    catalog: Catalog,
    resolver: MediaResolver,
    downloader: Downloader,
    semaphore: Arc<Semaphore>,
    output_dir: PathBuf,
    overwrite: bool,
    stats: Arc<RunStats>,
    progress: Option<ProgressBar>,
}

impl DownloadEngine {
    /// Creates an engine writing under `output_dir` with at most
    /// `concurrency` network operations in flight.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConcurrency`] when `concurrency` is outside
    /// [`MIN_CONCURRENCY`]..=[`MAX_CONCURRENCY`].
    pub fn new(
        catalog: Catalog,
        resolver: MediaResolver,
        downloader: Downloader,
        output_dir: impl Into<PathBuf>,
        concurrency: usize,
        overwrite: bool,
    ) -> Result<Self> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(Error::InvalidConcurrency { value: concurrency });
        }
        Ok(Self {
            catalog,
            resolver,
            downloader,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            output_dir: output_dir.into(),
            overwrite,
            stats: Arc::new(RunStats::default()),
            progress: None,
        })
    }

    /// Attaches a progress bar that ticks as items complete.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Returns the live run counters.
    #[must_use]
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Downloads every course in `course_ids`.
    ///
    /// Courses run concurrently; each course's lectures run concurrently
    /// within it. A failing course does not cancel its siblings, but the
    /// first failure is reported after all courses settle.
    ///
    /// # Errors
    ///
    /// The first course-level failure, in input order.
    #[instrument(skip(self))]
    pub async fn run(&self, course_ids: &[String]) -> Result<()> {
        self.stats.set_total_courses(course_ids.len());
        let results = join_all(course_ids.iter().map(|id| self.process_course(id))).await;
        for result in results {
            result?;
        }
        info!(
            courses = self.stats.courses(),
            files = self.stats.files(),
            videos = self.stats.videos(),
            skipped = self.stats.skipped(),
            "run complete"
        );
        Ok(())
    }

    async fn process_course(&self, course_id: &str) -> Result<()> {
        let course = self
            .with_permit(self.catalog.get_course(course_id))
            .await?;
        let course_dir = self.output_dir.join(sanitize_filename(&course.title));
        tokio::fs::create_dir_all(&course_dir)
            .await
            .map_err(|e| Error::io(&course_dir, e))?;
        info!(course = %course.title, lectures = course.lecture_links.len(), "course started");

        let results = join_all(
            course
                .lecture_links
                .iter()
                .enumerate()
                .map(|(index, link)| self.process_lecture(&course_dir, index, link)),
        )
        .await;
        for result in results {
            result?;
        }

        self.stats.add_course();
        self.tick();
        Ok(())
    }

    async fn process_lecture(
        &self,
        course_dir: &Path,
        lecture_index: usize,
        link: &str,
    ) -> Result<()> {
        let lecture = self.with_permit(self.catalog.get_lecture(link)).await?;
        debug!(lecture = %lecture.title, "lecture started");

        // Item indices continue from the attachments into the videos so
        // each lecture's filenames stay unique and deterministic.
        let file_count = lecture.files.len();
        let file_jobs = lecture
            .files
            .iter()
            .enumerate()
            .map(|(item, file)| self.fetch_file(course_dir, lecture_index, item, file));
        let media_jobs = lecture
            .media_ids
            .iter()
            .enumerate()
            .map(|(offset, id)| self.fetch_media(course_dir, lecture_index, file_count + offset, id));

        // Files and videos share the gate and run in one concurrent wave;
        // ordering lives in the filename prefixes, not the schedule.
        join(join_all(file_jobs), join_all(media_jobs)).await;
        Ok(())
    }

    /// Downloads one attachment. Failures are logged, not propagated.
    async fn fetch_file(
        &self,
        course_dir: &Path,
        lecture_index: usize,
        item_index: usize,
        file: &LectureFile,
    ) {
        let dest = destination_path(course_dir, lecture_index, item_index, &file.name);
        if self.should_skip(&dest) {
            self.stats.add_skipped();
            self.tick();
            return;
        }
        match self
            .with_permit(self.downloader.direct(&file.url, &dest))
            .await
        {
            Ok(()) => {
                self.stats.add_file();
                self.tick();
            }
            Err(e) => warn!(url = %file.url, error = %e, "file download failed, skipping"),
        }
    }

    /// Resolves and downloads one hosted video. Failures are logged, not
    /// propagated.
    async fn fetch_media(
        &self,
        course_dir: &Path,
        lecture_index: usize,
        item_index: usize,
        media_id: &str,
    ) {
        let info = match self.with_permit(self.resolver.resolve(media_id)).await {
            Ok(info) => info,
            Err(e) => {
                warn!(media_id, error = %e, "media resolution failed, skipping");
                return;
            }
        };

        // The display name is used as-is; the platform's media names carry
        // no extension and none is invented here.
        let dest = destination_path(course_dir, lecture_index, item_index, &info.name);
        if self.should_skip(&dest) {
            self.stats.add_skipped();
            self.tick();
            return;
        }
        match self
            .with_permit(self.downloader.streamed(&info.video.url, &dest))
            .await
        {
            Ok(()) => {
                self.stats.add_video();
                self.tick();
            }
            Err(e) => warn!(media_id, error = %e, "video download failed, skipping"),
        }
    }

    fn should_skip(&self, dest: &Path) -> bool {
        if self.overwrite || !dest.exists() {
            return false;
        }
        debug!(dest = %dest.display(), "destination exists, skipping");
        true
    }

    /// Runs `fut` while holding one permit from the shared gate.
    async fn with_permit<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::GateClosed)?;
        fut.await
    }

    fn tick(&self) {
        if let Some(progress) = &self.progress {
            progress.set_message(format!(
                "downloading.. [{}/{}, videos: {}, files: {}]",
                self.stats.courses(),
                self.stats.total_courses(),
                self.stats.videos(),
                self.stats.files(),
            ));
            progress.tick();
        }
    }
}
