//! The scrape → word cloud run.
//!
//! One run does, in order:
//!
//! 1. **Fetch** the configured page (one GET, no retry)
//! 2. **Extract** news texts with the configured selectors
//! 3. **Export** them to CSV
//! 4. **Analyze** word frequencies
//! 5. **Render** and write the word cloud PNG
//!
//! At most one run is in flight per [`Pipeline`] (and its clones). A second
//! call while one is running fails with [`PipelineError::AlreadyRunning`]
//! instead of queueing. Failures abort the run where they happen; an export
//! written before a later stage failed is left in place.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::analysis::{Analyzer, WordCount};
use crate::auth::Session;
use crate::config::{Config, DataPaths};
use crate::news::{
    write_export, ExportError, ExtractError, Extractor, FetchError, Fetcher, SelectorExtractor,
};
use crate::render::{RenderError, Renderer};

/// How many top words a [`RunReport`] carries.
const REPORT_TOP_WORDS: usize = 10;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("A run is already in progress")]
    AlreadyRunning,
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Extractor setup failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Render failed: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to write image '{}': {source}", .path.display())]
    WriteImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Extracting,
    Exporting,
    Analyzing,
    Rendering,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Stage::Fetching => "Fetching news page",
            Stage::Extracting => "Extracting news texts",
            Stage::Exporting => "Saving export",
            Stage::Analyzing => "Analyzing word frequencies",
            Stage::Rendering => "Rendering word cloud",
        };
        f.write_str(label)
    }
}

/// Progress notifications for whoever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    Finished,
    Failed(String),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub user: String,
    pub item_count: usize,
    pub kept_words: usize,
    pub top_words: Vec<WordCount>,
    pub placed_words: usize,
    pub export_path: PathBuf,
    pub image_path: PathBuf,
    pub finished_at: DateTime<Utc>,
}

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineTarget {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub export_path: PathBuf,
    pub image_path: PathBuf,
}

/// Clears the busy flag when the run ends, however it ends.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Fetcher,
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<Analyzer>,
    renderer: Arc<Renderer>,
    target: PipelineTarget,
    busy: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(
        fetcher: Fetcher,
        extractor: Arc<dyn Extractor>,
        analyzer: Analyzer,
        renderer: Renderer,
        target: PipelineTarget,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            analyzer: Arc::new(analyzer),
            renderer: Arc::new(renderer),
            target,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build every stage from configuration.
    pub fn from_config(config: &Config, paths: &DataPaths) -> Result<Self, PipelineError> {
        let fetcher = Fetcher::new(config.timeout(), config.allow_local_targets)?;
        let extractor = SelectorExtractor::new(config.selectors.as_slice())?;
        let analyzer = Analyzer::new()
            .max_words(config.max_words)
            .extra_stopwords(config.extra_stopwords.iter().cloned());
        let renderer = Renderer::from_config(&config.cloud, paths.font.as_deref())?;

        Ok(Self::new(
            fetcher,
            Arc::new(extractor),
            analyzer,
            renderer,
            PipelineTarget {
                url: config.news_url.clone(),
                headers: config.request_headers(),
                export_path: paths.export.clone(),
                image_path: paths.image.clone(),
            },
        ))
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_start(&self) -> Option<RunGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(Arc::clone(&self.busy)))
    }

    /// Run the whole pipeline for `session`.
    ///
    /// `events`, when given, receives a [`PipelineEvent::StageStarted`] per
    /// stage and a final `Finished` or `Failed`.
    pub async fn run(
        &self,
        session: &Session,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<RunReport, PipelineError> {
        let _guard = self.try_start().ok_or(PipelineError::AlreadyRunning)?;

        let result = self.run_stages(session, events).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    user = %report.user,
                    items = report.item_count,
                    words = report.top_words.len(),
                    image = %report.image_path.display(),
                    "Pipeline run finished"
                );
                notify(events, PipelineEvent::Finished).await;
            }
            Err(e) => {
                tracing::warn!(user = %session.username(), error = %e, "Pipeline run failed");
                notify(events, PipelineEvent::Failed(e.to_string())).await;
            }
        }
        result
    }

    async fn run_stages(
        &self,
        session: &Session,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<RunReport, PipelineError> {
        notify(events, PipelineEvent::StageStarted(Stage::Fetching)).await;
        let markup = self
            .fetcher
            .fetch(&self.target.url, &self.target.headers)
            .await?;

        notify(events, PipelineEvent::StageStarted(Stage::Extracting)).await;
        let extractor = Arc::clone(&self.extractor);
        let texts = tokio::task::spawn_blocking(move || extractor.extract(&markup)).await?;
        if texts.is_empty() {
            tracing::warn!(url = %self.target.url, "No news items matched the configured selectors");
        }

        notify(events, PipelineEvent::StageStarted(Stage::Exporting)).await;
        let export_path = self.target.export_path.clone();
        let texts = tokio::task::spawn_blocking(move || {
            write_export(&export_path, &texts).map(|()| texts)
        })
        .await??;
        let item_count = texts.len();

        notify(events, PipelineEvent::StageStarted(Stage::Analyzing)).await;
        let analyzer = Arc::clone(&self.analyzer);
        let table = tokio::task::spawn_blocking(move || analyzer.analyze(&texts)).await?;

        notify(events, PipelineEvent::StageStarted(Stage::Rendering)).await;
        let renderer = Arc::clone(&self.renderer);
        let (table, cloud) = tokio::task::spawn_blocking(move || {
            let cloud = renderer.render(&table);
            (table, cloud)
        })
        .await?;
        let cloud = cloud?;
        let placed_words = cloud.placements.len();

        let image_path = self.target.image_path.clone();
        tokio::task::spawn_blocking(move || write_image(&image_path, &cloud.png)).await??;

        Ok(RunReport {
            user: session.username().to_string(),
            item_count,
            kept_words: table.len(),
            top_words: table.iter().take(REPORT_TOP_WORDS).cloned().collect(),
            placed_words,
            export_path: self.target.export_path.clone(),
            image_path: self.target.image_path.clone(),
            finished_at: Utc::now(),
        })
    }
}

fn write_image(path: &std::path::Path, png: &[u8]) -> Result<(), PipelineError> {
    let wrap = |source| PipelineError::WriteImage {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }
    }
    std::fs::write(path, png).map_err(wrap)
}

async fn notify(events: Option<&mpsc::Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        if let Err(e) = tx.send(event).await {
            tracing::debug!(error = %e, "Pipeline event receiver dropped");
        }
    }
}
