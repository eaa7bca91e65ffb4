//! Breadth-first crawl engine
//!
//! The engine loop is the only owner of the frontier, the visited set and
//! the statistics. Workers run on a `JoinSet`, one per admitted task, and
//! hand back a report; link discovery happens in the loop when the
//! report arrives. The one question a worker has to ask mid-flight (may I
//! claim the URL a redirect led to?) goes over a channel to the loop.
//!
//! Admission is strict BFS: the head of the frontier at depth `k` is only
//! dispatched while no task shallower than `k - 1` is running, so every
//! depth-`d` task is admitted before any depth-`d + 1` task.

use super::dispatcher::{Dispatcher, DispatcherConfig, Permit};
use super::fetcher::{FetchResult, PageFetcher};
use super::gauge::PressureGauge;
use super::parser::parse_html;
use crate::config::{CrawlerConfig, OutputMode};
use crate::filter::ContentFilter;
use crate::output::{
    title_from_url, CrawlStatistics, MarkdownConverter, PageDocument, PageSink, PathError,
    PathMapper, WrittenPage,
};
use crate::state::{TaskProgress, TaskState};
use crate::url::{LinkDecision, LinkPolicy};
use crate::DocsError;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{Id, JoinSet};
use url::Url;

/// Completed tasks between progress log lines
const PROGRESS_EVERY: u64 = 10;

/// One page to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: Url,
    pub depth: u32,
    pub parent_url: Option<Url>,
}

impl CrawlTask {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            parent_url: None,
        }
    }
}

/// Pending tasks, grouped by depth and FIFO within a depth
#[derive(Debug, Default)]
pub struct Frontier {
    levels: BTreeMap<u32, VecDeque<CrawlTask>>,
    len: usize,
}

impl Frontier {
    pub fn push(&mut self, task: CrawlTask) {
        self.levels.entry(task.depth).or_default().push_back(task);
        self.len += 1;
    }

    /// Depth of the task that would be popped next
    pub fn head_depth(&self) -> Option<u32> {
        self.levels.keys().next().copied()
    }

    pub fn pop(&mut self) -> Option<CrawlTask> {
        let mut level = self.levels.first_entry()?;
        let task = level.get_mut().pop_front();
        if level.get().is_empty() {
            level.remove();
        }
        if task.is_some() {
            self.len -= 1;
        }
        task
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Every URL ever accepted into the frontier or claimed by a redirect
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<String>,
}

impl VisitedSet {
    /// Marks `url` visited; false if it already was
    pub fn claim(&mut self, url: &Url) -> bool {
        self.urls.insert(url.as_str().to_string())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls.contains(url.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Why a fetch produced no page
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("request timed out")]
    Timeout,
}

/// Problems with a single page or link
///
/// None of these abort the crawl; they end up in the page's outcome and the
/// statistics.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("malformed URL {0}")]
    MalformedUrl(String),

    #[error("{0} is outside the crawled site")]
    OffDomain(String),

    #[error("{0} was already visited")]
    AlreadyVisited(String),

    #[error("{0} is deeper than the maximum depth")]
    DepthExceeded(String),

    #[error("fetch failed: {0}")]
    FetchFailure(#[from] FetchFailure),

    #[error("not an HTML page ({0})")]
    ContentMismatch(String),

    #[error("no substantive content")]
    EmptyContent,

    #[error("classifier failed on {0} chunk(s), kept them unfiltered")]
    ClassificationFailure(usize),

    #[error("path traversal in {0}")]
    PathTraversal(String),

    #[error("write failed: {0}")]
    WriteFailure(String),

    #[error("invalid task state: {0}")]
    InvalidState(String),

    #[error("worker stopped unexpectedly: {0}")]
    WorkerPanic(String),
}

impl PageError {
    /// Short stable name used in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedUrl(_) => "malformed-url",
            Self::OffDomain(_) => "off-domain",
            Self::AlreadyVisited(_) => "already-visited",
            Self::DepthExceeded(_) => "depth-exceeded",
            Self::FetchFailure(FetchFailure::Network(_)) => "fetch-network",
            Self::FetchFailure(FetchFailure::Http(_)) => "fetch-http",
            Self::FetchFailure(FetchFailure::Timeout) => "fetch-timeout",
            Self::ContentMismatch(_) => "content-mismatch",
            Self::EmptyContent => "empty-content",
            Self::ClassificationFailure(_) => "classification-failure",
            Self::PathTraversal(_) => "path-traversal",
            Self::WriteFailure(_) => "write-failure",
            Self::InvalidState(_) => "invalid-state",
            Self::WorkerPanic(_) => "worker-panic",
        }
    }

    /// Terminal state of a task that ended with this error
    pub fn terminal_state(&self) -> TaskState {
        match self {
            Self::FetchFailure(_)
            | Self::WriteFailure(_)
            | Self::InvalidState(_)
            | Self::WorkerPanic(_) => TaskState::Failed,
            _ => TaskState::Skipped,
        }
    }
}

/// Final state of one admitted task
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub url: Url,
    pub depth: u32,
    pub state: TaskState,
    pub error: Option<PageError>,

    /// Written file (tree mode) or document (single mode)
    pub path: Option<String>,
}

/// Everything a finished crawl produced
#[derive(Debug)]
pub struct CrawlReport {
    pub stats: CrawlStatistics,

    /// One entry per admitted task, in completion order
    pub outcomes: Vec<PageOutcome>,

    /// Tasks in the order the dispatcher admitted them
    pub admission_order: Vec<CrawlTask>,

    pub pages: Vec<WrittenPage>,

    /// Summary (tree mode) or combined document (single mode)
    pub summary_path: Option<PathBuf>,

    /// The crawl was stopped before the frontier ran dry
    pub interrupted: bool,
}

impl CrawlReport {
    pub fn outcome(&self, url: &str) -> Option<&PageOutcome> {
        self.outcomes.iter().find(|o| o.url.as_str() == url)
    }
}

/// Links found on a fetched page, not yet resolved
#[derive(Debug)]
struct DiscoveredLinks {
    base: Url,
    hrefs: Vec<String>,
}

/// What a worker hands back to the engine loop
#[derive(Debug)]
struct TaskReport {
    task: CrawlTask,
    sequence: usize,
    state: TaskState,
    error: Option<PageError>,
    links: Option<DiscoveredLinks>,
    written: Option<WrittenPage>,
    classification_failures: usize,
}

/// Request to mark a redirect target visited
#[derive(Debug)]
struct Claim {
    url: Url,
    reply: oneshot::Sender<bool>,
}

/// Shared, read-only collaborators of every worker
struct WorkerContext {
    fetcher: Arc<dyn PageFetcher>,
    filter: ContentFilter,
    converter: Arc<dyn MarkdownConverter>,
    sink: Arc<PageSink>,
    mapper: PathMapper,
    policy: LinkPolicy,
    claims: mpsc::UnboundedSender<Claim>,
}

impl WorkerContext {
    async fn claim(&self, url: &Url) -> bool {
        let (reply, answer) = oneshot::channel();
        let claim = Claim {
            url: url.clone(),
            reply,
        };
        if self.claims.send(claim).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

/// Mutable crawl state, owned by the engine loop alone
struct CrawlState {
    frontier: Frontier,
    visited: VisitedSet,
    stats: CrawlStatistics,
    outcomes: Vec<PageOutcome>,
    admission_order: Vec<CrawlTask>,
    pages: Vec<WrittenPage>,

    /// Running tasks per depth; zero counts are removed
    in_flight: BTreeMap<u32, usize>,
    started: Instant,
}

impl CrawlState {
    fn new(seed: &Url) -> Self {
        let mut state = Self {
            frontier: Frontier::default(),
            visited: VisitedSet::default(),
            stats: CrawlStatistics::new(),
            outcomes: Vec::new(),
            admission_order: Vec::new(),
            pages: Vec::new(),
            in_flight: BTreeMap::new(),
            started: Instant::now(),
        };
        state.visited.claim(seed);
        state.frontier.push(CrawlTask::seed(seed.clone()));
        state.stats.discovered = 1;
        state
    }

    /// True when the frontier's head may be dispatched now
    fn can_dispatch(&self) -> bool {
        match self.frontier.head_depth() {
            Some(depth) => bfs_gate_open(depth, &self.in_flight),
            None => false,
        }
    }

    fn admit(&mut self) -> Option<(CrawlTask, usize)> {
        let task = self.frontier.pop()?;
        let sequence = self.admission_order.len();
        self.admission_order.push(task.clone());
        *self.in_flight.entry(task.depth).or_insert(0) += 1;
        tracing::debug!("Admitted {} (depth {}, #{})", task.url, task.depth, sequence);
        Some((task, sequence))
    }

    fn finish_flight(&mut self, depth: u32) {
        if let Some(count) = self.in_flight.get_mut(&depth) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(&depth);
            }
        }
    }

    fn enqueue_links(&mut self, policy: &LinkPolicy, parent: &CrawlTask, links: DiscoveredLinks) {
        self.stats.links_seen += links.hrefs.len() as u64;

        for href in links.hrefs {
            match policy.classify_link(&href, &links.base, parent.depth) {
                LinkDecision::Accept(url) => {
                    if self.visited.claim(&url) {
                        tracing::debug!("Discovered {} at depth {}", url, parent.depth + 1);
                        self.frontier.push(CrawlTask {
                            url,
                            depth: parent.depth + 1,
                            parent_url: Some(parent.url.clone()),
                        });
                        self.stats.discovered += 1;
                    }
                }
                LinkDecision::Malformed(e) => {
                    tracing::warn!("Skipping malformed link {:?} on {}: {}", href, parent.url, e);
                    self.stats
                        .record_error(PageError::MalformedUrl(href.clone()).kind());
                }
                LinkDecision::OffDomain(url) => {
                    tracing::trace!("Ignoring off-site link {}", url);
                }
                LinkDecision::DepthExceeded(url) => {
                    tracing::trace!("Ignoring {} beyond max depth", url);
                }
            }
        }
    }

    /// Records a task whose worker never produced a report
    fn record_lost(
        &mut self,
        policy: &LinkPolicy,
        task: CrawlTask,
        sequence: usize,
        reason: String,
    ) -> Result<(), DocsError> {
        tracing::error!("Crawl worker for {} did not finish: {}", task.url, reason);
        self.record(
            policy,
            TaskReport {
                task,
                sequence,
                state: TaskState::Failed,
                error: Some(PageError::WorkerPanic(reason)),
                links: None,
                written: None,
                classification_failures: 0,
            },
        )
    }

    /// Folds a worker's report into the crawl state
    fn record(&mut self, policy: &LinkPolicy, report: TaskReport) -> Result<(), DocsError> {
        let TaskReport {
            task,
            sequence,
            state,
            error,
            links,
            written,
            classification_failures,
        } = report;

        self.finish_flight(task.depth);

        if task.depth == 0 {
            if let Some(PageError::FetchFailure(failure)) = &error {
                return Err(DocsError::SeedUnreachable {
                    url: task.url.to_string(),
                    reason: failure.to_string(),
                });
            }
        }

        if let Some(links) = links {
            self.enqueue_links(policy, &task, links);
        }

        if classification_failures > 0 {
            self.stats.classification_failures += classification_failures as u64;
            let failure = PageError::ClassificationFailure(classification_failures);
            tracing::warn!("{}: {}", task.url, failure);
            self.stats.record_error(failure.kind());
        }

        match (&error, state) {
            (None, TaskState::Done) => self.stats.record_success(task.depth),
            (Some(e), TaskState::Failed) => {
                tracing::warn!("Failed {}: {}", task.url, e);
                self.stats.record_failed(e.kind());
            }
            (Some(e), _) => {
                tracing::info!("Skipped {}: {}", task.url, e);
                self.stats.record_skipped(e.kind());
            }
            (None, other) => {
                tracing::error!("Task {} ended in unexpected state {}", task.url, other);
                self.stats.record_failed("invalid-state");
            }
        }

        let path = written.as_ref().map(|w| w.path.clone());
        if let Some(page) = written {
            self.pages.push(page);
        }
        tracing::debug!("Finished {} (#{}) as {}", task.url, sequence, state);
        self.outcomes.push(PageOutcome {
            url: task.url,
            depth: task.depth,
            state,
            error,
            path,
        });

        if self.stats.processed % PROGRESS_EVERY == 0 {
            let elapsed = self.started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                self.stats.processed as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(
                "Progress: {} pages done, {} in frontier, {:.2} pages/sec",
                self.stats.processed,
                self.frontier.len(),
                rate
            );
        }

        Ok(())
    }
}

/// Strict BFS admission check
///
/// A head task at `depth` may start only if no running task is shallower
/// than `depth - 1`. `in_flight` must not contain zero counts.
fn bfs_gate_open(depth: u32, in_flight: &BTreeMap<u32, usize>) -> bool {
    match in_flight.keys().next() {
        Some(shallowest) => shallowest + 1 >= depth,
        None => true,
    }
}

/// BFS crawler over one documentation site
pub struct CrawlEngine {
    seed: Url,
    dispatcher: Dispatcher,
    context: WorkerContext,
    claims: mpsc::UnboundedReceiver<Claim>,
}

impl CrawlEngine {
    /// Creates an engine for `seed`
    ///
    /// The seed is normalized with the crawl's rules and becomes the site
    /// that decides which links are followed.
    pub fn new(
        config: &CrawlerConfig,
        seed: &Url,
        fetcher: Arc<dyn PageFetcher>,
        filter: ContentFilter,
        converter: Arc<dyn MarkdownConverter>,
        sink: Arc<PageSink>,
        gauge: Arc<dyn PressureGauge>,
    ) -> Result<Self, DocsError> {
        let bootstrap = LinkPolicy::new(seed.clone(), config);
        let seed = bootstrap.normalize(seed.as_str(), None)?;
        let policy = LinkPolicy::new(seed.clone(), config);
        let (claims_tx, claims) = mpsc::unbounded_channel();

        Ok(Self {
            dispatcher: Dispatcher::new(DispatcherConfig::from(config), gauge),
            context: WorkerContext {
                fetcher,
                filter,
                converter,
                sink,
                mapper: PathMapper::new(&seed),
                policy,
                claims: claims_tx,
            },
            seed,
            claims,
        })
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Crawls until the frontier is exhausted or Ctrl-C is pressed
    pub async fn run(self) -> Result<CrawlReport, DocsError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Crawls until the frontier is exhausted or `shutdown` completes
    ///
    /// On shutdown no further task is admitted; tasks already running are
    /// drained and their pages still written.
    pub async fn run_until<F>(self, shutdown: F) -> Result<CrawlReport, DocsError>
    where
        F: Future<Output = ()>,
    {
        let CrawlEngine {
            seed,
            dispatcher,
            context,
            mut claims,
        } = self;
        let context = Arc::new(context);
        let policy = context.policy.clone();

        tracing::info!(
            "Starting crawl of {} (max depth {}, {} filter, {:?} output)",
            seed,
            policy.max_depth(),
            context.filter.name(),
            context.sink.mode()
        );

        let sampler = dispatcher.spawn_sampler();
        let mut state = CrawlState::new(&seed);
        let mut workers: JoinSet<TaskReport> = JoinSet::new();
        let mut running: HashMap<Id, (CrawlTask, usize)> = HashMap::new();
        let mut interrupted = false;
        tokio::pin!(shutdown);

        let outcome: Result<(), DocsError> = loop {
            let dispatchable = !interrupted && state.can_dispatch();
            if !dispatchable && workers.is_empty() {
                break Ok(());
            }

            tokio::select! {
                _ = &mut shutdown, if !interrupted => {
                    tracing::warn!(
                        "Interrupted: draining {} running task(s), {} left in frontier",
                        workers.len(),
                        state.frontier.len()
                    );
                    interrupted = true;
                    dispatcher.close();
                }
                Some(claim) = claims.recv() => {
                    let fresh = state.visited.claim(&claim.url);
                    let _ = claim.reply.send(fresh);
                }
                Some(joined) = workers.join_next_with_id() => {
                    let recorded = match joined {
                        Ok((id, report)) => {
                            running.remove(&id);
                            state.record(&policy, report)
                        }
                        Err(e) => match running.remove(&e.id()) {
                            Some((task, sequence)) => {
                                state.record_lost(&policy, task, sequence, e.to_string())
                            }
                            None => {
                                tracing::error!("Unknown crawl worker did not finish: {}", e);
                                Ok(())
                            }
                        },
                    };
                    if let Err(e) = recorded {
                        break Err(e);
                    }
                }
                admitted = dispatcher.admit(), if dispatchable => {
                    match admitted {
                        Ok(permit) => {
                            if let Some((task, sequence)) = state.admit() {
                                let context = Arc::clone(&context);
                                let handle = workers.spawn(process_task(
                                    context,
                                    task.clone(),
                                    sequence,
                                    permit,
                                ));
                                running.insert(handle.id(), (task, sequence));
                            }
                        }
                        Err(_) => interrupted = true,
                    }
                }
                else => break Ok(()),
            }
        };

        sampler.abort();
        dispatcher.close();
        outcome?;

        if !interrupted && !state.frontier.is_empty() {
            tracing::warn!(
                "{} task(s) were never admitted",
                state.frontier.len()
            );
        }

        state.stats.finish();
        let summary_path = context.sink.finish(&state.pages, &state.stats).await?;

        tracing::info!(
            "Crawl finished: {} written, {} skipped, {} failed in {:.2}s",
            state.stats.succeeded,
            state.stats.skipped,
            state.stats.failed,
            state.stats.duration_seconds()
        );

        Ok(CrawlReport {
            stats: state.stats,
            outcomes: state.outcomes,
            admission_order: state.admission_order,
            pages: state.pages,
            summary_path,
            interrupted,
        })
    }
}

/// Runs one task through fetch, filter and write
async fn process_task(
    context: Arc<WorkerContext>,
    task: CrawlTask,
    sequence: usize,
    permit: Permit,
) -> TaskReport {
    let mut report = TaskReport {
        task,
        sequence,
        state: TaskState::Pending,
        error: None,
        links: None,
        written: None,
        classification_failures: 0,
    };
    let mut progress = TaskProgress::new();

    let result = run_pipeline(&context, &mut progress, &mut report).await;
    drop(permit);

    let terminal = match &result {
        Ok(()) => TaskState::Done,
        Err(e) => e.terminal_state(),
    };
    report.state = match progress.advance(terminal) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("{}: {}", report.task.url, e);
            report.error = Some(PageError::InvalidState(e.to_string()));
            TaskState::Failed
        }
    };
    if let Err(e) = result {
        report.error.get_or_insert(e);
    }
    report
}

fn advance(progress: &mut TaskProgress, next: TaskState) -> Result<(), PageError> {
    progress
        .advance(next)
        .map(|_| ())
        .map_err(|e| PageError::InvalidState(e.to_string()))
}

async fn run_pipeline(
    context: &WorkerContext,
    progress: &mut TaskProgress,
    report: &mut TaskReport,
) -> Result<(), PageError> {
    let requested = report.task.url.clone();
    let depth = report.task.depth;
    advance(progress, TaskState::Fetching)?;

    let (final_url, body) = match context.fetcher.fetch(&requested).await {
        FetchResult::Success {
            final_url, body, ..
        } => (final_url, body),
        FetchResult::ContentMismatch { content_type } => {
            return Err(PageError::ContentMismatch(content_type))
        }
        FetchResult::HttpError { status_code } => {
            return Err(FetchFailure::Http(status_code).into())
        }
        FetchResult::NetworkError { error } => return Err(FetchFailure::Network(error).into()),
        FetchResult::Timeout => return Err(FetchFailure::Timeout.into()),
    };

    let page_url = resolve_redirect(context, &requested, final_url).await?;

    let parsed = parse_html(&body);
    let base = parsed
        .base_href
        .as_deref()
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone());
    report.links = Some(DiscoveredLinks {
        base,
        hrefs: parsed.links,
    });

    advance(progress, TaskState::Filtering)?;
    let content = context.filter.filter(&body).await;
    report.classification_failures = content.classification_failures;
    if content.is_empty() {
        return Err(PageError::EmptyContent);
    }

    advance(progress, TaskState::Writing)?;
    let markdown = context.converter.convert(&content.html);
    if markdown.trim().is_empty() {
        return Err(PageError::EmptyContent);
    }

    let target = match context.sink.mode() {
        OutputMode::Tree => Some(context.mapper.map_to_path(&page_url).map_err(|e| match e {
            PathError::Traversal(url) => PageError::PathTraversal(url),
            PathError::MissingHost(url) => PageError::MalformedUrl(url),
        })?),
        OutputMode::Single => None,
    };

    let title = parsed
        .title
        .unwrap_or_else(|| title_from_url(&page_url));
    let document = PageDocument {
        url: page_url.clone(),
        title: title.clone(),
        markdown,
        depth,
        sequence: report.sequence,
    };

    let path = context
        .sink
        .write_page(target.as_ref(), document)
        .await
        .map_err(|e| {
            tracing::error!("Failed to write {}: {}", page_url, e);
            PageError::WriteFailure(e.to_string())
        })?;

    report.written = Some(WrittenPage {
        url: page_url,
        title,
        path,
        depth,
        sequence: report.sequence,
    });
    Ok(())
}

/// Settles which URL a fetched page belongs to
///
/// A redirect to a different URL claims that URL as visited. Redirects that
/// leave the site or land on a page already claimed end the task.
async fn resolve_redirect(
    context: &WorkerContext,
    requested: &Url,
    final_url: Url,
) -> Result<Url, PageError> {
    if &final_url == requested {
        return Ok(final_url);
    }

    let normalized = context
        .policy
        .normalize(final_url.as_str(), None)
        .unwrap_or(final_url);
    if &normalized == requested {
        return Ok(normalized);
    }

    tracing::debug!("{} redirected to {}", requested, normalized);
    if !context.policy.is_same_domain(&normalized) {
        return Err(PageError::OffDomain(normalized.to_string()));
    }
    if !context.claim(&normalized).await {
        return Err(PageError::AlreadyVisited(normalized.to_string()));
    }
    Ok(normalized)
}
