pub mod collector;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::adapters::graphql::client::OlxGraphQLClient;
use crate::domain::offer::OfferSource;
use crate::domain::search_params::{PageContext, build_search_parameters};
use crate::error::{OlxMapError, Result};

use self::collector::{OfferCollector, RenderMode};

/// Hard ceiling on next-link requests per load sequence.
pub const MAX_CONTINUATIONS: u32 = 5;

pub const FAILURE_STATUS: &str = "Failed to fetch data or execute the GraphQL request.";

/// Where the current (or last) load sequence is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    ResolvingParameters,
    Searching,
    FollowingLinks(u32),
    Done(u32),
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ResolvingParameters => write!(f, "resolving parameters"),
            Self::Searching => write!(f, "searching"),
            Self::FollowingLinks(n) => write!(f, "following links ({n} done)"),
            Self::Done(n) => write!(f, "done after {n} continuation(s)"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Completed { continuations: u32 },
    Failed(OlxMapError),
    /// Another sequence was in flight; nothing was touched.
    AlreadyRunning,
}

impl LoadOutcome {
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Completed { continuations } => Some(format!(
                "Sent GraphQL search request. Follow-up requests via next.href: {continuations} (max {MAX_CONTINUATIONS})."
            )),
            Self::Failed(_) => Some(FAILURE_STATUS.into()),
            Self::AlreadyRunning => None,
        }
    }
}

/// Clears the in-flight flag on every exit path, unwinding included.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Active loader: resolves the page's filters, runs the search and follows
/// next links, merging every page into the shared collector.
pub struct MapSession {
    collector: Arc<OfferCollector>,
    client: OlxGraphQLClient,
    cookie: Option<String>,
    in_flight: AtomicBool,
    state: Mutex<LoadState>,
}

impl MapSession {
    pub fn new(
        collector: Arc<OfferCollector>,
        client: OlxGraphQLClient,
        cookie: Option<String>,
    ) -> Self {
        Self {
            collector,
            client,
            cookie,
            in_flight: AtomicBool::new(false),
            state: Mutex::new(LoadState::Idle),
        }
    }

    pub fn collector(&self) -> &Arc<OfferCollector> {
        &self.collector
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn transition(&self, next: LoadState) {
        debug!(state = %next, "Load state");
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn page_context(&self, page_url: &str) -> Result<PageContext> {
        PageContext::parse(page_url, self.cookie.clone())
    }

    /// Runs one full load sequence for `page` and posts its outcome as the view status.
    pub async fn load_more(&self, page: &PageContext) -> LoadOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Load already in flight, ignoring");
            return LoadOutcome::AlreadyRunning;
        };

        let outcome = match self.run(page).await {
            Ok(continuations) => {
                self.transition(LoadState::Done(continuations));
                info!(continuations, stored = self.collector.len(), "Load sequence finished");
                LoadOutcome::Completed { continuations }
            }
            Err(e) => {
                self.transition(LoadState::Failed);
                warn!(error = %e, "Load sequence failed");
                LoadOutcome::Failed(e)
            }
        };
        if let Some(status) = outcome.status_message() {
            self.collector.set_status(&status);
        }
        outcome
    }

    async fn run(&self, page: &PageContext) -> Result<u32> {
        let origin = page.origin();

        self.transition(LoadState::ResolvingParameters);
        let resolution = self.client.resolve_parameters(page).await?;
        let params = build_search_parameters(&resolution, &page.pagination());

        self.transition(LoadState::Searching);
        let first = self.client.search(&params, &origin).await?;
        let added = self
            .collector
            .merge(&first.offers, OfferSource::InitialSearch, RenderMode::Refresh);
        debug!(records = first.offers.len(), added = added.len(), "Search page merged");

        let mut next = first.next;
        let mut continuations = 0;
        while let Some(url) = next.take() {
            if continuations >= MAX_CONTINUATIONS {
                debug!(%url, "Continuation cap reached");
                break;
            }
            continuations += 1;
            self.transition(LoadState::FollowingLinks(continuations));

            let page = self
                .client
                .fetch_continuation(&url, continuations, &origin)
                .await?;
            let added = self.collector.merge(
                &page.offers,
                OfferSource::Continuation(continuations),
                RenderMode::Skip,
            );
            debug!(
                iteration = continuations,
                records = page.offers.len(),
                added = added.len(),
                "Continuation merged"
            );
            self.collector.insert_incrementally(&added).await;
            next = page.next;
        }
        Ok(continuations)
    }
}
