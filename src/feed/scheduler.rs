//! Background fetch scheduler.
//!
//! Every tick picks the single stalest feed, claims it, fetches it and stores
//! its items. Overlap between ticks is bounded by a semaphore: a tick that
//! finds no free permit is skipped.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::fetcher::FeedFetcher;
use super::ingest::{ingest_items, IngestReport};
use super::repository::FeedRepository;
use super::types::Feed;
use crate::db::Database;
use crate::Result;

/// What one scheduler iteration did.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// The feed that was claimed and fetched.
    pub feed: Feed,
    /// Ingestion counts.
    pub report: IngestReport,
}

/// Feed fetch scheduler.
#[derive(Debug, Clone)]
pub struct FetchScheduler {
    db: Database,
    fetcher: FeedFetcher,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl FetchScheduler {
    /// Create a scheduler allowing `max_concurrent` iterations in flight.
    ///
    /// A limit of zero is treated as one.
    pub fn new(db: Database, fetcher: FeedFetcher, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            db,
            fetcher,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Maximum number of concurrent iterations.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of iterations currently running.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Run one select, claim, fetch and ingest iteration.
    ///
    /// Returns `Ok(None)` when there are no feeds. The claim is kept even
    /// when the fetch or the ingestion fails.
    pub async fn run_once(&self) -> Result<Option<CycleOutcome>> {
        let repo = FeedRepository::new(self.db.pool());

        let Some(feed) = repo.next_to_fetch().await? else {
            debug!("No feeds to fetch");
            return Ok(None);
        };

        let claimed_at = Utc::now();
        if !repo.mark_fetched(&feed.id, claimed_at).await? {
            debug!(feed_id = %feed.id, "Feed already claimed more recently");
        }

        debug!(feed_id = %feed.id, url = %feed.url, "Fetching feed {}", feed.name);
        let parsed = match self.fetcher.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(feed_id = %feed.id, url = %feed.url, "Failed to fetch feed: {}", e);
                return Err(e);
            }
        };

        let report = ingest_items(self.db.pool(), &feed, &parsed.items).await?;

        if report.inserted > 0 {
            info!(
                feed_id = %feed.id,
                inserted = report.inserted,
                skipped = report.skipped,
                "Feed {} updated: {} new post(s)",
                feed.name,
                report.inserted
            );
        } else {
            debug!(feed_id = %feed.id, skipped = report.skipped, "Feed {} updated: no new posts", feed.name);
        }

        Ok(Some(CycleOutcome { feed, report }))
    }

    /// Run iterations every `period` until `shutdown` completes.
    ///
    /// The first tick fires immediately. Iterations run on spawned tasks and
    /// their errors are logged. Iterations still running at shutdown are left
    /// to finish or be dropped with the runtime.
    pub async fn run<S>(&self, period: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        info!(
            "Fetch scheduler started (every {}, up to {} concurrent)",
            humantime::format_duration(period),
            self.max_concurrent
        );

        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Fetch scheduler stopping");
                    break;
                }
                _ = timer.tick() => self.spawn_iteration(),
            }
        }
    }

    fn spawn_iteration(&self) {
        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Previous fetch still running, skipping tick");
                return;
            }
        };

        let scheduler = self.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.run_once().await {
                error!("Fetch iteration failed: {}", e);
            }
            // Permit is dropped here, freeing the slot for the next tick
            drop(permit);
        });
    }
}
