//! The poll loop: fetch, select, assemble, summarize, publish, sleep.

use chrono::{DateTime, Utc};
use llm_interface::{extract_tweet, LlmProvider};
use post_selector::PostSelector;
use std::time::Duration;
use threadcast_core::{
    AppConfig, AssembledDocument, ContentSource, CoreError, DedupLedger, ErrorExt, ErrorReporter,
    Item, SelectionPolicy, TweetExtraction,
};
use tracing::{debug, info, warn};
use x_poster::Publisher;

/// How one cycle of the loop ended. No outcome stops the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoEligibleItem,
    FetchFailed,
    LedgerFailed,
    GenerationFailed,
    PublishFailed,
    Published { item_id: String, tweet_id: String },
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub subreddit: String,
    pub fetch_limit: u32,
    pub policy: SelectionPolicy,
    pub tweet_extraction: TweetExtraction,
    pub interval: Duration,
}

impl PollSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            subreddit: config.source.subreddit.clone(),
            fetch_limit: config.fetch_limit(),
            policy: config.policy(),
            tweet_extraction: config.generation.tweet_extraction,
            interval: config.poll.interval(),
        }
    }
}

pub struct PollService<S, G, P, L> {
    source: S,
    generator: G,
    publisher: P,
    ledger: L,
    selector: PostSelector,
    settings: PollSettings,
    reporter: ErrorReporter,
}

impl<S, G, P, L> PollService<S, G, P, L>
where
    S: ContentSource,
    G: LlmProvider,
    P: Publisher,
    L: DedupLedger,
{
    pub fn new(source: S, generator: G, publisher: P, ledger: L, settings: PollSettings) -> Self {
        Self {
            source,
            generator,
            publisher,
            ledger,
            selector: PostSelector::new(settings.policy.clone()),
            settings,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Runs cycles forever, sleeping the configured interval between them.
    pub async fn run(&mut self) {
        info!(
            subreddit = %self.settings.subreddit,
            interval_secs = self.settings.interval.as_secs(),
            "Starting poll loop"
        );
        loop {
            self.run_once().await;
            info!(
                stage = "sleeping",
                "Sleeping for {} seconds",
                self.settings.interval.as_secs()
            );
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    pub async fn run_once(&mut self) -> CycleOutcome {
        let outcome = self.run_cycle(Utc::now()).await;
        info!(outcome = ?outcome, "Cycle finished");
        outcome
    }

    /// One pass of the pipeline, evaluated against `now`.
    ///
    /// The selected item is recorded in the ledger before its comments are
    /// fetched, so a later failure never makes it eligible again.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        info!(stage = "fetching", subreddit = %self.settings.subreddit, "Fetching recent items");
        let items = match self
            .source
            .list_recent_items(&self.settings.subreddit, self.settings.fetch_limit)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                self.reporter.report_error(&e);
                return CycleOutcome::FetchFailed;
            }
        };

        let item = match self.selector.select(items, now, &mut self.ledger).await {
            Ok(Some(item)) => item,
            Ok(None) => return CycleOutcome::NoEligibleItem,
            Err(e) => {
                self.reporter.report_error(&e);
                return CycleOutcome::LedgerFailed;
            }
        };
        let item_id = item.id.clone();

        let document = match self.assemble(item).await {
            Ok(document) => document,
            Err(e) => {
                self.reporter.report_error(&e);
                return CycleOutcome::FetchFailed;
            }
        };

        info!(stage = "summarizing", item_id = %item_id, "Generating message");
        let tweet = match self.summarize(&document).await {
            Ok(tweet) => tweet,
            Err(e) => {
                e.log_warn();
                warn!(item_id = %item_id, "No tweet produced for this item");
                return CycleOutcome::GenerationFailed;
            }
        };
        info!(item_id = %item_id, "Generated message: {}", tweet);

        info!(stage = "publishing", item_id = %item_id, "Publishing message");
        match self.publisher.publish(&tweet).await {
            Ok(receipt) => {
                info!(item_id = %item_id, tweet_id = %receipt.id, "Published message");
                CycleOutcome::Published {
                    item_id,
                    tweet_id: receipt.id,
                }
            }
            Err(e) => {
                self.reporter.report_error(&e);
                CycleOutcome::PublishFailed
            }
        }
    }

    async fn assemble(&self, item: Item) -> Result<AssembledDocument, CoreError> {
        info!(stage = "assembling", item_id = %item.id, "Building comment tree");
        let raw_comments = if self.selector.policy().depth_limit == 0 {
            Vec::new()
        } else {
            self.source.fetch_comments(&item.id).await?
        };

        let document = self.selector.assemble(item, &raw_comments);
        debug!(
            item_id = %document.item.id,
            top_level = document.comments.len(),
            depth = document.tree_depth(),
            "Assembled document"
        );
        Ok(document)
    }

    async fn summarize(&self, document: &AssembledDocument) -> Result<String, CoreError> {
        let response = self.generator.generate(document).await?;
        extract_tweet(&response, self.settings.tweet_extraction)
    }
}
