//! The page collection loop.
//!
//! Each round reads every rendered page image, saves the ones not seen
//! before, and advances the viewer. Flipbook viewers re-render the same pages
//! while a page turn animates, so one round without anything new does not
//! mean the end of the book: the run only stops after `max_no_new_rounds`
//! consecutive empty rounds, or as soon as the page image selector matches
//! nothing at all.

use crate::config::FlipbookConfig;
use crate::error::{BrowserError, ConfigError};
use crate::persister::{ImagePersister, is_inline_image};
use crate::results::{CollectionSummary, StopReason};
use crate::utils::page_filename;
use crate::viewer::{Advance, Viewer};
use std::collections::HashSet;
use std::time::Duration;

/// Settings the collection loop runs with
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub page_image_selector: String,
    pub next_selector: String,
    pub max_no_new_rounds: u32,
    /// Settle time after each page turn
    pub click_wait: Duration,
}

impl TryFrom<&FlipbookConfig> for CollectorConfig {
    type Error = ConfigError;

    fn try_from(config: &FlipbookConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            page_image_selector: config.selectors.page_image.clone(),
            next_selector: config.selectors.next.clone(),
            max_no_new_rounds: config.max_no_new_rounds,
            click_wait: config.click_wait()?,
        })
    }
}

/// Counters for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    pub total_saved: usize,
    pub rounds_without_new: u32,
    pub round: usize,
}

impl CollectionState {
    /// Fold one round's result into the counters
    pub fn finish_round(&mut self, new_in_round: usize) {
        if new_in_round > 0 {
            self.rounds_without_new = 0;
        } else {
            self.rounds_without_new += 1;
        }
    }
}

pub struct PageCollector<'a, V: Viewer + ?Sized> {
    viewer: &'a mut V,
    persister: ImagePersister,
    config: CollectorConfig,
    // Exact source strings already written to disk
    seen: HashSet<String>,
    state: CollectionState,
}

impl<'a, V: Viewer + ?Sized> PageCollector<'a, V> {
    pub fn new(viewer: &'a mut V, persister: ImagePersister, config: CollectorConfig) -> Self {
        Self {
            viewer,
            persister,
            config,
            seen: HashSet::new(),
            state: CollectionState::default(),
        }
    }

    /// Run rounds until one of the stop conditions holds
    pub async fn run(mut self) -> Result<CollectionSummary, BrowserError> {
        let max = self.config.max_no_new_rounds;
        let mut stop_reason = StopReason::NoNewPages;

        while self.state.rounds_without_new < max {
            self.state.round += 1;
            ::log::info!("Starting round {}", self.state.round);

            let sources = self
                .viewer
                .image_sources(&self.config.page_image_selector)
                .await?;

            if sources.is_empty() {
                ::log::warn!(
                    "No elements match {}, stopping",
                    self.config.page_image_selector
                );
                stop_reason = StopReason::NoPageImages;
                break;
            }
            ::log::info!("Found {} page images", sources.len());

            let new_in_round = self.save_new_pages(sources);
            self.state.finish_round(new_in_round);

            ::log::info!(
                "[round {}] new_found={}, total_saved={}, rounds_without_new={}",
                self.state.round,
                new_in_round,
                self.state.total_saved,
                self.state.rounds_without_new
            );

            if self.state.rounds_without_new >= max {
                ::log::info!("{} rounds without a new page, stopping", max);
                break;
            }

            let advance = Advance::select(&mut *self.viewer, &self.config.next_selector).await?;
            advance
                .perform(&mut *self.viewer, &self.config.next_selector)
                .await?;

            tokio::time::sleep(self.config.click_wait).await;
        }

        debug_assert_eq!(self.seen.len(), self.state.total_saved);

        Ok(CollectionSummary {
            total_saved: self.state.total_saved,
            rounds: self.state.round,
            stop_reason,
            output_dir: self.persister.output_dir().to_path_buf(),
        })
    }

    /// Persist every unseen inline source and return how many were saved
    fn save_new_pages(&mut self, sources: Vec<Option<String>>) -> usize {
        let mut new_in_round = 0;

        for source in sources.into_iter().flatten() {
            if !is_inline_image(&source) {
                ::log::debug!("Skipping non-inline source");
                continue;
            }
            if self.seen.contains(&source) {
                continue;
            }

            let file_name = page_filename(self.seen.len() + 1);
            if self.persister.persist(&source, &file_name) {
                ::log::info!("Saved new page: {}", file_name);
                self.seen.insert(source);
                self.state.total_saved += 1;
                new_in_round += 1;
            }
        }

        new_in_round
    }
}
