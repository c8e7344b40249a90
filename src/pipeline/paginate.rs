//! Pagination controller.
//!
//! Walks listing pages in order and stops early. Listings are assumed to be
//! sorted by date, newest first: once today's notices have been seen, the
//! first page without any marks the end of today's window. If nothing
//! has turned up by the probe threshold, today is taken to have no notices.

use crate::models::{Notice, RunContext};
use crate::services::{EntryFilter, ListingSource};

/// Why pagination ended before `max_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Today's notices were found and a later page had none
    EndOfToday,
    /// Probed past the threshold without finding any of today's notices
    ProbeExhausted,
}

/// What to do after a page has been filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Continue,
    Stop(StopReason),
}

/// Decide whether to fetch the page after `page`.
///
/// `found_before` covers earlier pages only.
pub fn decide(
    page: u32,
    found_on_page: bool,
    found_before: bool,
    probe_pages: u32,
) -> PageDecision {
    if found_on_page {
        PageDecision::Continue
    } else if found_before {
        PageDecision::Stop(StopReason::EndOfToday)
    } else if page > probe_pages {
        PageDecision::Stop(StopReason::ProbeExhausted)
    } else {
        PageDecision::Continue
    }
}

/// Drives a listing source page by page, filtering as it goes.
pub struct Paginator<'a> {
    source: &'a dyn ListingSource,
    filter: &'a EntryFilter,
}

impl<'a> Paginator<'a> {
    pub fn new(source: &'a dyn ListingSource, filter: &'a EntryFilter) -> Self {
        Self { source, filter }
    }

    /// Collect today's accepted notices across pages, in page order.
    pub async fn collect(&self, ctx: &RunContext) -> Vec<Notice> {
        let mut collected = Vec::new();
        let mut found_today = false;

        for page in 1..=ctx.max_pages {
            if page > 1 && !ctx.page_delay.is_zero() {
                tokio::time::sleep(ctx.page_delay).await;
            }

            let candidates = self.source.fetch_page(page).await;
            let accepted = self.filter.accept_all(&candidates, ctx.target_date);
            log::info!(
                "Page {}: {} of {} candidates accepted",
                page,
                accepted.len(),
                candidates.len()
            );

            let decision = decide(page, !accepted.is_empty(), found_today, ctx.probe_pages);
            if !accepted.is_empty() {
                found_today = true;
                collected.extend(accepted);
            }

            match decision {
                PageDecision::Continue => {}
                PageDecision::Stop(StopReason::EndOfToday) => {
                    log::info!("Reached the end of {} notices at page {}", ctx.target_date, page);
                    break;
                }
                PageDecision::Stop(StopReason::ProbeExhausted) => {
                    log::info!(
                        "Checked {} pages without finding notices for {}",
                        page,
                        ctx.target_date
                    );
                    break;
                }
            }
        }

        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, Config};
    use crate::testing::{ScriptedSource, run_context, today_candidate};

    fn filter() -> EntryFilter {
        EntryFilter::from_config(&Config::default())
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(1, true, false, 3), PageDecision::Continue);
        assert_eq!(decide(5, true, true, 3), PageDecision::Continue);
        assert_eq!(
            decide(2, false, true, 3),
            PageDecision::Stop(StopReason::EndOfToday)
        );
        assert_eq!(decide(3, false, false, 3), PageDecision::Continue);
        assert_eq!(
            decide(4, false, false, 3),
            PageDecision::Stop(StopReason::ProbeExhausted)
        );
    }

    #[tokio::test]
    async fn test_empty_listing_yields_nothing() {
        let source = ScriptedSource::new(vec![]);
        let filter = filter();
        let notices = Paginator::new(&source, &filter).collect(&run_context()).await;

        assert!(notices.is_empty());
        assert_eq!(source.calls(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_stops_after_first_empty_page_once_found() {
        let source = ScriptedSource::new(vec![
            vec![today_candidate(1, "某工程公开招标公告")],
            vec![],
            vec![today_candidate(2, "不应访问")],
        ]);
        let filter = filter();
        let notices = Paginator::new(&source, &filter).collect(&run_context()).await;

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "某工程公开招标公告");
        assert_eq!(source.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_keeps_probing_until_threshold() {
        let source = ScriptedSource::new(vec![
            vec![],
            vec![],
            vec![today_candidate(7, "第三页工程招标公告")],
            vec![today_candidate(8, "第四页工程招标公告")],
        ]);
        let filter = filter();
        let notices = Paginator::new(&source, &filter).collect(&run_context()).await;

        assert_eq!(notices.len(), 2);
        assert_eq!(source.calls(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_rejected_candidates_count_as_empty_page() {
        let stale = Candidate::new(
            "旧工程招标公告",
            "https://www.gsei.com.cn/html/1336/2026-10-18/content-3.html",
            "2026-10-18",
        );
        let source = ScriptedSource::new(vec![
            vec![today_candidate(1, "甲工程招标公告")],
            vec![stale, today_candidate(2, "乙项目中标公告")],
        ]);
        let filter = filter();
        let notices = Paginator::new(&source, &filter).collect(&run_context()).await;

        assert_eq!(notices.len(), 1);
        assert_eq!(source.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_respects_max_pages() {
        let pages = (1..=6)
            .map(|i| vec![today_candidate(i, "工程招标公告")])
            .collect();
        let source = ScriptedSource::new(pages);
        let filter = filter();
        let mut ctx = run_context();
        ctx.max_pages = 3;

        let notices = Paginator::new(&source, &filter).collect(&ctx).await;
        assert_eq!(notices.len(), 3);
        assert_eq!(source.calls(), vec![1, 2, 3]);
    }
}
