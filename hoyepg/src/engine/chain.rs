use std::fmt;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, ParseError};
use crate::guide::{ChannelRegistry, ProgrammeEntry, build_entries};

use super::browser::PageRenderer;
use super::fetch::PageFetcher;
use super::{normalize, patterns, table};

/// One self-contained extraction attempt. Declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Static HTML fetch, embedded JSON search.
    StaticFetch,
    /// Browser-rendered HTML, embedded JSON search.
    RenderedJson,
    /// Browser-rendered HTML, guide table heuristics.
    RenderedTable,
}

impl Strategy {
    pub const ORDER: [Strategy; 3] = [
        Strategy::StaticFetch,
        Strategy::RenderedJson,
        Strategy::RenderedTable,
    ];

    fn index(self) -> usize {
        match self {
            Strategy::StaticFetch => 0,
            Strategy::RenderedJson => 1,
            Strategy::RenderedTable => 2,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::StaticFetch => write!(f, "A (static fetch)"),
            Strategy::RenderedJson => write!(f, "B (rendered JSON)"),
            Strategy::RenderedTable => write!(f, "C (rendered table)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyState {
    NotTried,
    /// Ran (or was skipped) without producing a valid entry.
    Empty(String),
    /// Produced this many valid entries.
    Succeeded(usize),
}

/// Inputs shared by every strategy in one run.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub url: String,
    pub settle: Duration,
    pub fallback_offset: FixedOffset,
    /// Date that time-of-day-only rows are anchored on.
    pub anchor_date: NaiveDate,
}

/// What the chain produced, and how it got there.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub entries: Vec<ProgrammeEntry>,
    pub winner: Option<Strategy>,
    states: [StrategyState; 3],
    /// Last document the chain looked at, rendered HTML preferred.
    pub last_html: Option<String>,
}

impl ChainOutcome {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            winner: None,
            states: [
                StrategyState::NotTried,
                StrategyState::NotTried,
                StrategyState::NotTried,
            ],
            last_html: None,
        }
    }

    pub fn state(&self, strategy: Strategy) -> &StrategyState {
        &self.states[strategy.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mark_empty(&mut self, strategy: Strategy, reason: impl fmt::Display) {
        warn!("Strategy {}: empty ({})", strategy, reason);
        self.states[strategy.index()] = StrategyState::Empty(reason.to_string());
    }

    /// Record a strategy's result. Returns `true` once the chain is done.
    fn settle(
        &mut self,
        strategy: Strategy,
        result: Result<Vec<ProgrammeEntry>, ExtractError>,
    ) -> bool {
        match result {
            Ok(entries) if !entries.is_empty() => {
                info!("Strategy {}: succeeded with {} entries", strategy, entries.len());
                self.states[strategy.index()] = StrategyState::Succeeded(entries.len());
                self.winner = Some(strategy);
                self.entries = entries;
                true
            }
            Ok(_) => {
                self.mark_empty(strategy, "no valid entries");
                false
            }
            Err(e) => {
                self.mark_empty(strategy, e);
                false
            }
        }
    }
}

/**
    Ordered fallback chain: static fetch, then rendered JSON, then rendered
    table heuristics. Stops at the first strategy yielding a valid entry.

    Failures inside a strategy are converted into an empty result at the
    strategy boundary; nothing escapes `run`.
*/
pub struct StrategyChain<'a, F, R> {
    fetcher: &'a F,
    renderer: &'a R,
    registry: &'a ChannelRegistry,
    settings: &'a ChainSettings,
}

impl<'a, F: PageFetcher, R: PageRenderer> StrategyChain<'a, F, R> {
    pub fn new(
        fetcher: &'a F,
        renderer: &'a R,
        registry: &'a ChannelRegistry,
        settings: &'a ChainSettings,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            registry,
            settings,
        }
    }

    pub async fn run(&self) -> ChainOutcome {
        let mut outcome = ChainOutcome::new();

        info!("Strategy {}: attempting", Strategy::StaticFetch);
        match self.fetcher.fetch(&self.settings.url).await {
            Ok(html) => {
                let result = self.extract_json(&html);
                outcome.last_html = Some(html);
                if outcome.settle(Strategy::StaticFetch, result) {
                    return outcome;
                }
            }
            Err(e) => outcome.mark_empty(Strategy::StaticFetch, ExtractError::from(e)),
        }

        info!("Strategy {}: attempting", Strategy::RenderedJson);
        let rendered = match self
            .renderer
            .render(&self.settings.url, self.settings.settle)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                if e.is_environment() {
                    warn!("Render environment unavailable, skipping rendered strategies");
                }
                let reason = e.to_string();
                outcome.mark_empty(Strategy::RenderedJson, &reason);
                outcome.mark_empty(
                    Strategy::RenderedTable,
                    format!("no rendered document: {reason}"),
                );
                return outcome;
            }
        };

        let result = self.extract_json(&rendered);
        let done = outcome.settle(Strategy::RenderedJson, result);
        if done {
            outcome.last_html = Some(rendered);
            return outcome;
        }

        info!("Strategy {}: attempting", Strategy::RenderedTable);
        let result = self.extract_table(&rendered);
        outcome.last_html = Some(rendered);
        outcome.settle(Strategy::RenderedTable, result);

        outcome
    }

    /// Embedded JSON search shared by the static and rendered strategies.
    ///
    /// Candidates are tried in priority order; the first one that yields a
    /// valid entry wins.
    fn extract_json(&self, html: &str) -> Result<Vec<ProgrammeEntry>, ExtractError> {
        let candidates = patterns::find_candidates(html);
        if candidates.is_empty() {
            return Err(ParseError::NoEmbeddedJson.into());
        }

        let mut dropped = 0;

        for candidate in &candidates {
            let raws = normalize::extract(&candidate.doc);
            let (entries, report) =
                build_entries(&raws, self.registry, self.settings.fallback_offset);

            debug!(
                "Candidate from {}: {} item(s), {} accepted, {} dropped",
                candidate.kind,
                raws.len(),
                report.accepted,
                report.dropped
            );
            if !report.unknown_channels.is_empty() {
                info!(
                    "Ignoring channels not in the registry: {:?}",
                    report.unknown_channels
                );
            }
            if report.dropped > 0 {
                warn!(
                    "Dropped {} of {} programme item(s) from {}",
                    report.dropped,
                    raws.len(),
                    candidate.kind
                );
            }
            dropped += report.dropped;

            if !entries.is_empty() {
                return Ok(entries);
            }
        }

        Err(ParseError::NoProgrammes {
            candidates: candidates.len(),
            dropped,
        }
        .into())
    }

    /// Guide-table heuristics. Accuracy-degraded: no channel labels, no
    /// durations.
    fn extract_table(&self, html: &str) -> Result<Vec<ProgrammeEntry>, ExtractError> {
        let rows = table::find_rows(html);
        if rows.is_empty() {
            return Err(ParseError::NoTableRows.into());
        }

        debug!("Found {} guide table row(s)", rows.len());
        Ok(table::rows_to_entries(
            &rows,
            self.registry,
            self.settings.anchor_date,
            self.settings.fallback_offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::{FetchError, RenderError};
    use crate::guide::Channel;
    use crate::util::time::format_xmltv;

    const GUIDE_PAGE: &str = r#"<html><head><script>
        var programGuide = {"channels":[{"name":"HOY TV","programme":[
            {"start":"2025-01-01T08:00:00+08:00","end":"2025-01-01T08:30:00+08:00","title":"News & Weather"}
        ]}]};
    </script></head><body></body></html>"#;

    const TABLE_PAGE: &str = r#"<html><body><table>
        <tr><td>07:00</td><td>Morning Show</td></tr>
        <tr><td>07:00</td><td>Market Watch</td></tr>
    </table></body></html>"#;

    const BLANK_PAGE: &str = "<html><body><div id=\"app\"></div></body></html>";

    struct StubFetcher {
        page: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn serving(page: &'static str) -> Self {
            Self {
                page: Some(page),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                page: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.page.map(str::to_string).ok_or(FetchError::Status {
                url: url.to_string(),
                status: 403,
            })
        }
    }

    struct StubRenderer {
        page: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl StubRenderer {
        fn serving(page: &'static str) -> Self {
            Self {
                page: Some(page),
                calls: AtomicUsize::new(0),
            }
        }

        fn unavailable() -> Self {
            Self {
                page: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PageRenderer for StubRenderer {
        async fn render(&self, _url: &str, _settle: Duration) -> Result<String, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.page.map(str::to_string).ok_or(RenderError::Unavailable)
        }
    }

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new(vec![
            Channel::new("HOY TV", "hoytv"),
            Channel::new("HOY INFO", "hoyinfor"),
            Channel::new("HOY NEWS", "hoynews"),
        ])
        .unwrap()
    }

    fn settings() -> ChainSettings {
        ChainSettings {
            url: "https://hoy.tv/program_guide".to_string(),
            settle: Duration::ZERO,
            fallback_offset: FixedOffset::east_opt(8 * 3600).unwrap(),
            anchor_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_static_success_short_circuits() {
        let fetcher = StubFetcher::serving(GUIDE_PAGE);
        let renderer = StubRenderer::serving(TABLE_PAGE);
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert_eq!(outcome.winner, Some(Strategy::StaticFetch));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.state(Strategy::StaticFetch), &StrategyState::Succeeded(1));
        assert_eq!(outcome.state(Strategy::RenderedJson), &StrategyState::NotTried);
        assert_eq!(outcome.state(Strategy::RenderedTable), &StrategyState::NotTried);

        let entry = &outcome.entries[0];
        assert_eq!(entry.channel_id, "hoytv");
        assert_eq!(entry.title, "News & Weather");
        assert_eq!(format_xmltv(&entry.start), "20250101080000 +0800");
    }

    #[tokio::test]
    async fn test_rendered_json_after_static_failure() {
        let fetcher = StubFetcher::failing();
        let renderer = StubRenderer::serving(GUIDE_PAGE);
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert_eq!(outcome.winner, Some(Strategy::RenderedJson));
        assert!(matches!(
            outcome.state(Strategy::StaticFetch),
            StrategyState::Empty(reason) if reason.contains("403")
        ));
        assert_eq!(outcome.state(Strategy::RenderedTable), &StrategyState::NotTried);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_static_page_without_json_falls_through() {
        let fetcher = StubFetcher::serving(BLANK_PAGE);
        let renderer = StubRenderer::serving(GUIDE_PAGE);
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.winner, Some(Strategy::RenderedJson));
        assert_eq!(outcome.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_table_heuristics_last() {
        let fetcher = StubFetcher::serving(BLANK_PAGE);
        let renderer = StubRenderer::serving(TABLE_PAGE);
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert_eq!(outcome.winner, Some(Strategy::RenderedTable));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.state(Strategy::RenderedTable), &StrategyState::Succeeded(2));

        let channels: Vec<_> = outcome.entries.iter().map(|e| e.channel_id.as_str()).collect();
        assert_eq!(channels, ["hoytv", "hoyinfor"]);
        assert_eq!(outcome.last_html.as_deref(), Some(TABLE_PAGE));
    }

    #[tokio::test]
    async fn test_invalid_json_entries_do_not_count_as_success() {
        const INVALID_PAGE: &str = r#"<script>programGuide = {"channels":[{"name":"HOY TV","programme":[
            {"start":"2025-01-01T09:00:00","end":"2025-01-01T08:00:00","title":"Backwards"},
            {"start":"2025-01-01T09:00:00","end":"2025-01-01T10:00:00"}
        ]}]};</script>"#;

        let fetcher = StubFetcher::serving(INVALID_PAGE);
        let renderer = StubRenderer::serving(BLANK_PAGE);
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert!(outcome.is_empty());
        assert_eq!(outcome.winner, None);
        assert!(matches!(
            outcome.state(Strategy::StaticFetch),
            StrategyState::Empty(reason) if reason.contains("no usable programmes")
        ));
        // Assignment and blob both locate the same two items; all are dropped.
        assert!(matches!(
            outcome.state(Strategy::StaticFetch),
            StrategyState::Empty(reason) if reason.contains("2 candidate(s), 4 item(s) dropped")
        ));
        assert!(matches!(
            outcome.state(Strategy::RenderedTable),
            StrategyState::Empty(reason) if reason.contains("table rows")
        ));
        assert_eq!(outcome.last_html.as_deref(), Some(BLANK_PAGE));
    }

    #[tokio::test]
    async fn test_render_unavailable_skips_rendered_strategies() {
        let fetcher = StubFetcher::serving(BLANK_PAGE);
        let renderer = StubRenderer::unavailable();
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert!(outcome.is_empty());
        for strategy in Strategy::ORDER {
            assert!(matches!(outcome.state(strategy), StrategyState::Empty(_)));
        }
        assert_eq!(outcome.last_html.as_deref(), Some(BLANK_PAGE));
    }

    #[tokio::test]
    async fn test_everything_failing_is_not_an_error() {
        let fetcher = StubFetcher::failing();
        let renderer = StubRenderer::unavailable();
        let registry = registry();
        let settings = settings();

        let outcome = StrategyChain::new(&fetcher, &renderer, &registry, &settings)
            .run()
            .await;

        assert!(outcome.is_empty());
        assert_eq!(outcome.winner, None);
        assert!(outcome.last_html.is_none());
    }
}
