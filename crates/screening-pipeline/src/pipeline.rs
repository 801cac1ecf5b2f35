use futures_util::stream::{self, StreamExt};
use screener_core::{
    compute_floors, find_match, Candidate, CandidateRow, EnrichedRow, OptionsChainSource, QuoteSource,
    ScreenerError, TechnicalSnapshot, TickerSymbol,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ScreenerConfig;
use crate::throttle::Throttle;

/// Technicals and matched rows for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEnrichment {
    pub technicals: TechnicalSnapshot,
    pub rows: Vec<EnrichedRow>,
}

/// A symbol that produced no rows because an adapter call failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: TickerSymbol,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    /// Left join onto the candidate list, in candidate order.
    pub rows: Vec<CandidateRow>,
    pub skipped: Vec<SkippedSymbol>,
    pub enriched_symbols: usize,
}

impl EnrichmentOutcome {
    pub fn enriched_rows(&self) -> impl Iterator<Item = &CandidateRow> {
        self.rows.iter().filter(|r| r.quote.is_some())
    }
}

pub struct EnrichmentPipeline {
    quotes: Arc<dyn QuoteSource>,
    chains: Arc<dyn OptionsChainSource>,
    config: Arc<ScreenerConfig>,
    throttle: Throttle,
}

impl EnrichmentPipeline {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        chains: Arc<dyn OptionsChainSource>,
        config: Arc<ScreenerConfig>,
    ) -> Self {
        let throttle = Throttle::new(config.delay);
        Self {
            quotes,
            chains,
            config,
            throttle,
        }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Technicals, floors and one chain lookup for a single symbol.
    ///
    /// Symbols that fail the trend condition or have no computable floor
    /// return their technicals with no rows and never hit the options source.
    pub async fn enrich_symbol(&self, symbol: &TickerSymbol) -> Result<SymbolEnrichment, ScreenerError> {
        let technicals = self.throttle.run(self.quotes.fetch_technicals(symbol)).await?;

        if !self.config.trend_windows.is_empty() && !technicals.is_above_averages(&self.config.trend_windows) {
            debug!("{}: below trend averages, skipping options", symbol);
            return Ok(SymbolEnrichment { technicals, rows: Vec::new() });
        }

        let floors = compute_floors(&technicals, &self.config.floor_variants);
        if floors.is_empty() {
            debug!("{}: no computable floor", symbol);
            return Ok(SymbolEnrichment { technicals, rows: Vec::new() });
        }

        let targets: Vec<f64> = floors.iter().map(|f| f.floor_price).collect();
        let matches = self
            .throttle
            .run(self.chains.nearest_puts(symbol, self.config.expiration_date, &targets))
            .await?;

        let rows = floors
            .into_iter()
            .filter_map(|floor| {
                let matched = find_match(&matches, floor.floor_price)?;
                Some(EnrichedRow {
                    technicals: technicals.clone(),
                    floor,
                    quote: matched.quote.clone(),
                })
            })
            .collect();

        Ok(SymbolEnrichment { technicals, rows })
    }

    /// Enrich every candidate, isolating per-symbol failures, and left join
    /// the results back onto the candidate list.
    pub async fn run(&self, candidates: &[Candidate]) -> EnrichmentOutcome {
        let total = candidates.len();
        info!(
            "Enriching {} symbols via {} / {} (expiration {})",
            total,
            self.quotes.name(),
            self.chains.name(),
            self.config.expiration_date
        );

        let results: Vec<Result<SymbolEnrichment, ScreenerError>> = stream::iter(candidates.iter().enumerate())
            .map(|(i, candidate)| async move {
                info!("[{}/{}] {}", i + 1, total, candidate.symbol);
                self.enrich_symbol(&candidate.symbol).await
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut outcome = EnrichmentOutcome::default();
        for (candidate, result) in candidates.iter().zip(results) {
            match result {
                Ok(enrichment) if !enrichment.rows.is_empty() => {
                    outcome.enriched_symbols += 1;
                    outcome.rows.extend(enrichment.rows.into_iter().map(|row| CandidateRow {
                        candidate: candidate.clone(),
                        technicals: Some(row.technicals),
                        floor: Some(row.floor),
                        quote: Some(row.quote),
                    }));
                }
                Ok(enrichment) => {
                    outcome
                        .rows
                        .push(CandidateRow::unenriched(candidate.clone(), Some(enrichment.technicals)));
                }
                Err(e) => {
                    if e.is_recoverable() {
                        warn!("Skipping {}: {}", candidate.symbol, e);
                    } else {
                        error!("Skipping {} after unexpected failure: {}", candidate.symbol, e);
                    }
                    outcome.skipped.push(SkippedSymbol {
                        symbol: candidate.symbol.clone(),
                        reason: e.to_string(),
                    });
                    outcome.rows.push(CandidateRow::unenriched(candidate.clone(), None));
                }
            }
        }

        info!(
            "Enrichment complete: {}/{} symbols enriched, {} rows, {} skipped",
            outcome.enriched_symbols,
            total,
            outcome.enriched_rows().count(),
            outcome.skipped.len()
        );

        outcome
    }
}
