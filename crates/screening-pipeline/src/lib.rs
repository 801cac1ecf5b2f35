//! Put-selling screen: candidate universe, per-symbol enrichment against
//! technicals and options sources, and the screening filter.

pub mod config;
pub mod filter;
pub mod pipeline;
pub mod report;
pub mod throttle;
pub mod universe;

#[cfg(test)]
mod testing;

pub use config::{next_monthly_expiration, third_friday, DelayRange, ScreenerConfig};
pub use filter::{screen, FilterReport, FilterThresholds};
pub use pipeline::{EnrichmentOutcome, EnrichmentPipeline, SkippedSymbol, SymbolEnrichment};
pub use report::{build_report, write_csv, write_report, ReportRow};
pub use throttle::Throttle;
pub use universe::{load_candidates, read_candidates, resolve_input_path, UniverseReport};

use screener_core::{Candidate, ScreeningResult};

/// Full screen of a candidate list: enrichment followed by the filter.
pub struct ScreenOutcome {
    pub results: Vec<ScreeningResult>,
    pub filter: FilterReport,
    pub enrichment: EnrichmentOutcome,
}

pub async fn screen_candidates(pipeline: &EnrichmentPipeline, candidates: &[Candidate]) -> ScreenOutcome {
    let mut enrichment = pipeline.run(candidates).await;
    let thresholds = FilterThresholds::from(pipeline.config());
    let (results, filter) = screen(std::mem::take(&mut enrichment.rows), &thresholds);

    ScreenOutcome {
        results,
        filter,
        enrichment,
    }
}
