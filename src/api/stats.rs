//! Statistics API endpoints.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::db::{Filter, TANKS};
use crate::errors::AppError;
use crate::models::CatalogRecord;
use crate::stats::{
    aggregate, field_ranges, field_summary, filter_by_nation, filter_by_rating, ranges_by_rating,
    top_n, FieldSummary, RankField, RankedEntry, RatingGroup, RatingMode, RatingRange, StatField,
    StatRange, StatsSummary,
};
use crate::AppState;

/// Field ranked when the caller names none.
pub const DEFAULT_TOP_FIELD: &str = "blindaje_torreta";

/// Length of a ranking when the caller names none.
pub const DEFAULT_TOP_LIMIT: usize = 5;

/// Query parameters shared by the statistics endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub rating_min: Option<f64>,
    #[serde(default)]
    pub rating_max: Option<f64>,
    #[serde(default)]
    pub nation: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl StatsQuery {
    fn mode(&self) -> Result<RatingMode, AppError> {
        match self.mode.as_deref() {
            Some(mode) => RatingMode::parse(mode),
            None => Ok(RatingMode::default()),
        }
    }

    /// Narrow `records` by nation, then to records rated for `mode` within the bounds.
    fn select<'a>(
        &self,
        records: &'a [CatalogRecord],
        mode: RatingMode,
    ) -> Result<Vec<&'a CatalogRecord>, AppError> {
        let range = RatingRange::new(self.rating_min, self.rating_max)?;

        let selected: Vec<&CatalogRecord> = match self.nation.as_deref() {
            Some(nation) => filter_by_nation(records, nation),
            None => records.iter().collect(),
        };
        Ok(filter_by_rating(selected, range, mode))
    }
}

/// Ranking response; `message` replaces the list when no record carries the field.
#[derive(Debug, Serialize)]
pub struct TopResponse {
    pub entries: Vec<RankedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn load_records(state: &AppState) -> Result<Vec<CatalogRecord>, AppError> {
    let docs = state.store.scan(TANKS, &Filter::All).await?;
    Ok(docs
        .into_iter()
        .map(|doc| CatalogRecord::from_stored(doc.id, doc.body))
        .collect())
}

/// GET /api/stats - Summary statistics over the selection.
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<StatsSummary> {
    let mode = query.mode()?;
    let records = load_records(&state).await?;
    let selected = query.select(&records, mode)?;
    success(aggregate(&selected, mode))
}

/// GET /api/stats/top - Highest records by a field.
pub async fn get_top(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<TopResponse> {
    let mode = query.mode()?;
    let field = RankField::parse(query.field.as_deref().unwrap_or(DEFAULT_TOP_FIELD))?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_LIMIT);

    let records = load_records(&state).await?;
    let selected = query.select(&records, mode)?;
    let ranking = top_n(&selected, &field, limit)?;

    if ranking.candidates == 0 {
        return success(TopResponse {
            entries: Vec::new(),
            total: None,
            field: None,
            message: Some(format!("No tanks carry a numeric '{}'", field.name())),
        });
    }

    success(TopResponse {
        entries: ranking.entries,
        total: Some(ranking.candidates),
        field: Some(field.name().to_string()),
        message: None,
    })
}

/// GET /api/stats/fields/:field - Count, mean, extremes and median of one field.
pub async fn get_field_summary(
    State(state): State<AppState>,
    Path(field): Path<String>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<FieldSummary> {
    let mode = query.mode()?;
    let field = RankField::parse(&field)?;

    let records = load_records(&state).await?;
    let selected = query.select(&records, mode)?;
    success(field_summary(&selected, &field))
}

/// GET /api/stats/ranges - Extremes and deciles of every statistic.
pub async fn get_ranges(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<BTreeMap<StatField, StatRange>> {
    let mode = query.mode()?;
    let records = load_records(&state).await?;
    let selected = query.select(&records, mode)?;
    success(field_ranges(&selected, mode))
}

/// GET /api/stats/by-rating - Statistic ranges per battle rating.
pub async fn get_ranges_by_rating(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Vec<RatingGroup>> {
    let mode = query.mode()?;
    let records = load_records(&state).await?;
    let selected = query.select(&records, mode)?;
    success(ranges_by_rating(&selected, mode))
}
