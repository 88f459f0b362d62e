//! Aggregate statistics over catalog records.
//!
//! Filtering, per-nation counts, rounded means and ranked lists. Every numeric
//! read goes through [`CatalogRecord::numeric`], so filtering and aggregation
//! share one coercion policy.
//!
//! Two penetration figures exist and must not be mixed up: the engine-wide mean
//! averages the zero-range value of *every* ammunition entry, while rankings use
//! each record's *single highest* zero-range value.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::AppError;
use crate::models::CatalogRecord;

/// Upper bound accepted by [`top_n`].
pub const MAX_TOP_LIMIT: usize = 50;

/// Field name that selects the derived maximum-penetration ranking.
pub const MAX_PENETRATION_FIELD: &str = "penetracion_max";

/// Game mode whose rating and mode-specific fields are used.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RatingMode {
    #[default]
    Realistic,
    Arcade,
}

impl RatingMode {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s.to_ascii_lowercase().as_str() {
            "realistic" | "realista" => Ok(RatingMode::Realistic),
            "arcade" => Ok(RatingMode::Arcade),
            other => Err(AppError::InvalidInput(format!(
                "Unknown mode '{}'; expected realistic or arcade",
                other
            ))),
        }
    }

    pub fn rating_field(self) -> &'static str {
        match self {
            RatingMode::Realistic => "rating_realista",
            RatingMode::Arcade => "rating_arcade",
        }
    }
}

/// Inclusive battle-rating bounds; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RatingRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, AppError> {
        if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) {
            return Err(AppError::InvalidInput(
                "Rating bounds must be finite numbers".to_string(),
            ));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(AppError::InvalidInput(format!(
                    "Rating minimum {} is above maximum {}",
                    lo, hi
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, rating: f64) -> bool {
        self.min.map_or(true, |lo| rating >= lo) && self.max.map_or(true, |hi| rating <= hi)
    }
}

/// Records whose rating for `mode` is numeric and inside `range`.
pub fn filter_by_rating<'a>(
    records: impl IntoIterator<Item = &'a CatalogRecord>,
    range: RatingRange,
    mode: RatingMode,
) -> Vec<&'a CatalogRecord> {
    let field = mode.rating_field();
    records
        .into_iter()
        .filter(|record| record.numeric(field).is_some_and(|r| range.contains(r)))
        .collect()
}

/// Records of one nation, exact match.
pub fn filter_by_nation<'a>(
    records: impl IntoIterator<Item = &'a CatalogRecord>,
    nation: &str,
) -> Vec<&'a CatalogRecord> {
    records
        .into_iter()
        .filter(|record| record.nation() == Some(nation))
        .collect()
}

/// Fields averaged by [`aggregate`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    HullArmor,
    TurretArmor,
    ForwardSpeed,
    ReverseSpeed,
    Depression,
    Elevation,
    Reload,
    FireRate,
    PowerToWeight,
    Crew,
    Visibility,
    TurretTraverseHorizontal,
    TurretTraverseVertical,
}

impl StatField {
    pub const ALL: [StatField; 13] = [
        StatField::HullArmor,
        StatField::TurretArmor,
        StatField::ForwardSpeed,
        StatField::ReverseSpeed,
        StatField::Depression,
        StatField::Elevation,
        StatField::Reload,
        StatField::FireRate,
        StatField::PowerToWeight,
        StatField::Crew,
        StatField::Visibility,
        StatField::TurretTraverseHorizontal,
        StatField::TurretTraverseVertical,
    ];

    /// Stored document field for this statistic in `mode`.
    pub fn key(self, mode: RatingMode) -> &'static str {
        use RatingMode::{Arcade, Realistic};
        match (self, mode) {
            (StatField::HullArmor, _) => "blindaje_chasis",
            (StatField::TurretArmor, _) => "blindaje_torreta",
            (StatField::ForwardSpeed, Arcade) => "velocidad_adelante_arcade",
            (StatField::ForwardSpeed, Realistic) => "velocidad_adelante_realista",
            (StatField::ReverseSpeed, Arcade) => "velocidad_atras_arcade",
            (StatField::ReverseSpeed, Realistic) => "velocidad_atras_realista",
            (StatField::Depression, _) => "angulo_depresion",
            (StatField::Elevation, _) => "angulo_elevacion",
            (StatField::Reload, _) => "recarga",
            (StatField::FireRate, _) => "cadencia",
            (StatField::PowerToWeight, Arcade) => "relacion_potencia_peso",
            (StatField::PowerToWeight, Realistic) => "relacion_potencia_peso_realista",
            (StatField::Crew, _) => "tripulacion",
            (StatField::Visibility, _) => "visibilidad",
            (StatField::TurretTraverseHorizontal, Arcade) => "rotacion_torreta_horizontal_arcade",
            (StatField::TurretTraverseHorizontal, Realistic) => {
                "rotacion_torreta_horizontal_realista"
            }
            (StatField::TurretTraverseVertical, Arcade) => "rotacion_torreta_vertical_arcade",
            (StatField::TurretTraverseVertical, Realistic) => "rotacion_torreta_vertical_realista",
        }
    }

    /// Decimal places of the reported mean.
    ///
    /// Whole-unit quantities (mm, km/h, degrees, people, %) report integers;
    /// seconds, rates and ratios report two decimals.
    pub fn precision(self) -> u32 {
        match self {
            StatField::Reload
            | StatField::FireRate
            | StatField::PowerToWeight
            | StatField::TurretTraverseHorizontal
            | StatField::TurretTraverseVertical => 2,
            _ => 0,
        }
    }
}

/// Decimal places of the mean penetration.
pub const PENETRATION_PRECISION: u32 = 0;

/// Result of [`aggregate`]. An empty selection serializes as `{"total": 0}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSummary {
    pub total: usize,
    #[serde(flatten)]
    pub detail: Option<StatsDetail>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsDetail {
    pub mode: RatingMode,
    pub nations: BTreeMap<String, usize>,
    pub averages: BTreeMap<StatField, f64>,
    pub mean_penetration: f64,
}

/// Summary statistics over an already filtered selection.
pub fn aggregate(records: &[&CatalogRecord], mode: RatingMode) -> StatsSummary {
    if records.is_empty() {
        return StatsSummary {
            total: 0,
            detail: None,
        };
    }

    let mut nations = BTreeMap::new();
    for record in records {
        let nation = record.nation().unwrap_or("unknown").to_string();
        *nations.entry(nation).or_insert(0) += 1;
    }

    let averages = StatField::ALL
        .iter()
        .map(|&field| {
            let key = field.key(mode);
            let mean = mean(records.iter().filter_map(|r| r.numeric(key)));
            (field, round_to(mean.unwrap_or(0.0), field.precision()))
        })
        .collect();

    let penetrations = records
        .iter()
        .filter_map(|r| r.armament.as_ref())
        .flat_map(|armament| armament.ammunition())
        .filter_map(|ammo| ammo.zero_range_penetration());
    let mean_penetration = round_to(mean(penetrations).unwrap_or(0.0), PENETRATION_PRECISION);

    StatsSummary {
        total: records.len(),
        detail: Some(StatsDetail {
            mode,
            nations,
            averages,
            mean_penetration,
        }),
    }
}

/// What a ranking or field summary reads from each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankField {
    /// A stored numeric field.
    Field(String),
    /// Highest zero-range penetration across all ammunition of the record.
    MaxPenetration,
}

impl RankField {
    pub fn parse(name: &str) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Field name is required".to_string()));
        }
        Ok(match name {
            MAX_PENETRATION_FIELD | "max_penetration" => RankField::MaxPenetration,
            other => RankField::Field(other.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            RankField::Field(name) => name,
            RankField::MaxPenetration => MAX_PENETRATION_FIELD,
        }
    }

    pub fn value_of(&self, record: &CatalogRecord) -> Option<f64> {
        match self {
            RankField::Field(name) => record.numeric(name),
            RankField::MaxPenetration => record.max_penetration(),
        }
    }
}

/// One row of a ranking.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedEntry {
    pub id: String,
    pub nombre: Option<String>,
    pub nacion: Option<String>,
    pub value: f64,
}

/// Ranked selection plus how many records carried the field at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub entries: Vec<RankedEntry>,
    pub candidates: usize,
}

/// Highest `limit` records by `field`, descending.
///
/// Records without a numeric value are skipped; ties keep their input order.
pub fn top_n(records: &[&CatalogRecord], field: &RankField, limit: usize) -> Result<Ranking, AppError> {
    if !(1..=MAX_TOP_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "Limit must be between 1 and {}, got {}",
            MAX_TOP_LIMIT, limit
        )));
    }

    let mut entries: Vec<RankedEntry> = records
        .iter()
        .filter_map(|record| {
            field.value_of(record).map(|value| RankedEntry {
                id: record.id.clone(),
                nombre: record.name().map(str::to_string),
                nacion: record.nation().map(str::to_string),
                value,
            })
        })
        .collect();
    let candidates = entries.len();

    // `sort_by` is stable
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries.truncate(limit);

    Ok(Ranking {
        entries,
        candidates,
    })
}

/// Spread of one field across a selection.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldSummary {
    pub field: String,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Count, mean, extremes and median of a field; all zero when nothing carries it.
pub fn field_summary(records: &[&CatalogRecord], field: &RankField) -> FieldSummary {
    let mut values: Vec<f64> = records.iter().filter_map(|r| field.value_of(r)).collect();
    values.sort_by(f64::total_cmp);

    let median = match values.len() {
        0 => 0.0,
        n if n % 2 == 1 => values[n / 2],
        n => (values[n / 2 - 1] + values[n / 2]) / 2.0,
    };

    FieldSummary {
        field: field.name().to_string(),
        count: values.len(),
        mean: round_to(mean(values.iter().copied()).unwrap_or(0.0), 2),
        min: values.first().copied().unwrap_or(0.0),
        max: values.last().copied().unwrap_or(0.0),
        median: round_to(median, 2),
    }
}

/// Extremes and deciles of one statistic.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatRange {
    pub min: f64,
    pub max: f64,
    /// 10th through 90th percentile, linearly interpolated
    pub deciles: [f64; 9],
}

impl StatRange {
    fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let mut deciles = [0.0; 9];
        for (i, decile) in deciles.iter_mut().enumerate() {
            *decile = round_to(quantile(&values, (i + 1) as f64 / 10.0), 2);
        }

        Some(Self {
            min: values[0],
            max: values[values.len() - 1],
            deciles,
        })
    }
}

/// Ranges of every [`StatField`] carried by at least one record.
pub fn field_ranges(records: &[&CatalogRecord], mode: RatingMode) -> BTreeMap<StatField, StatRange> {
    StatField::ALL
        .iter()
        .filter_map(|&field| {
            let key = field.key(mode);
            let values = records.iter().filter_map(|r| r.numeric(key)).collect();
            StatRange::from_values(values).map(|range| (field, range))
        })
        .collect()
}

/// Records sharing one battle rating and the ranges of their statistics.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingGroup {
    pub rating: f64,
    pub count: usize,
    pub ranges: BTreeMap<StatField, StatRange>,
}

/// [`field_ranges`] per distinct rating for `mode`, lowest rating first.
///
/// Records without a numeric rating belong to no group.
pub fn ranges_by_rating(records: &[&CatalogRecord], mode: RatingMode) -> Vec<RatingGroup> {
    let field = mode.rating_field();
    let mut rated: Vec<(f64, &CatalogRecord)> = records
        .iter()
        .filter_map(|record| record.numeric(field).map(|rating| (rating, *record)))
        .collect();
    rated.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut groups = Vec::new();
    let mut start = 0;
    while start < rated.len() {
        let rating = rated[start].0;
        let end = rated[start..]
            .iter()
            .position(|(r, _)| *r != rating)
            .map_or(rated.len(), |len| start + len);

        let members: Vec<&CatalogRecord> = rated[start..end].iter().map(|(_, r)| *r).collect();
        groups.push(RatingGroup {
            rating,
            count: members.len(),
            ranges: field_ranges(&members, mode),
        });
        start = end;
    }
    groups
}

/// Quantile of sorted, non-empty `values` with linear interpolation.
fn quantile(values: &[f64], p: f64) -> f64 {
    let pos = (values.len() - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(id: &str, value: Value) -> CatalogRecord {
        CatalogRecord::from_stored(id.to_string(), value.as_object().cloned().unwrap())
    }

    fn refs(records: &[CatalogRecord]) -> Vec<&CatalogRecord> {
        records.iter().collect()
    }

    fn ids(records: &[&CatalogRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    fn armed(pens: &[f64]) -> Value {
        let shells: Vec<Value> = pens
            .iter()
            .map(|p| json!({ "nombre": "shell", "tipo": "AP", "penetracion_mm": [p, p - 5.0] }))
            .collect();
        json!({ "gun": { "municiones": shells } })
    }

    #[test]
    fn test_filter_by_rating_inclusive_bounds() {
        let records: Vec<CatalogRecord> = [2.7, 3.0, 4.4, 5.0, 5.3]
            .iter()
            .enumerate()
            .map(|(i, br)| record(&format!("t{}", i), json!({ "rating_realista": br })))
            .collect();

        let range = RatingRange::new(Some(3.0), Some(5.0)).unwrap();
        let selected = filter_by_rating(&records, range, RatingMode::Realistic);
        assert_eq!(ids(&selected), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_filter_by_rating_uses_mode_field_and_coercion() {
        let records = vec![
            record("a", json!({ "rating_arcade": "4.0", "rating_realista": 1.0 })),
            record("b", json!({ "rating_arcade": "high" })),
            record("c", json!({ "rating_realista": 4.0 })),
            record("d", json!({ "rating_arcade": null })),
        ];

        let arcade = filter_by_rating(&records, RatingRange::default(), RatingMode::Arcade);
        assert_eq!(ids(&arcade), vec!["a"]);

        let realistic = filter_by_rating(&records, RatingRange::default(), RatingMode::Realistic);
        assert_eq!(ids(&realistic), vec!["a", "c"]);

        let open_top = RatingRange::new(Some(2.0), None).unwrap();
        let high = filter_by_rating(&records, open_top, RatingMode::Realistic);
        assert_eq!(ids(&high), vec!["c"]);
    }

    #[test]
    fn test_rating_range_rejects_inverted_bounds() {
        assert!(matches!(
            RatingRange::new(Some(5.0), Some(3.0)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(RatingRange::new(Some(f64::NAN), None).is_err());
        assert!(RatingRange::new(Some(3.0), Some(3.0)).is_ok());
    }

    #[test]
    fn test_filter_by_nation_exact_match() {
        let records = vec![
            record("a", json!({ "nacion": "Germany" })),
            record("b", json!({ "nacion": "germany" })),
            record("c", json!({})),
        ];
        assert_eq!(ids(&filter_by_nation(&records, "Germany")), vec!["a"]);
    }

    #[test]
    fn test_aggregate_empty_selection_is_total_only() {
        let summary = aggregate(&[], RatingMode::Realistic);
        assert_eq!(summary.total, 0);
        assert!(summary.detail.is_none());
        assert_eq!(serde_json::to_value(&summary).unwrap(), json!({ "total": 0 }));
    }

    #[test]
    fn test_aggregate_means_counts_and_precision() {
        let records = vec![
            record(
                "a",
                json!({
                    "nacion": "USSR",
                    "blindaje_chasis": 45,
                    "blindaje_torreta": "52",
                    "recarga": 6.5,
                    "velocidad_adelante_realista": 55,
                    "velocidad_adelante_arcade": 62,
                    "relacion_potencia_peso_realista": 16.789,
                    "armamento": armed(&[120.0, 180.0, 95.0])
                }),
            ),
            record(
                "b",
                json!({
                    "nacion": "USSR",
                    "blindaje_chasis": 30,
                    "recarga": "7.333",
                    "velocidad_adelante_realista": 40,
                    "setup_1": armed(&[100.0]),
                    "setup_2": armed(&[]),
                }),
            ),
            record("c", json!({ "nacion": "Germany", "blindaje_chasis": "thick" })),
        ];

        let summary = aggregate(&refs(&records), RatingMode::Realistic);
        assert_eq!(summary.total, 3);
        let detail = summary.detail.unwrap();

        assert_eq!(detail.nations.get("USSR"), Some(&2));
        assert_eq!(detail.nations.get("Germany"), Some(&1));

        // (45 + 30) / 2 = 37.5 rounds to 38 at zero decimals
        assert_eq!(detail.averages[&StatField::HullArmor], 38.0);
        assert_eq!(detail.averages[&StatField::TurretArmor], 52.0);
        // (6.5 + 7.333) / 2 = 6.9165
        assert_eq!(detail.averages[&StatField::Reload], 6.92);
        assert_eq!(detail.averages[&StatField::ForwardSpeed], 48.0);
        assert_eq!(detail.averages[&StatField::PowerToWeight], 16.79);
        // Absent everywhere: zero, not an error
        assert_eq!(detail.averages[&StatField::Crew], 0.0);
        assert_eq!(detail.averages.len(), StatField::ALL.len());

        // Every shell counts: (120 + 180 + 95 + 100) / 4 = 123.75
        assert_eq!(detail.mean_penetration, 124.0);
    }

    #[test]
    fn test_aggregate_arcade_reads_arcade_fields() {
        let records = vec![record(
            "a",
            json!({ "velocidad_adelante_arcade": 70, "velocidad_adelante_realista": 50 }),
        )];
        let detail = aggregate(&refs(&records), RatingMode::Arcade).detail.unwrap();
        assert_eq!(detail.averages[&StatField::ForwardSpeed], 70.0);
        assert_eq!(detail.mode, RatingMode::Arcade);
    }

    #[test]
    fn test_top_n_stable_ties() {
        let records: Vec<CatalogRecord> = [10, 40, 40, 25, 5]
            .iter()
            .enumerate()
            .map(|(i, v)| record(&format!("t{}", i), json!({ "blindaje_torreta": v })))
            .collect();

        let field = RankField::parse("blindaje_torreta").unwrap();
        let ranking = top_n(&refs(&records), &field, 3).unwrap();
        let ranked: Vec<_> = ranking.entries.iter().map(|e| (e.id.as_str(), e.value)).collect();
        assert_eq!(ranked, vec![("t1", 40.0), ("t2", 40.0), ("t3", 25.0)]);
        assert_eq!(ranking.candidates, 5);
    }

    #[test]
    fn test_top_n_limit_bounds() {
        let field = RankField::parse("blindaje_torreta").unwrap();
        for limit in [0, MAX_TOP_LIMIT + 1] {
            assert!(matches!(
                top_n(&[], &field, limit),
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(top_n(&[], &field, MAX_TOP_LIMIT).unwrap().entries.is_empty());
    }

    #[test]
    fn test_top_n_skips_missing_and_returns_short_list() {
        let records = vec![
            record("a", json!({ "cadencia": "8.5" })),
            record("b", json!({ "cadencia": "fast" })),
            record("c", json!({})),
            record("d", json!({ "cadencia": 12 })),
        ];
        let field = RankField::parse("cadencia").unwrap();
        let ranking = top_n(&refs(&records), &field, 10).unwrap();
        let ranked: Vec<_> = ranking.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ranked, vec!["d", "a"]);
        assert_eq!(ranking.candidates, 2);
    }

    #[test]
    fn test_top_n_max_penetration_uses_highest_shell() {
        let records = vec![
            record("mixed", json!({ "nombre": "Mixed", "armamento": armed(&[120.0, 180.0, 95.0]) })),
            record("steady", json!({ "nombre": "Steady", "setup_1": armed(&[150.0]), "setup_2": armed(&[160.0]) })),
            record("unarmed", json!({ "nombre": "Truck" })),
            record("blank", json!({ "armamento": armed(&[]) })),
        ];

        let field = RankField::parse(MAX_PENETRATION_FIELD).unwrap();
        assert_eq!(field, RankField::MaxPenetration);
        let ranking = top_n(&refs(&records), &field, 5).unwrap();
        let ranked: Vec<_> = ranking.entries.iter().map(|e| (e.id.as_str(), e.value)).collect();
        assert_eq!(ranked, vec![("mixed", 180.0), ("steady", 160.0)]);
        assert_eq!(ranking.entries[0].nombre.as_deref(), Some("Mixed"));
    }

    #[test]
    fn test_field_summary() {
        let records = vec![
            record("a", json!({ "peso": 30.0 })),
            record("b", json!({ "peso": "45.5" })),
            record("c", json!({ "peso": 26.0 })),
            record("d", json!({ "peso": 57.0 })),
            record("e", json!({})),
        ];
        let field = RankField::parse("peso").unwrap();
        let summary = field_summary(&refs(&records), &field);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 26.0);
        assert_eq!(summary.max, 57.0);
        assert_eq!(summary.median, 37.75);
        assert_eq!(summary.mean, 39.63);

        let empty = field_summary(&[], &field);
        assert_eq!((empty.count, empty.mean, empty.median), (0, 0.0, 0.0));
    }

    #[test]
    fn test_field_ranges_deciles() {
        let records: Vec<CatalogRecord> = (1..=10)
            .map(|v| record(&format!("t{}", v), json!({ "blindaje_chasis": v })))
            .collect();

        let ranges = field_ranges(&refs(&records), RatingMode::Realistic);
        let hull = &ranges[&StatField::HullArmor];
        assert_eq!((hull.min, hull.max), (1.0, 10.0));
        assert_eq!(hull.deciles[0], 1.9);
        assert_eq!(hull.deciles[4], 5.5);
        assert_eq!(hull.deciles[8], 9.1);
        // Fields nobody carries are left out
        assert_eq!(ranges.len(), 1);
    }

    #[test]
    fn test_field_ranges_single_value() {
        let records = vec![record("a", json!({ "recarga": "6.5" }))];
        let ranges = field_ranges(&refs(&records), RatingMode::Arcade);
        assert_eq!(ranges[&StatField::Reload].deciles, [6.5; 9]);
    }

    #[test]
    fn test_ranges_by_rating_groups_ascending() {
        let records = vec![
            record("a", json!({ "rating_realista": 5.7, "blindaje_chasis": 90 })),
            record("b", json!({ "rating_realista": 3.7, "blindaje_chasis": 45 })),
            record("c", json!({ "rating_realista": "4.0", "blindaje_chasis": 50 })),
            record("d", json!({ "rating_arcade": 3.7, "blindaje_chasis": 20 })),
            record("e", json!({ "rating_realista": 3.7, "blindaje_chasis": 30 })),
        ];

        let groups = ranges_by_rating(&refs(&records), RatingMode::Realistic);
        let summary: Vec<_> = groups.iter().map(|g| (g.rating, g.count)).collect();
        assert_eq!(summary, vec![(3.7, 2), (4.0, 1), (5.7, 1)]);

        let hull = &groups[0].ranges[&StatField::HullArmor];
        assert_eq!((hull.min, hull.max), (30.0, 45.0));
        assert_eq!(hull.deciles[4], 37.5);

        let arcade = ranges_by_rating(&refs(&records), RatingMode::Arcade);
        assert_eq!(arcade.len(), 1);
        assert_eq!(arcade[0].count, 1);
    }
}
