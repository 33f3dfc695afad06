// Reactive Controller
// One entry point per filter change: filter once, then run all five
// aggregations over that same view. Holds no mutable state, so a shared
// Dashboard can serve concurrent callers.

use crate::aggregation::{
    self, CategoryShares, GroupedCounts, ScalarIndicator, TimeSeries, TrendSettings,
    AVERAGE_RATING_LABEL,
};
use crate::dataset::DatasetStore;
use crate::errors::DashboardError;
use crate::filter::{self, FilterSelection};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

/// One of the five dashboard payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewModel {
    Indicator(ScalarIndicator),
    TimeSeries(TimeSeries),
    GroupedCounts(GroupedCounts),
    CategoryShares(CategoryShares),
}

/// The five views computed from one filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    pub total_amount: ScalarIndicator,
    pub average_rating: ScalarIndicator,
    pub weekly_amount: TimeSeries,
    pub orders_by_city_gender: GroupedCounts,
    pub product_line_shares: CategoryShares,
}

impl DashboardViews {
    /// Positional form: total, rating, weekly trend, city/gender counts,
    /// product-line shares.
    pub fn into_array(self) -> [ViewModel; 5] {
        [
            ViewModel::Indicator(self.total_amount),
            ViewModel::Indicator(self.average_rating),
            ViewModel::TimeSeries(self.weekly_amount),
            ViewModel::GroupedCounts(self.orders_by_city_gender),
            ViewModel::CategoryShares(self.product_line_shares),
        ]
    }
}

/// Selectable values per facet, in order of first appearance, plus the
/// span of sale dates they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOptions {
    pub genders: Vec<String>,
    pub cities: Vec<String>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    store: Arc<DatasetStore>,
    trend: TrendSettings,
}

impl Dashboard {
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self::with_trend_settings(store, TrendSettings::default())
    }

    pub fn with_trend_settings(store: Arc<DatasetStore>, trend: TrendSettings) -> Self {
        Self { store, trend }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn facet_options(&self) -> FacetOptions {
        let (first_date, last_date) = self.store.date_range().unzip();
        FacetOptions {
            genders: self.store.distinct_genders(),
            cities: self.store.distinct_cities(),
            first_date,
            last_date,
        }
    }

    /// Recompute every view for `selection` from the base dataset.
    pub fn update(&self, selection: &FilterSelection) -> DashboardViews {
        let view = filter::apply(self.store.records(), selection);

        tracing::debug!(
            genders = ?selection.genders,
            cities = ?selection.cities,
            matched = view.len(),
            "Recomputing dashboard views"
        );

        let average_rating = match aggregation::mean_rating(&view) {
            Ok(indicator) => indicator,
            Err(DashboardError::NoData { aggregation }) => {
                tracing::debug!("{} has no data, showing placeholder", aggregation);
                ScalarIndicator::no_data(AVERAGE_RATING_LABEL)
            }
            Err(e) => {
                // mean_rating only reports NoData today
                tracing::warn!("Rating indicator failed: {}", e);
                ScalarIndicator::no_data(AVERAGE_RATING_LABEL)
            }
        };

        DashboardViews {
            total_amount: aggregation::total_amount(&view),
            average_rating,
            weekly_amount: aggregation::weekly_amount_by_city(&view, &self.trend),
            orders_by_city_gender: aggregation::orders_by_city_gender(&view),
            product_line_shares: aggregation::product_line_shares(&view),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::CityGenderCount;
    use crate::dataset::fixtures::{record, three_sales};
    use crate::dataset::TransactionRecord;

    fn dashboard(records: Vec<TransactionRecord>) -> Dashboard {
        Dashboard::new(Arc::new(DatasetStore::new(records)))
    }

    /// A slightly larger set spread over three cities and several weeks.
    fn mixed_sales() -> Vec<TransactionRecord> {
        vec![
            record("a1", "Yangon", "Female", "Health and beauty", 548.97, 9.1, "2019-01-05"),
            record("a2", "Naypyitaw", "Female", "Electronic accessories", 80.22, 9.6, "2019-03-08"),
            record("a3", "Yangon", "Male", "Home and lifestyle", 340.53, 7.4, "2019-03-03"),
            record("a4", "Yangon", "Male", "Health and beauty", 489.05, 8.4, "2019-01-27"),
            record("a5", "Yangon", "Male", "Sports and travel", 634.38, 5.3, "2019-02-08"),
            record("a6", "Naypyitaw", "Male", "Electronic accessories", 627.62, 4.1, "2019-03-25"),
            record("a7", "Yangon", "Female", "Electronic accessories", 433.69, 5.8, "2019-02-25"),
            record("a8", "Mandalay", "Female", "Home and lifestyle", 772.38, 8.0, "2019-02-24"),
            record("a9", "Yangon", "Female", "Health and beauty", 76.15, 7.2, "2019-01-10"),
            record("a10", "Mandalay", "Female", "Food and beverages", 172.75, 5.9, "2019-02-20"),
        ]
    }

    fn sample_selections() -> Vec<FilterSelection> {
        vec![
            FilterSelection::all(),
            FilterSelection::all().with_gender("Male"),
            FilterSelection::all().with_gender("Female"),
            FilterSelection::all().with_city("Yangon"),
            FilterSelection::new(["Female"], ["Mandalay", "Naypyitaw"]),
            FilterSelection::all().with_city("Atlantis"),
        ]
    }

    #[test]
    fn test_concrete_scenario_unfiltered() {
        let views = dashboard(three_sales()).update(&FilterSelection::all());

        assert_eq!(views.total_amount.value, Some(35.0));
        assert_eq!(views.average_rating.value, Some(7.0));
        assert_eq!(
            views.orders_by_city_gender.rows,
            vec![
                CityGenderCount { city: "Mandalay".into(), gender: "Male".into(), count: 1 },
                CityGenderCount { city: "Yangon".into(), gender: "Female".into(), count: 1 },
                CityGenderCount { city: "Yangon".into(), gender: "Male".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_concrete_scenario_male_only() {
        let views = dashboard(three_sales()).update(&FilterSelection::all().with_gender("Male"));

        assert_eq!(views.total_amount.value, Some(15.0));
        assert_eq!(views.average_rating.value, Some(7.0));
        assert_eq!(
            views.orders_by_city_gender.rows,
            vec![
                CityGenderCount { city: "Mandalay".into(), gender: "Male".into(), count: 1 },
                CityGenderCount { city: "Yangon".into(), gender: "Male".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_views_share_one_filtered_subset() {
        let dash = dashboard(mixed_sales());

        for selection in sample_selections() {
            let views = dash.update(&selection);
            assert_eq!(
                views.orders_by_city_gender.total(),
                views.product_line_shares.total(),
                "Counts disagree for {:?}",
                selection
            );
        }
    }

    #[test]
    fn test_gender_filter_never_increases_total() {
        let dash = dashboard(mixed_sales());
        let unfiltered = dash.update(&FilterSelection::all()).total_amount.value.unwrap();

        for gender in ["Male", "Female", "Other"] {
            let filtered = dash
                .update(&FilterSelection::all().with_gender(gender))
                .total_amount
                .value
                .unwrap();
            assert!(filtered <= unfiltered, "{} total {} > {}", gender, filtered, unfiltered);
        }
    }

    #[test]
    fn test_empty_selection_equals_full_selection() {
        let dash = dashboard(mixed_sales());
        let options = dash.facet_options();
        let everything = FilterSelection::new(options.genders, options.cities);

        assert_eq!(dash.update(&FilterSelection::all()), dash.update(&everything));
    }

    #[test]
    fn test_update_is_idempotent() {
        let dash = dashboard(mixed_sales());

        for selection in sample_selections() {
            assert_eq!(dash.update(&selection), dash.update(&selection));
        }
    }

    #[test]
    fn test_empty_result_is_safe() {
        let dash = dashboard(mixed_sales());
        let views = dash.update(&FilterSelection::new(["Male"], ["Mandalay"]));

        assert_eq!(views.total_amount.value, Some(0.0));
        assert!(!views.average_rating.has_data(), "Rating should be the no-data placeholder");
        assert_eq!(views.average_rating.label, AVERAGE_RATING_LABEL);
        assert!(views.weekly_amount.is_empty());
        assert!(views.orders_by_city_gender.rows.is_empty());
        assert!(views.product_line_shares.rows.is_empty());
    }

    #[test]
    fn test_unknown_city_behaves_like_empty_result() {
        let dash = dashboard(mixed_sales());

        let unknown = dash.update(&FilterSelection::all().with_city("Atlantis"));
        let no_match = dash.update(&FilterSelection::new(["Male"], ["Mandalay"]));

        assert_eq!(unknown, no_match);
    }

    #[test]
    fn test_empty_dataset() {
        let dash = dashboard(Vec::new());
        let views = dash.update(&FilterSelection::all());
        assert_eq!(views.total_amount.value, Some(0.0));
        assert!(!views.average_rating.has_data());

        let options = dash.facet_options();
        assert!(options.genders.is_empty());
        assert_eq!((options.first_date, options.last_date), (None, None));
    }

    #[test]
    fn test_facet_options_carry_date_span() {
        let options = dashboard(mixed_sales()).facet_options();

        assert_eq!(options.genders, vec!["Female", "Male"]);
        assert_eq!(options.cities, vec!["Yangon", "Naypyitaw", "Mandalay"]);
        assert_eq!(options.first_date, NaiveDate::from_ymd_opt(2019, 1, 5));
        assert_eq!(options.last_date, NaiveDate::from_ymd_opt(2019, 3, 25));
    }

    #[test]
    fn test_positional_output() {
        let views = dashboard(three_sales()).update(&FilterSelection::all());
        let [total, rating, trend, counts, shares] = views.into_array();

        assert!(matches!(
            total,
            ViewModel::Indicator(ref i) if i.label == aggregation::TOTAL_AMOUNT_LABEL
        ));
        assert!(matches!(rating, ViewModel::Indicator(ref i) if i.label == AVERAGE_RATING_LABEL));
        assert!(matches!(trend, ViewModel::TimeSeries(_)));
        assert!(matches!(counts, ViewModel::GroupedCounts(_)));
        assert!(matches!(shares, ViewModel::CategoryShares(_)));
    }

    #[test]
    fn test_weekly_trend_uses_configured_settings() {
        let store = Arc::new(DatasetStore::new(three_sales()));
        let keep = TrendSettings {
            drop_final_point: false,
            ..TrendSettings::default()
        };

        let dropping = Dashboard::new(store.clone()).update(&FilterSelection::all());
        let keeping = Dashboard::with_trend_settings(store, keep).update(&FilterSelection::all());

        // (week of 01-07, Yangon) and (week of 01-14, Mandalay)
        assert_eq!(keeping.weekly_amount.points.len(), 2);
        assert_eq!(dropping.weekly_amount.points.len(), 1);
        assert_eq!(
            &keeping.weekly_amount.points[..1],
            &dropping.weekly_amount.points[..]
        );
    }

    #[test]
    fn test_dashboard_is_shareable_across_threads() {
        let dash = Arc::new(dashboard(mixed_sales()));
        let expected = dash.update(&FilterSelection::all().with_city("Yangon"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let dash = Arc::clone(&dash);
                std::thread::spawn(move || dash.update(&FilterSelection::all().with_city("Yangon")))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_serializes_positional_payloads() {
        let views = dashboard(Vec::new()).update(&FilterSelection::all());
        let json = serde_json::to_value(views.into_array()).unwrap();

        assert_eq!(json.as_array().map(Vec::len), Some(5));
        assert_eq!(json[0]["kind"], "indicator");
        assert_eq!(json[1]["value"], serde_json::Value::Null);
        assert_eq!(json[2]["kind"], "time_series");
    }
}
