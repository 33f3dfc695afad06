// Filter Engine
// Narrows the base dataset by gender and city. An empty facet set means
// "no filter on that facet", never "exclude everything".

use crate::dataset::TransactionRecord;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub genders: BTreeSet<String>,
    pub cities: BTreeSet<String>,
}

impl FilterSelection {
    /// Selection that matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<G, C>(genders: G, cities: C) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            genders: genders.into_iter().map(Into::into).collect(),
            cities: cities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.genders.insert(gender.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.cities.insert(city.into());
        self
    }

    /// True when neither facet narrows anything.
    pub fn is_unfiltered(&self) -> bool {
        self.genders.is_empty() && self.cities.is_empty()
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        facet_allows(&self.genders, &record.gender) && facet_allows(&self.cities, &record.city)
    }
}

fn facet_allows(selected: &BTreeSet<String>, value: &str) -> bool {
    selected.is_empty() || selected.contains(value)
}

/// Filtered view over `base`: borrowed, in original order, possibly empty.
pub fn apply<'a>(
    base: &'a [TransactionRecord],
    selection: &FilterSelection,
) -> Vec<&'a TransactionRecord> {
    base.iter().filter(|r| selection.matches(r)).collect()
}
