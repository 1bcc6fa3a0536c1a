use crate::schema::{FilterCriteria, SalesRecord};

impl FilterCriteria {
    /// True when the record satisfies every set dimension. Dimensions
    /// combine with AND; a set restriction is OR over its members. A record
    /// without a value for an optional attribute fails any restriction on
    /// that dimension.
    pub fn matches(&self, record: &SalesRecord) -> bool {
        if let Some(from) = self.date_from {
            if record.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if record.date > to {
                return false;
            }
        }
        if let Some(products) = &self.products {
            if !products.contains(&record.product) {
                return false;
            }
        }
        if let Some(clients) = &self.clients {
            if !clients.contains(&record.client) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            match &record.category {
                Some(category) if categories.contains(category) => {}
                _ => return false,
            }
        }
        if let Some(cities) = &self.cities {
            match &record.city {
                Some(city) if cities.contains(city) => {}
                _ => return false,
            }
        }
        if let Some(zones) = &self.zones {
            match &record.zone {
                Some(zone) if zones.contains(zone) => {}
                _ => return false,
            }
        }
        true
    }

    /// True when no dimension is restricted.
    pub fn is_unrestricted(&self) -> bool {
        *self == FilterCriteria::default()
    }
}

/// Selects the records matching `criteria`, preserving input order.
/// A single linear pass; applying the same criteria again yields the
/// identical subset.
pub fn apply<'a>(records: &'a [SalesRecord], criteria: &FilterCriteria) -> Vec<&'a SalesRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}
