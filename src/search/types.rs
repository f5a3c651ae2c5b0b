use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Optional filters for a property search. A missing field adds no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchOptions {
    /// Only listings owned by this user
    pub owner_id: Option<i32>,
    /// Minimum nightly price in major currency units
    pub minimum_price_per_night: Option<Decimal>,
    /// Maximum nightly price in major currency units
    pub maximum_price_per_night: Option<Decimal>,
    /// Case-sensitive substring of the city name
    pub city: Option<String>,
    /// Minimum average review rating
    pub minimum_rating: Option<Decimal>,
}

impl SearchOptions {
    /// City filter, treating an empty string as unset
    pub fn city_filter(&self) -> Option<&str> {
        self.city.as_deref().filter(|city| !city.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none()
            && self.minimum_price_per_night.is_none()
            && self.maximum_price_per_night.is_none()
            && self.city_filter().is_none()
            && self.minimum_rating.is_none()
    }
}

/// Maximum number of rows a query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ResultLimit(NonZeroU32);

impl ResultLimit {
    pub const DEFAULT: Self = match NonZeroU32::new(10) {
        Some(n) => Self(n),
        None => unreachable!(),
    };

    /// Returns `None` for zero
    pub fn new(limit: u32) -> Option<Self> {
        NonZeroU32::new(limit).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for ResultLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for ResultLimit {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("result limit must be positive")
    }
}

impl From<ResultLimit> for u32 {
    fn from(limit: ResultLimit) -> Self {
        limit.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_ten() {
        assert_eq!(ResultLimit::default().get(), 10);
        assert_eq!(ResultLimit::default(), ResultLimit::DEFAULT);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(ResultLimit::new(0).is_none());
        assert!(serde_json::from_str::<ResultLimit>("0").is_err());
        assert_eq!(serde_json::from_str::<ResultLimit>("3").unwrap().get(), 3);
    }

    #[test]
    fn options_deserialize_sparse_json() {
        let options: SearchOptions =
            serde_json::from_str(r#"{"city": "Vancouver", "minimum_rating": 4}"#).unwrap();
        assert_eq!(options.city_filter(), Some("Vancouver"));
        assert_eq!(options.minimum_rating, Some(Decimal::from(4)));
        assert!(options.owner_id.is_none());
        assert!(options.minimum_price_per_night.is_none());
    }

    #[test]
    fn empty_city_counts_as_unset() {
        let options = SearchOptions {
            city: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(options.city_filter(), None);
        assert!(options.is_empty());
    }

    #[test]
    fn zero_owner_is_a_constraint() {
        let options = SearchOptions {
            owner_id: Some(0),
            ..Default::default()
        };
        assert!(!options.is_empty());
    }
}
