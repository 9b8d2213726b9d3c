//! # Catalog Summaries
//!
//! Turns a title and its copies into what the storefront shows: whether it
//! can be rented right now, in which formats, and at what daily price.
//!
//! ```text
//! Title "Alien" ─┬─ copy A  DVD      available   $2.00/day
//!                ├─ copy B  DVD      rented      $2.00/day
//!                └─ copy C  Blu-Ray  rented      $3.00/day
//!
//! TitleSummary:  is_available = true, available_copies = 1,
//!                available_formats = ["DVD"],
//!                format_prices = { "Blu-Ray": 300, "DVD": 200 }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Title;
use crate::validation::validate_search_query;
use crate::DEFAULT_COVER_IMAGE_URL;

/// One copy as listed on a title's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CopyInfo {
    pub copy_id: String,
    pub format_name: String,
    pub condition: String,
    pub is_available: bool,
    pub daily_price_cents: i64,
    pub barcode: Option<String>,
}

impl CopyInfo {
    #[inline]
    pub fn daily_price(&self) -> Money {
        Money::from_cents(self.daily_price_cents)
    }
}

/// Catalog list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TitleSummary {
    pub title: Title,
    pub is_available: bool,
    pub available_copies: i64,
    /// Distinct format names with at least one available copy, sorted.
    pub available_formats: Vec<String>,
    /// Format name → daily price in cents, over every copy of the title.
    pub format_prices: BTreeMap<String, i64>,
}

impl TitleSummary {
    /// Summarizes a title from all of its copies.
    pub fn from_copies(title: Title, copies: &[CopyInfo]) -> Self {
        let available: Vec<&CopyInfo> = copies.iter().filter(|c| c.is_available).collect();

        let available_formats: Vec<String> = available
            .iter()
            .map(|c| c.format_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let format_prices = copies
            .iter()
            .map(|c| (c.format_name.clone(), c.daily_price_cents))
            .collect();

        TitleSummary {
            title,
            is_available: !available.is_empty(),
            available_copies: available.len() as i64,
            available_formats,
            format_prices,
        }
    }

    /// Cheapest daily price across formats.
    pub fn lowest_daily_price(&self) -> Option<Money> {
        self.format_prices.values().min().copied().map(Money::from_cents)
    }
}

/// Title detail page: the summary plus every copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TitleDetails {
    pub summary: TitleSummary,
    pub copies: Vec<CopyInfo>,
}

impl TitleDetails {
    pub fn new(title: Title, copies: Vec<CopyInfo>) -> Self {
        TitleDetails {
            summary: TitleSummary::from_copies(title, &copies),
            copies,
        }
    }
}

// =============================================================================
// Home Page
// =============================================================================

/// A highly rated title on the home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PopularTitle {
    pub title_id: String,
    pub name: String,
    pub rating: Option<f64>,
    pub genre: Option<String>,
    pub release_year: Option<i64>,
    pub cover_image_url: Option<String>,
    /// Any copy, in any format, can be rented now.
    pub is_available: bool,
}

impl PopularTitle {
    pub fn cover_image(&self) -> &str {
        cover_or_default(self.cover_image_url.as_deref())
    }
}

/// A recently bought copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewArrival {
    pub title_id: String,
    pub name: String,
    pub format_name: String,
    #[ts(as = "Option<String>")]
    pub purchase_date: Option<DateTime<Utc>>,
    pub cover_image_url: Option<String>,
}

impl NewArrival {
    pub fn cover_image(&self) -> &str {
        cover_or_default(self.cover_image_url.as_deref())
    }
}

/// Store-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreStats {
    pub total_titles: i64,
    pub available_copies: i64,
    pub total_formats: i64,
}

/// Everything the home page shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HomePage {
    pub popular: Vec<PopularTitle>,
    pub new_arrivals: Vec<NewArrival>,
    pub stats: StoreStats,
}

fn cover_or_default(url: Option<&str>) -> &str {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => DEFAULT_COVER_IMAGE_URL,
    }
}

// =============================================================================
// Search
// =============================================================================

/// Search box suggestion, matched on the title name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TitleSuggestion {
    pub id: String,
    pub name: String,
    pub release_year: Option<i64>,
    pub genre: Option<String>,
}

/// Catalog browse filter. Empty fields mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogFilter {
    /// Case-insensitive text over name, description, director and genre.
    pub query: Option<String>,
    pub genre: Option<String>,
    /// Only titles with an available copy in this format.
    pub format: Option<String>,
}

impl CatalogFilter {
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Trims every field and drops the blank ones.
    pub fn normalized(&self) -> Result<CatalogFilter, ValidationError> {
        let query = match &self.query {
            Some(q) => Some(validate_search_query(q)?),
            None => None,
        };
        let keep = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(CatalogFilter {
            query: query.filter(|q| !q.is_empty()),
            genre: keep(&self.genre),
            format: keep(&self.format),
        })
    }

    /// LIKE pattern for the text query, lowercased.
    pub fn like_pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(|q| format!("%{}%", q.to_lowercase()))
    }

    /// Applies the format part, which needs copy availability.
    pub fn accepts(&self, summary: &TitleSummary) -> bool {
        match &self.format {
            Some(format) => summary
                .available_formats
                .iter()
                .any(|f| f.eq_ignore_ascii_case(format)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn title() -> Title {
        Title {
            id: "t1".to_string(),
            name: "Alien".to_string(),
            description: None,
            release_year: Some(1979),
            genre: Some("Horror".to_string()),
            director: Some("Ridley Scott".to_string()),
            duration_minutes: Some(117),
            rating: Some(8.5),
            cover_image_url: None,
            created_at: Utc::now(),
        }
    }

    fn copy(id: &str, format: &str, price: i64, available: bool) -> CopyInfo {
        CopyInfo {
            copy_id: id.to_string(),
            format_name: format.to_string(),
            condition: "Good".to_string(),
            is_available: available,
            daily_price_cents: price,
            barcode: None,
        }
    }

    #[test]
    fn test_summary_from_copies() {
        let copies = vec![
            copy("a", "DVD", 200, true),
            copy("b", "DVD", 200, false),
            copy("c", "Blu-Ray", 300, false),
            copy("d", "VHS", 100, true),
            copy("e", "DVD", 200, true),
        ];
        let summary = TitleSummary::from_copies(title(), &copies);

        assert!(summary.is_available);
        assert_eq!(summary.available_copies, 3);
        assert_eq!(summary.available_formats, vec!["DVD", "VHS"]);
        assert_eq!(summary.format_prices.len(), 3);
        assert_eq!(summary.format_prices["Blu-Ray"], 300);
        assert_eq!(summary.lowest_daily_price(), Some(Money::from_cents(100)));
    }

    #[test]
    fn test_summary_without_copies() {
        let details = TitleDetails::new(title(), Vec::new());
        assert!(!details.summary.is_available);
        assert_eq!(details.summary.available_copies, 0);
        assert!(details.summary.available_formats.is_empty());
        assert!(details.summary.lowest_daily_price().is_none());
    }

    #[test]
    fn test_filter_normalization() {
        let filter = CatalogFilter::default()
            .query("  Alien ")
            .genre("   ")
            .format("dvd")
            .normalized()
            .unwrap();

        assert_eq!(filter.query.as_deref(), Some("Alien"));
        assert_eq!(filter.genre, None);
        assert_eq!(filter.like_pattern().as_deref(), Some("%alien%"));

        assert!(CatalogFilter::default().query("q".repeat(101)).normalized().is_err());
    }

    #[test]
    fn test_cover_image_fallback() {
        let mut popular = PopularTitle {
            title_id: "t1".to_string(),
            name: "Alien".to_string(),
            rating: Some(8.5),
            genre: None,
            release_year: None,
            cover_image_url: None,
            is_available: true,
        };
        assert_eq!(popular.cover_image(), DEFAULT_COVER_IMAGE_URL);

        popular.cover_image_url = Some("  ".to_string());
        assert_eq!(popular.cover_image(), DEFAULT_COVER_IMAGE_URL);

        popular.cover_image_url = Some("/covers/alien.jpg".to_string());
        assert_eq!(popular.cover_image(), "/covers/alien.jpg");
    }

    #[test]
    fn test_format_filter_needs_available_copy() {
        let summary = TitleSummary::from_copies(
            title(),
            &[copy("a", "DVD", 200, true), copy("b", "Blu-Ray", 300, false)],
        );

        assert!(CatalogFilter::default().accepts(&summary));
        assert!(CatalogFilter::default().format("dvd").accepts(&summary));
        assert!(!CatalogFilter::default().format("Blu-Ray").accepts(&summary));
    }
}
