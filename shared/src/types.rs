//! Common types used across the platform

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Pagination {
    /// Clamp the page size to a sane maximum
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, 200))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        let total_pages = if total_items == 0 {
            0
        } else {
            ((total_items + u64::from(per_page) - 1) / u64::from(per_page)) as u32
        };
        Self {
            page: pagination.page.max(1),
            per_page,
            total_items,
            total_pages,
        }
    }
}

/// Date range for queries (inclusive on both ends)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// A single-day range
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Validate that the range is not inverted
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.start > self.end {
            return Err("Start date must not be after end date");
        }
        Ok(())
    }

    /// Lower bound as a UTC timestamp (start of the first day)
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_default()
    }

    /// Exclusive upper bound as a UTC timestamp (start of the day after `end`)
    pub fn ends_before(&self) -> DateTime<Utc> {
        self.end
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);

        let first = Pagination { page: 0, per_page: 10 };
        assert_eq!(first.offset(), 0);
    }

    #[test]
    fn test_pagination_meta_pages() {
        let p = Pagination { page: 1, per_page: 20 };
        assert_eq!(PaginationMeta::new(&p, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(&p, 20).total_pages, 1);
        assert_eq!(PaginationMeta::new(&p, 21).total_pages, 2);
    }

    #[test]
    fn test_date_range_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let range = DateRange::day(d);
        assert!(range.validate().is_ok());
        assert_eq!(range.ends_before() - range.starts_at(), chrono::Duration::days(1));

        let inverted = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            end: d,
        };
        assert!(inverted.validate().is_err());
    }
}
