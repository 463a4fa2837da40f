/// Offset pagination for listings
///
/// Pages are 1-indexed. `limit` must lie in `1..=100`; `page` must not point
/// past the last page, except that any page of an empty collection is valid
/// and yields no items.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_PAGE: u64 = 1;

/// Validated `limit`/`page` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
        }
    }
}

impl PageRequest {
    /// Parses raw query values; absent values take the defaults
    pub fn parse(limit: Option<&str>, page: Option<&str>) -> Result<Self, ServiceError> {
        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(bad_request("Limit must be a valid number")),
            },
        };
        if limit > MAX_LIMIT {
            return Err(bad_request("Limit is too large"));
        }

        let page = match page {
            None => DEFAULT_PAGE,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(page) if page > 0 => page,
                _ => return Err(bad_request("Page must be a valid number")),
            },
        };

        Ok(Self { limit, page })
    }

    /// Re-checks the bounds and rejects a page beyond the last one
    ///
    /// The fields are public, so a request built by hand has not been
    /// through [`PageRequest::parse`].
    pub fn check_against(&self, total: u64) -> Result<(), ServiceError> {
        if self.limit == 0 {
            return Err(bad_request("Limit must be a valid number"));
        }
        if self.limit > MAX_LIMIT {
            return Err(bad_request("Limit is too large"));
        }
        if self.page == 0 {
            return Err(bad_request("Page must be a valid number"));
        }
        if total == 0 {
            return Ok(());
        }

        let last_page = total.div_ceil(self.limit);
        if self.page > last_page {
            return Err(bad_request("Invalid page"));
        }

        Ok(())
    }

    /// Number of records to skip
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn bad_request(message: &str) -> ServiceError {
    ServiceError::BadRequest(message.to_string())
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(PageRequest::parse(None, None).unwrap(), PageRequest::default());
    }

    #[test]
    fn test_limit_bounds() {
        assert_eq!(PageRequest::parse(Some("100"), None).unwrap().limit, 100);
        assert_eq!(
            PageRequest::parse(Some("101"), None),
            Err(bad_request("Limit is too large"))
        );
        for raw in ["0", "-1", "ten", ""] {
            assert_eq!(
                PageRequest::parse(Some(raw), None),
                Err(bad_request("Limit must be a valid number")),
                "limit {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_page_must_be_positive() {
        assert_eq!(
            PageRequest::parse(None, Some("0")),
            Err(bad_request("Page must be a valid number"))
        );
        assert_eq!(
            PageRequest::parse(None, Some("x")),
            Err(bad_request("Page must be a valid number"))
        );
    }

    #[test]
    fn test_check_against_total() {
        let request = PageRequest { limit: 1, page: 999 };
        assert_eq!(request.check_against(1), Err(bad_request("Invalid page")));
        assert!(request.check_against(0).is_ok());

        let request = PageRequest { limit: 5, page: 2 };
        assert!(request.check_against(6).is_ok());
        assert!(request.check_against(5).is_err());
    }

    #[test]
    fn test_check_against_rejects_unparsed_bounds() {
        assert_eq!(
            PageRequest { limit: 0, page: 1 }.check_against(1),
            Err(bad_request("Limit must be a valid number"))
        );
        assert_eq!(
            PageRequest { limit: 101, page: 1 }.check_against(0),
            Err(bad_request("Limit is too large"))
        );
        assert_eq!(
            PageRequest { limit: 5, page: 0 }.check_against(0),
            Err(bad_request("Page must be a valid number"))
        );
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest { limit: 10, page: 0 }.offset(), 0);
        assert_eq!(PageRequest { limit: 10, page: 1 }.offset(), 0);
        assert_eq!(PageRequest { limit: 10, page: 3 }.offset(), 20);
    }
}
