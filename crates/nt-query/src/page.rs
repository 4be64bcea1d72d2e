//! # Pagination
//!
//! `page` and `limit` are parsed as positive integers. Anything else
//! (missing, non-numeric, negative, zero, fractional) silently falls back to
//! the defaults; no upper bound is enforced, a page past the end is simply empty.

use serde::{Deserialize, Serialize};

use crate::params::QueryParameters;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page: u64,
    pub limit: u64,
}

impl PageSpec {
    pub fn from_params(params: &QueryParameters) -> Self {
        Self {
            page: positive_or(params.get_str("page"), DEFAULT_PAGE),
            limit: positive_or(params.get_str("limit"), DEFAULT_LIMIT),
        }
    }

    /// Documents to skip before this page starts.
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_two_of_ten() {
        let p = PageSpec::from_params(&QueryParameters::parse("page=2&limit=10"));
        assert_eq!(p, PageSpec { page: 2, limit: 10 });
        assert_eq!(p.skip(), 10);
    }

    #[test]
    fn test_defaults() {
        let p = PageSpec::from_params(&QueryParameters::new());
        assert_eq!(p.skip(), 0);
        assert_eq!(p.limit, 100);
    }

    #[test]
    fn test_non_numeric_falls_back() {
        let p = PageSpec::from_params(&QueryParameters::parse("page=abc&limit=ten"));
        assert_eq!(p, PageSpec::default());
    }

    #[test]
    fn test_zero_negative_and_fractional_fall_back() {
        for raw in ["page=0&limit=0", "page=-3&limit=-1", "page=2.5&limit=1e2"] {
            let p = PageSpec::from_params(&QueryParameters::parse(raw));
            assert_eq!(p, PageSpec::default(), "input {raw}");
        }
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let p = PageSpec {
            page: u64::MAX,
            limit: u64::MAX,
        };
        assert_eq!(p.skip(), u64::MAX);
    }
}
