//! Offset pagination primitives shared by search endpoints.
//!
//! The crate owns the arithmetic that turns a client-supplied `page` and
//! `limit` into the `offset` handed to a store, and the `{list, total}`
//! envelope returned by search operations. Both types are transport
//! agnostic: inbound adapters decode raw query values and hand them to
//! [`PageRequest::clamped`], outbound adapters consume [`PageRequest::offset`].
//!
//! # Examples
//! ```
//! use pagination::{PageLimits, PageRequest};
//!
//! let limits = PageLimits::new(20, 100).expect("valid limits");
//! let page = PageRequest::clamped(Some(3), Some(10), limits);
//! assert_eq!(page.offset(), 20);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when configuring page limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// The default limit must be at least one.
    #[error("default page limit must be at least 1")]
    ZeroDefaultLimit,
    /// The maximum limit must not be smaller than the default.
    #[error("maximum page limit {max} is smaller than the default {default}")]
    MaxBelowDefault {
        /// Configured default limit.
        default: u32,
        /// Configured maximum limit.
        max: u32,
    },
}

/// Bounds applied when a request omits or exceeds the page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl PageLimits {
    /// Validate and construct page limits.
    ///
    /// # Errors
    /// Returns [`PaginationError`] when the default is zero or exceeds the
    /// maximum.
    pub const fn new(default_limit: u32, max_limit: u32) -> Result<Self, PaginationError> {
        if default_limit == 0 {
            return Err(PaginationError::ZeroDefaultLimit);
        }
        if max_limit < default_limit {
            return Err(PaginationError::MaxBelowDefault {
                default: default_limit,
                max: max_limit,
            });
        }
        Ok(Self {
            default_limit,
            max_limit,
        })
    }

    /// Page size used when the client does not provide one.
    #[must_use]
    pub const fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Largest page size a client may request.
    #[must_use]
    pub const fn max_limit(&self) -> u32 {
        self.max_limit
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

/// A one-based page request with a bounded page size.
///
/// ## Invariants
/// - `page >= 1`
/// - `1 <= limit <= PageLimits::max_limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Clamp raw client values into a valid page request.
    ///
    /// Missing values fall back to page one and the default limit. Values
    /// below one are raised to one; limits above the maximum are lowered to
    /// the maximum.
    #[must_use]
    pub fn clamped(page: Option<i64>, limit: Option<i64>, limits: PageLimits) -> Self {
        let page = page.map_or(1, |raw| clamp_to_u32(raw, u32::MAX));
        let limit = limit.map_or(limits.default_limit, |raw| {
            clamp_to_u32(raw, limits.max_limit)
        });
        Self { page, limit }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of items on the page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items to skip: `(page - 1) * limit`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

fn clamp_to_u32(raw: i64, max: u32) -> u32 {
    if raw < 1 {
        return 1;
    }
    u32::try_from(raw).map_or(max, |value| value.min(max))
}

/// Search result envelope: one page of items plus the full matching count.
///
/// `total` counts every match irrespective of pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    /// Items on the requested page, in store order.
    pub list: Vec<T>,
    /// Number of items matching the filter across all pages.
    pub total: u64,
}

impl<T> SearchResult<T> {
    /// Build a result from a page of items and the total match count.
    #[must_use]
    pub const fn new(list: Vec<T>, total: u64) -> Self {
        Self { list, total }
    }
}
