//! Page window computation.

use tracing::warn;

use super::types::PageWindow;

/// Page size bounds, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when the caller sends no usable limit.
    pub default_limit: u32,
    /// Upper bound applied to every requested limit.
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 200,
        }
    }
}

impl PageLimits {
    /// Normalize a requested page and limit into a window.
    ///
    /// Pages are 1-indexed; anything below 1 becomes 1. A missing or
    /// non-positive limit becomes the default, and oversize limits are clamped.
    pub fn window(&self, page: Option<i64>, limit: Option<i64>) -> PageWindow {
        let page = page
            .filter(|p| *p >= 1)
            .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
            .unwrap_or(1);

        let limit = match limit.filter(|l| *l >= 1) {
            Some(requested) if requested > i64::from(self.max_limit) => {
                warn!(
                    requested,
                    capped = self.max_limit,
                    "limit exceeds maximum, capping"
                );
                self.max_limit
            }
            Some(requested) => u32::try_from(requested).unwrap_or(self.max_limit),
            None => self.default_limit.min(self.max_limit),
        };

        PageWindow {
            page,
            limit,
            offset: u64::from(page - 1) * u64::from(limit),
        }
    }
}
