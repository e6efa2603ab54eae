pub mod client_rate_limit;
pub mod http;
pub mod retry;

use std::{num::NonZeroU32, time::Duration};

use crate::error::{Error, NotifierResult};
use error_stack::report;
use governor::Quota;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitWindow {
    PerSecond(NonZeroU32),
    PerMinute(NonZeroU32),
    Custom { period: Duration },
}

impl RateLimitWindow {
    /// - `<n>s` → PerSecond(n)
    /// - `<n>m` → PerMinute(n)
    /// - `<n>h` → Custom { period = Duration::from_secs(n * 3600) }
    /// - `<n>d` → Custom { period = Duration::from_secs(n * 86400) }
    pub fn from_string(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 || !s.is_char_boundary(s.len() - 1) {
            return None;
        }

        let (num_str, unit) = s.split_at(s.len() - 1);
        let nonzero = NonZeroU32::new(num_str.parse().ok()?)?;
        let number = u64::from(nonzero.get());

        match unit {
            "s" => Some(RateLimitWindow::PerSecond(nonzero)),
            "m" => Some(RateLimitWindow::PerMinute(nonzero)),
            "h" => Some(RateLimitWindow::Custom {
                period: Duration::from_secs(number * 3600),
            }),
            "d" => Some(RateLimitWindow::Custom {
                period: Duration::from_secs(number * 86400),
            }),
            _ => None,
        }
    }

    /// Builds the governor quota for this window, optionally widening the burst.
    pub fn quota(&self, burst: Option<NonZeroU32>) -> NotifierResult<Quota> {
        let quota = match self {
            RateLimitWindow::PerSecond(allowed) => Quota::per_second(*allowed),
            RateLimitWindow::PerMinute(allowed) => Quota::per_minute(*allowed),
            RateLimitWindow::Custom { period } => Quota::with_period(*period).ok_or_else(|| {
                report!(Error::ConfigError(format!(
                    "Rate limit period must be non-zero, got {period:?}"
                )))
            })?,
        };
        Ok(match burst {
            Some(b) => quota.allow_burst(b),
            None => quota,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_window_from_string() {
        assert_eq!(
            RateLimitWindow::from_string("1s"),
            Some(RateLimitWindow::PerSecond(NonZeroU32::new(1).unwrap()))
        );
        assert_eq!(
            RateLimitWindow::from_string("20m"),
            Some(RateLimitWindow::PerMinute(NonZeroU32::new(20).unwrap()))
        );
        assert_eq!(
            RateLimitWindow::from_string("2h"),
            Some(RateLimitWindow::Custom {
                period: Duration::from_secs(7200)
            })
        );
        assert_eq!(
            RateLimitWindow::from_string("1d"),
            Some(RateLimitWindow::Custom {
                period: Duration::from_secs(86400)
            })
        );
    }

    #[test]
    fn test_rate_limit_window_rejects_garbage() {
        assert_eq!(RateLimitWindow::from_string(""), None);
        assert_eq!(RateLimitWindow::from_string("s"), None);
        assert_eq!(RateLimitWindow::from_string("0s"), None);
        assert_eq!(RateLimitWindow::from_string("-1s"), None);
        assert_eq!(RateLimitWindow::from_string("5w"), None);
        assert_eq!(RateLimitWindow::from_string("abc"), None);
        assert_eq!(RateLimitWindow::from_string("1é"), None);
    }

    #[test]
    fn test_quota_with_burst() {
        let quota = RateLimitWindow::PerSecond(NonZeroU32::new(1).unwrap())
            .quota(NonZeroU32::new(3))
            .unwrap();
        assert_eq!(quota.burst_size().get(), 3);
    }
}
