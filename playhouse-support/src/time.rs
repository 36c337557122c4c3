use std::time::{Duration, Instant};

/// Returns the current monotonic instant. The connector never reads the
/// wall clock for deadlines or sequencing — only `Instant`, so NTP
/// adjustments and DST transitions can't corrupt a timeout deadline.
#[inline]
pub fn now() -> Instant {
    Instant::now()
}

/// `now() + millis`, saturating instead of panicking on overflow.
#[inline]
pub fn deadline_after(now: Instant, millis: u64) -> Instant {
    now.checked_add(Duration::from_millis(millis))
        .or_else(|| now.checked_add(Duration::from_secs(60 * 60 * 24 * 365)))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_after_adds_the_given_duration() {
        let now = Instant::now();
        let deadline = deadline_after(now, 500);
        assert!(deadline >= now + Duration::from_millis(500));
    }

    #[test]
    fn deadline_after_saturates_instead_of_panicking_on_overflow() {
        let now = Instant::now();
        let deadline = deadline_after(now, u64::MAX);
        assert!(deadline >= now);
    }
}
