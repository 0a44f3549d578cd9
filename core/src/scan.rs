use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

/// Properties of a single scan request.
///
/// `limit` and `scan_limit` of zero mean "unlimited". `skip` only applies when
/// a scan starts fresh; a resumed scan continues right after the last row it
/// returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanProperties {
    pub skip: usize,
    pub limit: Option<usize>,
    pub time_limit: Option<Duration>,
    pub scan_limit: Option<u64>,
    pub reverse: bool,
}

impl ScanProperties {
    pub fn new() -> Self { Self::default() }

    pub fn forward() -> Self { Self::default() }

    pub fn reverse() -> Self { Self { reverse: true, ..Self::default() } }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = if time_limit.is_zero() { None } else { Some(time_limit) };
        self
    }

    pub fn with_scan_limit(mut self, scan_limit: u64) -> Self {
        self.scan_limit = if scan_limit == 0 { None } else { Some(scan_limit) };
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Whether this request bounds the number of returned rows
    pub fn has_row_limit(&self) -> bool { self.skip > 0 || self.limit.is_some() }

    /// Skip and limit belong to the outermost cursor only; children of a
    /// merge must be scanned without them.
    pub fn clear_skip_and_limit(&self) -> Self { Self { skip: 0, limit: None, ..self.clone() } }

    /// Number of rows the source must produce to satisfy skip + limit
    pub fn skip_plus_limit(&self) -> Option<usize> { self.limit.map(|limit| limit.saturating_add(self.skip)) }
}

/// State shared by every source cursor of one execution.
///
/// Cloning shares the same budget.
#[derive(Debug, Clone, Default)]
pub struct ExecuteState {
    scanned: Arc<AtomicU64>,
    scan_limit: Option<u64>,
}

impl ExecuteState {
    pub fn new(scan_limit: Option<u64>) -> Self { Self { scanned: Arc::new(AtomicU64::new(0)), scan_limit } }

    pub fn unlimited() -> Self { Self::new(None) }

    pub fn from_properties(props: &ScanProperties) -> Self { Self::new(props.scan_limit) }

    /// Account for one scanned record. Returns false once the budget is spent.
    pub fn try_record_scan(&self) -> bool {
        let Some(limit) = self.scan_limit else {
            self.scanned.fetch_add(1, Ordering::Relaxed);
            return true;
        };
        self.scanned.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| if current < limit { Some(current + 1) } else { None }).is_ok()
    }

    /// Account for the first record a source scans in this execution. It
    /// passes even once the budget is spent, so every source moves at least
    /// one record forward and resuming an execution always makes progress.
    pub fn record_initial_scan(&self) { self.scanned.fetch_add(1, Ordering::AcqRel); }

    pub fn records_scanned(&self) -> u64 { self.scanned.load(Ordering::Acquire) }

    pub fn scan_limit(&self) -> Option<u64> { self.scan_limit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limits_are_unlimited() {
        let props = ScanProperties::new().with_limit(0).with_scan_limit(0).with_time_limit(Duration::ZERO);
        assert_eq!(props.limit, None);
        assert_eq!(props.scan_limit, None);
        assert_eq!(props.time_limit, None);
        assert!(!props.has_row_limit());
    }

    #[test]
    fn test_clear_skip_and_limit_keeps_direction() {
        let props = ScanProperties::reverse().with_skip(2).with_limit(3);
        assert_eq!(props.skip_plus_limit(), Some(5));
        let cleared = props.clear_skip_and_limit();
        assert_eq!(cleared.skip, 0);
        assert_eq!(cleared.limit, None);
        assert!(cleared.reverse);
    }

    #[test]
    fn test_scan_budget_is_shared() {
        let state = ExecuteState::new(Some(3));
        let other = state.clone();
        assert!(state.try_record_scan());
        assert!(other.try_record_scan());
        assert!(state.try_record_scan());
        assert!(!other.try_record_scan());
        assert_eq!(state.records_scanned(), 3);
    }

    #[test]
    fn test_initial_scan_passes_a_spent_budget() {
        let state = ExecuteState::new(Some(1));
        assert!(state.try_record_scan());
        assert!(!state.try_record_scan());
        state.record_initial_scan();
        assert_eq!(state.records_scanned(), 2);
        assert!(!state.try_record_scan());
    }
}
