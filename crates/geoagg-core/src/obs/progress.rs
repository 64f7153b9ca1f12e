use std::cell::RefCell;

///
/// ProgressSink
///
/// Receives percentage updates (0..=100) from a running pipeline.
///

pub trait ProgressSink {
    fn set_progress(&self, percent: u8);
}

///
/// NoProgress
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_progress(&self, _: u8) {}
}

///
/// ProgressLog
///
/// Records every update in order.
///

#[derive(Debug, Default)]
pub struct ProgressLog {
    updates: RefCell<Vec<u8>>,
}

impl ProgressLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn updates(&self) -> Vec<u8> {
        self.updates.borrow().clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<u8> {
        self.updates.borrow().last().copied()
    }
}

impl ProgressSink for ProgressLog {
    fn set_progress(&self, percent: u8) {
        self.updates.borrow_mut().push(percent);
    }
}

/// `base + int(step * span / total)`, clamped to 100. An empty total reports
/// `base`.
pub(crate) fn scaled(base: u8, span: u8, step: usize, total: usize) -> u8 {
    if total == 0 {
        return base;
    }
    let offset = step.saturating_mul(usize::from(span)) / total;
    let percent = usize::from(base).saturating_add(offset).min(100);

    u8::try_from(percent).unwrap_or(100)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_truncates_toward_zero() {
        assert_eq!(scaled(0, 50, 1, 3), 16);
        assert_eq!(scaled(0, 50, 3, 3), 50);
        assert_eq!(scaled(50, 50, 0, 4), 50);
        assert_eq!(scaled(50, 50, 3, 4), 87);
        assert_eq!(scaled(0, 100, 0, 0), 0);
    }

    #[test]
    fn progress_log_keeps_update_order() {
        let log = ProgressLog::new();
        log.set_progress(10);
        log.set_progress(60);

        assert_eq!(log.updates(), vec![10, 60]);
        assert_eq!(log.last(), Some(60));
    }
}
