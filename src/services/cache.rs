//! Reuse decisions for cached analyses and schedules.
//!
//! A schedule depends on both documents, an analysis only on the syllabus, so
//! a calendar-only upload invalidates the schedule but keeps the analysis.

use crate::models::CourseRecord;

/// What is stored for one (username, course_id) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheState {
    pub syllabus_updated: bool,
    pub calendar_updated: bool,
    pub has_analysis: bool,
    pub has_schedule: bool,
}

impl CacheState {
    /// A missing record counts as both flags clear.
    pub fn new(record: Option<&CourseRecord>, has_analysis: bool, has_schedule: bool) -> Self {
        Self {
            syllabus_updated: record.is_some_and(|r| r.syllabus_updated),
            calendar_updated: record.is_some_and(|r| r.calendar_updated),
            has_analysis,
            has_schedule,
        }
    }
}

pub fn should_reuse_analysis(state: &CacheState, force_refresh: bool) -> bool {
    state.has_analysis && !force_refresh && !state.syllabus_updated
}

pub fn should_reuse_schedule(state: &CacheState, force_refresh: bool) -> bool {
    state.has_schedule && !force_refresh && !state.syllabus_updated && !state.calendar_updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> CacheState {
        CacheState {
            syllabus_updated: false,
            calendar_updated: false,
            has_analysis: true,
            has_schedule: true,
        }
    }

    #[test]
    fn analysis_reused_only_when_all_conditions_hold() {
        assert!(should_reuse_analysis(&fresh(), false));

        assert!(!should_reuse_analysis(&CacheState { has_analysis: false, ..fresh() }, false));
        assert!(!should_reuse_analysis(&fresh(), true));
        assert!(!should_reuse_analysis(&CacheState { syllabus_updated: true, ..fresh() }, false));
    }

    #[test]
    fn analysis_ignores_calendar_flag() {
        assert!(should_reuse_analysis(&CacheState { calendar_updated: true, ..fresh() }, false));
    }

    #[test]
    fn schedule_needs_both_flags_clear() {
        assert!(should_reuse_schedule(&fresh(), false));

        let calendar_only = CacheState { calendar_updated: true, ..fresh() };
        assert!(!should_reuse_schedule(&calendar_only, false));
        assert!(should_reuse_analysis(&calendar_only, false));

        assert!(!should_reuse_schedule(&CacheState { syllabus_updated: true, ..fresh() }, false));
        assert!(!should_reuse_schedule(
            &CacheState { syllabus_updated: true, calendar_updated: true, ..fresh() },
            false
        ));
        assert!(!should_reuse_schedule(&CacheState { has_schedule: false, ..fresh() }, false));
        assert!(!should_reuse_schedule(&fresh(), true));
    }

    #[test]
    fn missing_record_means_clean() {
        let state = CacheState::new(None, true, true);
        assert_eq!(state, fresh());

        let record = CourseRecord {
            calendar_updated: true,
            ..CourseRecord::clean("alice", "cs162")
        };
        let state = CacheState::new(Some(&record), true, false);
        assert!(state.calendar_updated);
        assert!(!state.syllabus_updated);
        assert!(!state.has_schedule);
    }
}
