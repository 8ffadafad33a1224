//! Consecutive-study-day streak.
//!
//! Walks backwards one calendar day at a time from `today`, counting days
//! that have at least one session. The first day without a session ends the
//! streak, except `today` itself: an empty today is skipped so that
//! yesterday's streak still shows before the first session of the day.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::Session;

pub fn streak(sessions: &[Session], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = sessions.iter().map(|s| s.date).collect();

    let mut cursor = today;
    let mut streak = 0;
    loop {
        if days.contains(&cursor) {
            streak += 1;
        } else if cursor != today {
            break;
        }
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

pub fn today_count(sessions: &[Session], today: NaiveDate) -> u32 {
    sessions.iter().filter(|s| s.date == today).count() as u32
}
