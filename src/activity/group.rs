//! Calendar-relative grouping of feed events for display

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;

use super::types::ActivityEvent;

/// Display bucket for a group of events, judged in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "bucket", rename_all = "snake_case")]
pub enum GroupBucket {
    Today,
    Yesterday,
    ThisWeek,
    Month { year: i32, month: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityGroup {
    pub bucket: GroupBucket,
    pub events: Vec<ActivityEvent>,
}

fn bucket_for(date: NaiveDate, today: NaiveDate) -> GroupBucket {
    if date == today {
        return GroupBucket::Today;
    }
    if Some(date) == today.checked_sub_days(Days::new(1)) {
        return GroupBucket::Yesterday;
    }
    // "This week" starts on Monday of the current week.
    let week_start = today - chrono::Duration::days(today.weekday().num_days_from_monday() as i64);
    if date >= week_start && date < today {
        return GroupBucket::ThisWeek;
    }
    GroupBucket::Month {
        year: date.year(),
        month: date.month(),
    }
}

/// Partition a version-descending event list into display groups.
///
/// Runs of events sharing a bucket become one group; order within and
/// across groups is untouched, so re-concatenating the groups yields the
/// input list exactly.
pub fn group_by_time_at(events: Vec<ActivityEvent>, now: DateTime<Utc>) -> Vec<ActivityGroup> {
    let today = now.date_naive();
    let mut groups: Vec<ActivityGroup> = Vec::new();

    for event in events {
        let bucket = bucket_for(event.timestamp.date_naive(), today);
        match groups.last_mut() {
            Some(group) if group.bucket == bucket => group.events.push(event),
            _ => groups.push(ActivityGroup {
                bucket,
                events: vec![event],
            }),
        }
    }

    groups
}

pub fn group_by_time(events: Vec<ActivityEvent>) -> Vec<ActivityGroup> {
    group_by_time_at(events, Utc::now())
}
