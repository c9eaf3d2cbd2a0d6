use crate::model::{AttendanceRecord, AttendanceStatus, RecordId};
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use std::collections::HashMap;

/// Monday..Friday of the ISO week containing `reference`, ascending. The week
/// starts on Monday; weekend days are excluded.
pub fn weekdays_of(reference: NaiveDate) -> [NaiveDate; 5] {
    let monday = reference - Duration::days(i64::from(reference.weekday().num_days_from_monday()));
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Boundary normalization for incoming dates: a plain `YYYY-MM-DD` day or an
/// RFC3339 timestamp, whose time-of-day and offset are dropped.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(t).ok().map(|dt| dt.date_naive())
}

/// First record whose (student, day) pair matches, in store order.
pub fn find_record(
    records: &[AttendanceRecord],
    student_id: RecordId,
    date: NaiveDate,
) -> Option<&AttendanceRecord> {
    records
        .iter()
        .find(|r| r.student_id == student_id && r.date == date)
}

/// Composite-key index over an attendance snapshot. At most one record per
/// (student, day); when duplicate rows exist the first row in store order
/// wins.
pub struct AttendanceSheet<'a> {
    by_cell: HashMap<(RecordId, NaiveDate), &'a AttendanceRecord>,
}

impl<'a> AttendanceSheet<'a> {
    pub fn index(records: &'a [AttendanceRecord]) -> Self {
        let mut by_cell = HashMap::new();
        for r in records {
            by_cell.entry((r.student_id, r.date)).or_insert(r);
        }
        Self { by_cell }
    }

    pub fn find(&self, student_id: RecordId, date: NaiveDate) -> Option<&'a AttendanceRecord> {
        self.by_cell.get(&(student_id, date)).copied()
    }

    /// The matching record's status, or Unmarked when no record exists.
    pub fn status_of(&self, student_id: RecordId, date: NaiveDate) -> AttendanceStatus {
        self.find(student_id, date)
            .map_or(AttendanceStatus::Unmarked, |r| r.status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Remove(RecordId),
    Replace(RecordId, AttendanceStatus),
    Insert(AttendanceRecord),
    Noop,
}

/// Decide how a cell edit lands on the collection. Unmarked is never stored:
/// it removes the matching record if one exists and is otherwise a no-op.
pub fn plan_status_change(
    records: &[AttendanceRecord],
    student_id: RecordId,
    date: NaiveDate,
    new_status: AttendanceStatus,
) -> StatusChange {
    match (find_record(records, student_id, date), new_status.is_marked()) {
        (Some(existing), false) => StatusChange::Remove(existing.id),
        (Some(existing), true) => StatusChange::Replace(existing.id, new_status),
        (None, true) => {
            let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            StatusChange::Insert(AttendanceRecord {
                id,
                student_id,
                date,
                status: new_status,
                notes: None,
            })
        }
        (None, false) => StatusChange::Noop,
    }
}

/// Pure value-returning status change; the caller persists the result.
pub fn apply_status_change(
    records: &[AttendanceRecord],
    student_id: RecordId,
    date: NaiveDate,
    new_status: AttendanceStatus,
) -> Vec<AttendanceRecord> {
    let mut out = records.to_vec();
    match plan_status_change(records, student_id, date, new_status) {
        StatusChange::Remove(id) => out.retain(|r| r.id != id),
        StatusChange::Replace(id, status) => {
            if let Some(r) = out.iter_mut().find(|r| r.id == id) {
                r.status = status;
            }
        }
        StatusChange::Insert(record) => out.push(record),
        StatusChange::Noop => {}
    }
    out
}
