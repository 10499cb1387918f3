//! Join, aggregate, filter, sort and paginate over schedule/profile data.
//!
//! Every function here is pure: it takes the latest fetched collections and
//! returns freshly derived values. Nothing is cached between calls.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::model::{CombinedRecord, Profile, ScheduleEntry, WfhCountByDate, WorkLocation};

/// Left-join schedules with profiles on `staff_id`.
///
/// The output has one record per schedule entry, in input order. When
/// several profiles share a `staff_id` the first one wins. Entries without
/// a profile keep blank profile fields and are placed in the office.
pub fn join(schedules: &[ScheduleEntry], profiles: &[Profile]) -> Vec<CombinedRecord> {
    let mut by_id: HashMap<i64, &Profile> = HashMap::with_capacity(profiles.len());
    for profile in profiles {
        if by_id.contains_key(&profile.staff_id) {
            debug!(staff_id = profile.staff_id, "duplicate profile ignored");
            continue;
        }
        by_id.insert(profile.staff_id, profile);
    }

    schedules
        .iter()
        .map(|entry| match by_id.get(&entry.staff_id) {
            Some(profile) => CombinedRecord {
                staff_id: entry.staff_id,
                date: entry.date.clone(),
                status: entry.status,
                location: entry.location.or(profile.location).unwrap_or_default(),
                staff_fname: profile.staff_fname.clone(),
                staff_lname: profile.staff_lname.clone(),
                position: profile.position.clone(),
                department: profile.department.clone(),
                country: profile.country.clone(),
            },
            None => CombinedRecord {
                staff_id: entry.staff_id,
                date: entry.date.clone(),
                status: entry.status,
                location: WorkLocation::Office,
                staff_fname: String::new(),
                staff_lname: String::new(),
                position: String::new(),
                department: String::new(),
                country: String::new(),
            },
        })
        .collect()
}

/// Count approved remote records per date.
pub fn aggregate(records: &[CombinedRecord]) -> WfhCountByDate {
    let mut counts = WfhCountByDate::new();
    for record in records.iter().filter(|r| r.is_wfh()) {
        *counts.entry(record.date.clone()).or_insert(0) += 1;
    }
    counts
}

/// Optional predicates applied with AND. Unset or blank fields always pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub work_location: Option<String>,
    pub department: Option<String>,
    pub search_query: Option<String>,
    pub date_filter: Option<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        [
            &self.work_location,
            &self.department,
            &self.search_query,
            &self.date_filter,
        ]
        .iter()
        .all(|f| active(f).is_none())
    }

    pub fn matches(&self, record: &CombinedRecord) -> bool {
        if let Some(loc) = active(&self.work_location) {
            if !record.location.as_str().eq_ignore_ascii_case(loc) {
                return false;
            }
        }
        if let Some(dept) = active(&self.department) {
            if !contains_ignore_case(&record.department, dept) {
                return false;
            }
        }
        if let Some(query) = active(&self.search_query) {
            if !contains_ignore_case(&record.staff_name(), query) {
                return false;
            }
        }
        if let Some(date) = active(&self.date_filter) {
            if record.date != date {
                return false;
            }
        }
        true
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Keep the records matching `filter`, preserving their relative order.
pub fn filter(records: &[CombinedRecord], filter: &RecordFilter) -> Vec<CombinedRecord> {
    records.iter().filter(|r| filter.matches(r)).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    StaffId,
    #[default]
    Date,
    Status,
    Location,
    StaffFname,
    StaffLname,
    Position,
    Department,
    Country,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::StaffId => "staff_id",
            SortKey::Date => "date",
            SortKey::Status => "status",
            SortKey::Location => "location",
            SortKey::StaffFname => "staff_fname",
            SortKey::StaffLname => "staff_lname",
            SortKey::Position => "position",
            SortKey::Department => "department",
            SortKey::Country => "country",
        }
    }

    fn compare(&self, a: &CombinedRecord, b: &CombinedRecord) -> Ordering {
        match self {
            SortKey::StaffId => a.staff_id.cmp(&b.staff_id),
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::Location => a.location.as_str().cmp(b.location.as_str()),
            SortKey::StaffFname => a.staff_fname.cmp(&b.staff_fname),
            SortKey::StaffLname => a.staff_lname.cmp(&b.staff_lname),
            SortKey::Position => a.position.cmp(&b.position),
            SortKey::Department => a.department.cmp(&b.department),
            SortKey::Country => a.country.cmp(&b.country),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staff_id" => Ok(SortKey::StaffId),
            "date" => Ok(SortKey::Date),
            "status" => Ok(SortKey::Status),
            "location" => Ok(SortKey::Location),
            "staff_fname" | "name" => Ok(SortKey::StaffFname),
            "staff_lname" => Ok(SortKey::StaffLname),
            "position" => Ok(SortKey::Position),
            "department" => Ok(SortKey::Department),
            "country" => Ok(SortKey::Country),
            _ => Err(UnknownSortKey(s.to_string())),
        }
    }
}

/// Stable in-place sort. Ties keep their incoming order in both directions.
pub fn sort(records: &mut [CombinedRecord], key: SortKey, direction: SortDirection) {
    records.sort_by(|a, b| direction.apply(key.compare(a, b)));
}

/// Column/direction pair driven by repeated header activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: Copy + PartialEq> SortState<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            direction: SortDirection::Asc,
        }
    }

    /// Activating the current key while ascending flips to descending; any
    /// other activation starts ascending on `key`.
    pub fn activate(&mut self, key: K) {
        let was_asc = self.key == key && self.direction == SortDirection::Asc;
        self.key = key;
        self.direction = if was_asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
    }
}

impl<K: Default + Copy + PartialEq> Default for SortState<K> {
    fn default() -> Self {
        Self::new(K::default())
    }
}

/// The `page`-th window of `size` items. Out-of-range pages are empty.
pub fn paginate<T>(items: &[T], page: usize, size: usize) -> &[T] {
    let start = match page.checked_mul(size) {
        Some(start) if start < items.len() => start,
        _ => return &[],
    };
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}

/// Number of pages needed to show `len` items, at least one.
pub fn page_count(len: usize, size: usize) -> usize {
    if size == 0 {
        return 1;
    }
    len.div_ceil(size).max(1)
}
