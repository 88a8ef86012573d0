//! Record classification.
//!
//! Both policies are pure functions of the fetched snapshot: they never touch
//! the network, so the resulting [`ActionPlan`] can be previewed and confirmed
//! before anything is changed remotely.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::models::Record;

/// Sentinel date component for records whose creation time cannot be read.
pub const UNKNOWN_DATE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Delete,
    Skip,
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry<T> {
    pub item: T,
    pub action: Action,
}

/// Actions decided for a snapshot, in snapshot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan<T> {
    entries: Vec<PlanEntry<T>>,
}

impl<T> Default for ActionPlan<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ActionPlan<T> {
    pub fn push(&mut self, item: T, action: Action) {
        self.entries.push(PlanEntry { item, action });
    }

    pub fn entries(&self) -> &[PlanEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, action: Action) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    /// Items planned for `action`, in plan order.
    pub fn items(&self, action: Action) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .filter(move |e| e.action == action)
            .map(|e| &e.item)
    }

    /// Number of entries that change remote state.
    pub fn mutating(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action != Action::Skip)
            .count()
    }
}

impl<T> FromIterator<(T, Action)> for ActionPlan<T> {
    fn from_iter<I: IntoIterator<Item = (T, Action)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(item, action)| PlanEntry { item, action })
                .collect(),
        }
    }
}

/// Deletes every record created strictly before `cutoff`.
#[derive(Debug, Clone, Copy)]
pub struct CutoffPolicy {
    pub cutoff: DateTime<Utc>,
}

impl CutoffPolicy {
    pub fn new(cutoff: DateTime<Utc>) -> Self {
        Self { cutoff }
    }

    pub fn classify(&self, record: &Record) -> Action {
        let Some(raw) = record.created_at.as_ref() else {
            return Action::Skip;
        };
        match raw.parse() {
            Ok(created) if created < self.cutoff => Action::Delete,
            Ok(_) => Action::Skip,
            Err(err) => {
                log::warn!("keeping {}: {}", record.identifier, err);
                Action::Skip
            }
        }
    }

    pub fn plan(&self, records: &[Record]) -> ActionPlan<Record> {
        records
            .iter()
            .map(|record| (record.clone(), self.classify(record)))
            .collect()
    }
}

/// Records sharing content and creation day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: String,
    /// Earliest member, survives the run.
    pub keep: Record,
    /// Remaining members in ascending creation order.
    pub duplicates: Vec<Record>,
    /// Snapshot positions of `duplicates`, in the same order.
    positions: Vec<usize>,
}

impl DuplicateGroup {
    /// Calendar day component of the key.
    pub fn date(&self) -> &str {
        self.key
            .rsplit_once('_')
            .map(|(_, date)| date)
            .unwrap_or(UNKNOWN_DATE)
    }

    pub fn members(&self) -> impl Iterator<Item = &Record> {
        std::iter::once(&self.keep).chain(self.duplicates.iter())
    }
}

/// `sha256(content)_YYYY-MM-DD`, with `unknown` standing in for the date when
/// the creation time is missing or unparseable.
pub fn derived_key(record: &Record) -> String {
    let digest = Sha256::digest(record.content.as_bytes());
    let date = record
        .created_on()
        .map(|day| day.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());
    format!("{:x}_{}", digest, date)
}

/// Keeps the earliest of each set of same-content, same-day records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicatePolicy;

impl DuplicatePolicy {
    /// Groups with two or more members, ordered by first appearance.
    ///
    /// A record whose identifier already appears in its group is the same
    /// note seen twice and does not count as a copy.
    pub fn groups(&self, records: &[Record]) -> Vec<DuplicateGroup> {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(String, Vec<(usize, &Record)>)> = Vec::new();

        for (position, record) in records.iter().enumerate() {
            if record.content.is_empty() {
                continue;
            }
            let key = derived_key(record);
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, Vec::new()));
                buckets.len() - 1
            });
            let members = &mut buckets[slot].1;
            if members.iter().any(|(_, seen)| seen.identifier == record.identifier) {
                log::warn!("{} appears more than once in the snapshot", record.identifier);
                continue;
            }
            members.push((position, record));
        }

        buckets
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(key, mut members)| {
                // Missing times sort first; equal times keep fetch order.
                members.sort_by_key(|(position, record)| (record.created_at_lenient(), *position));
                let (_, keep) = members.remove(0);
                let (positions, duplicates) = members
                    .into_iter()
                    .map(|(position, record)| (position, record.clone()))
                    .unzip();
                DuplicateGroup {
                    key,
                    keep: keep.clone(),
                    duplicates,
                    positions,
                }
            })
            .collect()
    }

    /// Marks duplicates by snapshot position; everything else is skipped.
    pub fn plan(&self, records: &[Record], groups: &[DuplicateGroup]) -> ActionPlan<Record> {
        let doomed: HashSet<usize> = groups
            .iter()
            .flat_map(|group| group.positions.iter().copied())
            .collect();

        records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                let action = if doomed.contains(&position) {
                    Action::Delete
                } else {
                    Action::Skip
                };
                (record.clone(), action)
            })
            .collect()
    }
}

/// Decision function chosen for a run.
#[derive(Debug, Clone, Copy)]
pub enum Policy {
    Cutoff(CutoffPolicy),
    Duplicates(DuplicatePolicy),
}

/// Output of classifying one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub plan: ActionPlan<Record>,
    /// Only populated by the duplicate policy.
    pub groups: Vec<DuplicateGroup>,
}

impl Policy {
    pub fn classify(&self, records: &[Record]) -> Classification {
        match self {
            Policy::Cutoff(policy) => Classification {
                plan: policy.plan(records),
                groups: Vec::new(),
            },
            Policy::Duplicates(policy) => {
                let groups = policy.groups(records);
                Classification {
                    plan: policy.plan(records, &groups),
                    groups,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use crate::test_support::record;

    fn cutoff() -> CutoffPolicy {
        CutoffPolicy::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn test_cutoff_is_strict() {
        let policy = cutoff();
        let before = record("memos/1", "old", "2024-12-31T23:59:59Z");
        let exact = record("memos/2", "edge", "2025-01-01T00:00:00Z");
        let after = record("memos/3", "new", "2025-01-02T00:00:00Z");

        assert_eq!(policy.classify(&before), Action::Delete);
        assert_eq!(policy.classify(&exact), Action::Skip);
        assert_eq!(policy.classify(&after), Action::Skip);
    }

    #[test]
    fn test_cutoff_never_deletes_without_a_readable_time() {
        let policy = cutoff();
        let missing = Record::new("memos/1", "no time");
        let garbage = Record::new("memos/2", "bad time").created(Timestamp::Iso("last tuesday".into()));

        assert_eq!(policy.classify(&missing), Action::Skip);
        assert_eq!(policy.classify(&garbage), Action::Skip);

        let far_future = CutoffPolicy::new(DateTime::<Utc>::MAX_UTC);
        assert_eq!(far_future.classify(&missing), Action::Skip);
    }

    #[test]
    fn test_cutoff_handles_epoch_seconds() {
        let policy = cutoff();
        let legacy = Record::new("memos/7", "legacy").created(Timestamp::Epoch(1_600_000_000));
        assert_eq!(policy.classify(&legacy), Action::Delete);
    }

    #[test]
    fn test_duplicate_scenario() {
        let records = vec![
            record("A", "hi", "2024-01-01T10:00:00Z"),
            record("B", "hi", "2024-01-01T12:00:00Z"),
            record("C", "bye", "2024-01-01T09:00:00Z"),
        ];

        let classification = Policy::Duplicates(DuplicatePolicy).classify(&records);

        assert_eq!(classification.groups.len(), 1);
        let group = &classification.groups[0];
        assert_eq!(group.keep.identifier, "A");
        let doomed: Vec<_> = group.duplicates.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(doomed, vec!["B"]);
        assert_eq!(group.date(), "2024-01-01");

        let planned: Vec<_> = classification
            .plan
            .items(Action::Delete)
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(planned, vec!["B"]);
        assert_eq!(classification.plan.count(Action::Skip), 2);
    }

    #[test]
    fn test_duplicates_keep_earliest_regardless_of_fetch_order() {
        let records = vec![
            record("late", "same", "2024-03-05T18:00:00Z"),
            record("early", "same", "2024-03-05T06:00:00Z"),
            record("middle", "same", "2024-03-05T12:00:00Z"),
        ];

        let groups = DuplicatePolicy.groups(&records);
        assert_eq!(groups[0].keep.identifier, "early");
        let rest: Vec<_> = groups[0].duplicates.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(rest, vec!["middle", "late"]);
    }

    #[test]
    fn test_equal_times_fall_back_to_fetch_order() {
        let records = vec![
            record("first", "twin", "2024-03-05T06:00:00Z"),
            record("second", "twin", "2024-03-05T06:00:00Z"),
        ];
        let groups = DuplicatePolicy.groups(&records);
        assert_eq!(groups[0].keep.identifier, "first");
    }

    #[test]
    fn test_same_content_on_different_days_is_not_a_duplicate() {
        let records = vec![
            record("night", "gm", "2024-01-01T23:59:00Z"),
            record("morning", "gm", "2024-01-02T00:01:00Z"),
        ];
        assert!(DuplicatePolicy.groups(&records).is_empty());
    }

    #[test]
    fn test_unknown_dates_share_a_bucket_and_sort_first() {
        let records = vec![
            record("dated", "x", "2024-01-01T00:00:00Z"),
            Record::new("undated-1", "x"),
            Record::new("undated-2", "x").created(Timestamp::Iso("??".into())),
        ];

        let groups = DuplicatePolicy.groups(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date(), UNKNOWN_DATE);
        assert_eq!(groups[0].keep.identifier, "undated-1");
        assert_eq!(groups[0].members().count(), 2);
    }

    #[test]
    fn test_empty_content_is_never_grouped() {
        let records = vec![
            record("a", "", "2024-01-01T00:00:00Z"),
            record("b", "", "2024-01-01T01:00:00Z"),
        ];
        assert!(DuplicatePolicy.groups(&records).is_empty());
    }

    #[test]
    fn test_singletons_never_appear() {
        let records = vec![
            record("a", "one", "2024-01-01T00:00:00Z"),
            record("b", "two", "2024-01-01T00:00:00Z"),
        ];
        let classification = Policy::Duplicates(DuplicatePolicy).classify(&records);
        assert!(classification.groups.is_empty());
        assert_eq!(classification.plan.mutating(), 0);
    }

    #[test]
    fn test_same_memo_seen_twice_is_never_deleted() {
        let records = vec![
            record("memos/1", "hi", "2024-01-01T10:00:00Z"),
            record("memos/1", "hi", "2024-01-01T10:00:00Z"),
        ];

        let classification = Policy::Duplicates(DuplicatePolicy).classify(&records);

        assert!(classification.groups.is_empty());
        assert_eq!(classification.plan.count(Action::Delete), 0);
    }

    #[test]
    fn test_repeated_memo_keeps_exactly_one_copy_of_the_group() {
        let records = vec![
            record("memos/1", "hi", "2024-01-01T10:00:00Z"),
            record("memos/2", "hi", "2024-01-01T11:00:00Z"),
            record("memos/1", "hi", "2024-01-01T10:00:00Z"),
        ];

        let classification = Policy::Duplicates(DuplicatePolicy).classify(&records);

        let deletes: Vec<_> = classification
            .plan
            .items(Action::Delete)
            .map(|r| r.identifier.as_str())
            .collect();
        assert_eq!(deletes, vec!["memos/2"]);
        assert_eq!(classification.groups[0].keep.identifier, "memos/1");
    }

    #[test]
    fn test_offsetless_times_group_by_their_own_day() {
        let records = vec![
            Record::new("a", "gm").created(Timestamp::Iso("2024-01-01T08:00:00".into())),
            Record::new("b", "gm").created(Timestamp::Iso("2024-01-02T08:00:00".into())),
            Record::new("c", "gm").created(Timestamp::Iso("2024-01-02T07:00:00".into())),
        ];

        let groups = DuplicatePolicy.groups(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date(), "2024-01-02");
        assert_eq!(groups[0].keep.identifier, "c");
        let doomed: Vec<_> = groups[0].duplicates.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(doomed, vec!["b"]);

        // Deleting by time still needs an explicit offset.
        assert_eq!(cutoff().classify(&records[0]), Action::Skip);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let records = vec![
            record("a", "hi", "2024-01-01T10:00:00Z"),
            record("b", "hi", "2024-01-01T12:00:00Z"),
            record("c", "old", "2020-01-01T12:00:00Z"),
            record("d", "hi", "2024-01-01T08:00:00Z"),
        ];

        for policy in [Policy::Duplicates(DuplicatePolicy), Policy::Cutoff(cutoff())] {
            assert_eq!(policy.classify(&records), policy.classify(&records));
        }
    }
}
