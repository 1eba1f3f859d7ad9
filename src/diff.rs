//! Phrase diff engine
//!
//! Phrases are compared under two identity policies. Literal-keyed
//! phrases are identified by `(key, file)`, so any text change shows up
//! as one removal plus one addition. Meta-keyed phrases are identified
//! by `(meta_key, file)`, so a text change under the same meta key is a
//! modification that keeps a reference to the phrase it replaced.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{DiffEntry, DiffState, IndexKey, Phrase, PhraseDiff};

/// Compare `new` against `old`.
///
/// Phrases only in `new` are added, phrases only in `old` are removed.
/// Bucket order follows `new` for added/modified and `old` for removed.
pub fn compare(new: &[Phrase], old: &[Phrase]) -> PhraseDiff {
    let new = Partition::of(new);
    let old = Partition::of(old);

    let mut diff = PhraseDiff::default();
    for entry in diff_by_key(&new.by_key, &old.by_key)
        .into_iter()
        .chain(diff_by_meta_key(&new.by_meta_key, &old.by_meta_key))
    {
        match entry.state {
            DiffState::Added => diff.added.push(entry),
            DiffState::Removed => diff.removed.push(entry),
            DiffState::Modified => diff.modified.push(entry),
            DiffState::Unmodified => {}
        }
    }
    diff
}

struct Partition<'a> {
    by_key: Vec<&'a Phrase>,
    by_meta_key: Vec<&'a Phrase>,
}

impl<'a> Partition<'a> {
    fn of(phrases: &'a [Phrase]) -> Self {
        let (by_meta_key, by_key) = phrases
            .iter()
            .partition(|p| p.index_key() == IndexKey::MetaKey);
        Self { by_key, by_meta_key }
    }
}

fn diff_by_key(new: &[&Phrase], old: &[&Phrase]) -> Vec<DiffEntry> {
    let old_ids: FxHashSet<(&str, &str)> = old.iter().map(|p| (p.key.as_str(), p.file.as_str())).collect();
    let new_ids: FxHashSet<(&str, &str)> = new.iter().map(|p| (p.key.as_str(), p.file.as_str())).collect();

    let mut entries = Vec::with_capacity(new.len());
    for phrase in new {
        let entry = if old_ids.contains(&(phrase.key.as_str(), phrase.file.as_str())) {
            DiffEntry { phrase: (*phrase).clone(), state: DiffState::Unmodified, old_phrase: None }
        } else {
            DiffEntry::added((*phrase).clone())
        };
        entries.push(entry);
    }
    for phrase in old {
        if !new_ids.contains(&(phrase.key.as_str(), phrase.file.as_str())) {
            entries.push(DiffEntry::removed((*phrase).clone()));
        }
    }
    entries
}

fn diff_by_meta_key(new: &[&Phrase], old: &[&Phrase]) -> Vec<DiffEntry> {
    // First occurrence wins when a meta key repeats within a file
    let mut old_by_id: FxHashMap<(&str, &str), &Phrase> = FxHashMap::default();
    for phrase in old {
        old_by_id.entry((phrase.index_value(), phrase.file.as_str())).or_insert(*phrase);
    }
    let new_ids: FxHashSet<(&str, &str)> = new.iter().map(|p| (p.index_value(), p.file.as_str())).collect();

    let mut entries = Vec::with_capacity(new.len());
    for phrase in new {
        let entry = match old_by_id.get(&(phrase.index_value(), phrase.file.as_str())) {
            None => DiffEntry::added((*phrase).clone()),
            Some(previous) if previous.key == phrase.key => DiffEntry {
                phrase: (*phrase).clone(),
                state: DiffState::Unmodified,
                old_phrase: None,
            },
            Some(previous) => DiffEntry::modified((*phrase).clone(), (*previous).clone()),
        };
        entries.push(entry);
    }
    for phrase in old {
        if !new_ids.contains(&(phrase.index_value(), phrase.file.as_str())) {
            entries.push(DiffEntry::removed((*phrase).clone()));
        }
    }
    entries
}
