use crate::model::BatchEntry;

/// Case-insensitive substring filter over already-fetched records.
/// Matches on name, class, or any exam entry. An empty term keeps everything.
pub fn filter_batches<'a>(records: &'a [BatchEntry], term: &str) -> Vec<&'a BatchEntry> {
    if term.is_empty() {
        return records.iter().collect();
    }
    let needle = term.to_lowercase();
    records.iter().filter(|b| matches(b, &needle)).collect()
}

fn matches(batch: &BatchEntry, needle: &str) -> bool {
    batch.name.to_lowercase().contains(needle)
        || batch
            .class
            .as_deref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
        || batch.exam.iter().any(|e| e.to_lowercase().contains(needle))
}
