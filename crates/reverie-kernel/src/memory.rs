//! Memory tail maintenance.
//!
//! Characters remember only a short tail of recent events: 3 entries for
//! minor characters, 5 for story characters. Appending past the cap drops
//! the oldest entries. Summarization is intentionally absent; the cap is
//! the whole policy.

use reverie_types::MemoryEntry;

/// Append an entry, then truncate the front so at most `cap` remain.
pub fn push_capped(memory: &mut Vec<MemoryEntry>, entry: MemoryEntry, cap: usize) {
    memory.push(entry);
    if memory.len() > cap {
        let excess = memory.len().saturating_sub(cap);
        memory.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn entry(n: usize) -> MemoryEntry {
        MemoryEntry::new(format!("event {n}"), "done", Utc::now())
    }

    #[test]
    fn append_below_cap_keeps_everything() {
        let mut memory = Vec::new();
        push_capped(&mut memory, entry(1), 3);
        push_capped(&mut memory, entry(2), 3);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn append_past_cap_drops_oldest() {
        let mut memory = Vec::new();
        for n in 0..8 {
            push_capped(&mut memory, entry(n), 3);
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(memory[0].action, "event 5");
        assert_eq!(memory[2].action, "event 7");
    }

    #[test]
    fn story_cap_retains_five() {
        let mut memory = Vec::new();
        for n in 0..9 {
            push_capped(&mut memory, entry(n), 5);
        }
        assert_eq!(memory.len(), 5);
        assert_eq!(memory[0].action, "event 4");
    }

    #[test]
    fn oversized_existing_tail_is_trimmed_on_append() {
        // A class downgrade can leave more entries than the cap allows;
        // the next append restores the invariant.
        let mut memory: Vec<MemoryEntry> = (0..6).map(entry).collect();
        push_capped(&mut memory, entry(6), 3);
        assert_eq!(memory.len(), 3);
        assert_eq!(memory[2].action, "event 6");
    }
}
