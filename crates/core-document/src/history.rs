use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

use crate::Document;

/// Maximum number of snapshots retained in undo history.
pub const HISTORY_MAX: usize = 200;

/// Undo checkpoints as seen by the dispatcher.
pub trait UndoJournal<D: Document + ?Sized> {
    /// Record the current document state as a discrete undo point.
    fn checkpoint(&mut self, doc: &D);
    /// Announce an upcoming insertion. Clean insertions coalesce with the running insert run;
    /// dirty ones always start a fresh entry and close the run.
    fn note_insert(&mut self, doc: &D, clean: bool);
    fn undo(&mut self, doc: &mut D) -> bool;
    fn redo(&mut self, doc: &mut D) -> bool;
}

#[derive(Clone, Debug)]
struct Snapshot {
    html: String,
    hash: u64,
}

/// Insert run state: while active, clean insertions share one undo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertRun {
    Inactive,
    Active { edits: u32 },
}

/// Markup-snapshot undo history with identical-state dedupe.
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    insert_run: InsertRun,
    skipped: AtomicU64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            insert_run: InsertRun::Inactive,
            skipped: AtomicU64::new(0),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn insert_run(&self) -> InsertRun {
        self.insert_run
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn push(&mut self, html: String) {
        let hash = markup_hash(&html);
        if let Some(last) = self.undo_stack.last()
            && last.hash == hash
        {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            trace!(target: "document.history", undo_depth = self.undo_stack.len(), hash, "snapshot_dedupe_skip");
            return;
        }
        self.undo_stack.push(Snapshot { html, hash });
        trace!(target: "document.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), hash, "push_snapshot");
        if self.undo_stack.len() > HISTORY_MAX {
            let _ = self.undo_stack.remove(0);
            trace!(target: "document.history", "undo_stack_trimmed");
        }
        self.redo_stack.clear();
    }
}

impl<D: Document + ?Sized> UndoJournal<D> for History {
    fn checkpoint(&mut self, doc: &D) {
        self.insert_run = InsertRun::Inactive;
        self.push(doc.inner_html());
    }

    fn note_insert(&mut self, doc: &D, clean: bool) {
        if !clean {
            self.insert_run = InsertRun::Inactive;
            self.push(doc.inner_html());
            trace!(target: "document.history", "dirty_insert");
            return;
        }
        match &mut self.insert_run {
            InsertRun::Inactive => {
                self.push(doc.inner_html());
                self.insert_run = InsertRun::Active { edits: 1 };
            }
            InsertRun::Active { edits } => *edits += 1,
        }
    }

    fn undo(&mut self, doc: &mut D) -> bool {
        let Some(last) = self.undo_stack.pop() else {
            return false;
        };
        self.insert_run = InsertRun::Inactive;
        let html = doc.inner_html();
        let hash = markup_hash(&html);
        self.redo_stack.push(Snapshot { html, hash });
        doc.set_inner_html(&last.html);
        trace!(target: "document.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        true
    }

    fn redo(&mut self, doc: &mut D) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        self.insert_run = InsertRun::Inactive;
        let html = doc.inner_html();
        let hash = markup_hash(&html);
        self.undo_stack.push(Snapshot { html, hash });
        doc.set_inner_html(&next.html);
        trace!(target: "document.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "redo_pop");
        true
    }
}

fn markup_hash(html: &str) -> u64 {
    let mut h = DefaultHasher::new();
    h.write(html.as_bytes());
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDocument;

    fn journal() -> History {
        History::new()
    }

    #[test]
    fn checkpoint_then_undo_restores_markup() {
        let mut doc = MemoryDocument::from_html("<p>a</p>");
        let mut h = journal();
        h.checkpoint(&doc);
        doc.set_inner_html("<p>ab</p>");
        assert!(UndoJournal::<MemoryDocument>::undo(&mut h, &mut doc));
        assert_eq!(doc.inner_html(), "<p>a</p>");
        assert!(UndoJournal::<MemoryDocument>::redo(&mut h, &mut doc));
        assert_eq!(doc.inner_html(), "<p>ab</p>");
    }

    #[test]
    fn identical_checkpoints_are_deduped() {
        let doc = MemoryDocument::from_html("<p>a</p>");
        let mut h = journal();
        h.checkpoint(&doc);
        h.checkpoint(&doc);
        assert_eq!(h.undo_depth(), 1);
        assert_eq!(h.snapshots_skipped(), 1);
    }

    #[test]
    fn clean_inserts_coalesce_dirty_ones_do_not() {
        let mut doc = MemoryDocument::from_html("<p></p>");
        let mut h = journal();
        h.note_insert(&doc, true);
        doc.set_inner_html("<p>a</p>");
        h.note_insert(&doc, true);
        doc.set_inner_html("<p>ab</p>");
        assert_eq!(h.undo_depth(), 1);
        assert_eq!(h.insert_run(), InsertRun::Active { edits: 2 });

        h.note_insert(&doc, false);
        assert_eq!(h.undo_depth(), 2);
        assert_eq!(h.insert_run(), InsertRun::Inactive);
    }

    #[test]
    fn new_snapshot_clears_redo() {
        let mut doc = MemoryDocument::from_html("<p>a</p>");
        let mut h = journal();
        h.checkpoint(&doc);
        doc.set_inner_html("<p>b</p>");
        UndoJournal::<MemoryDocument>::undo(&mut h, &mut doc);
        assert_eq!(h.redo_depth(), 1);
        doc.set_inner_html("<p>c</p>");
        h.checkpoint(&doc);
        assert_eq!(h.redo_depth(), 0);
    }

    #[test]
    fn empty_stacks_report_false() {
        let mut doc = MemoryDocument::new();
        let mut h = journal();
        assert!(!UndoJournal::<MemoryDocument>::undo(&mut h, &mut doc));
        assert!(!UndoJournal::<MemoryDocument>::redo(&mut h, &mut doc));
    }

    #[test]
    fn history_is_bounded() {
        let mut doc = MemoryDocument::new();
        let mut h = journal();
        for i in 0..(HISTORY_MAX + 5) {
            doc.set_inner_html(&format!("<p>{i}</p>"));
            h.checkpoint(&doc);
        }
        assert_eq!(h.undo_depth(), HISTORY_MAX);
    }
}
