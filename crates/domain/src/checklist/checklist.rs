//! Checklist entity - an ordered, titled sequence of items
//!
//! Items are soft-deleted in place (audit history survives), so the
//! positional indices the API speaks are defined over *live* items
//! only. All position resolution goes through this type; callers never
//! see the gap-carrying backing vec except through `items()`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checklist::item::ChecklistItem;
use crate::common::{to_millis, Millis, NEVER};
use crate::error::DomainError;
use crate::ids::ChecklistId;

/// A checklist owned by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    id: ChecklistId,
    title: String,
    items: Vec<ChecklistItem>,
    /// Skip/Restore flag. A skipped checklist stays positionally
    /// addressable; mutating its children is rejected.
    delete_at: Millis,
    update_at: Millis,
}

impl Checklist {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ChecklistId::new(),
            title: title.into(),
            items: Vec::new(),
            delete_at: NEVER,
            update_at: NEVER,
        }
    }

    // Read accessors

    pub fn id(&self) -> ChecklistId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Every item, including soft-deleted ones (the audit view).
    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn delete_at(&self) -> Millis {
        self.delete_at
    }

    pub fn update_at(&self) -> Millis {
        self.update_at
    }

    pub fn is_skipped(&self) -> bool {
        self.delete_at != NEVER
    }

    /// Live (non-deleted) items in positional order.
    pub fn live_items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|i| !i.is_deleted())
    }

    pub fn live_items_mut(&mut self) -> impl Iterator<Item = &mut ChecklistItem> {
        self.items.iter_mut().filter(|i| !i.is_deleted())
    }

    /// Number of live items; the length positional indices run over.
    pub fn live_len(&self) -> usize {
        self.live_items().count()
    }

    /// Resolves a live position to the item at it.
    pub fn item(&self, position: usize) -> Result<&ChecklistItem, DomainError> {
        let index = self.backing_index(position)?;
        Ok(&self.items[index])
    }

    pub fn item_mut(&mut self, position: usize) -> Result<&mut ChecklistItem, DomainError> {
        let index = self.backing_index(position)?;
        Ok(&mut self.items[index])
    }

    // Builder methods (for construction)

    pub fn with_id(mut self, id: ChecklistId) -> Self {
        self.id = id;
        self
    }

    pub fn with_items(mut self, items: Vec<ChecklistItem>) -> Self {
        self.items = items;
        self
    }

    // Mutation methods

    pub fn rename(&mut self, title: impl Into<String>, now: DateTime<Utc>) {
        self.title = title.into();
        self.update_at = to_millis(now);
    }

    pub fn push_item(&mut self, item: ChecklistItem, now: DateTime<Utc>) {
        self.items.push(item);
        self.update_at = to_millis(now);
    }

    /// Inserts before the live item currently at `position`;
    /// `position == live_len()` appends.
    pub fn insert_item(
        &mut self,
        position: usize,
        item: ChecklistItem,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let index = self.insertion_index(position)?;
        self.items.insert(index, item);
        self.update_at = to_millis(now);
        Ok(())
    }

    /// Physically extracts the live item at `position` (used by moves;
    /// removal-as-deletion goes through `ChecklistItem::mark_deleted`).
    pub fn extract_item(
        &mut self,
        position: usize,
        now: DateTime<Utc>,
    ) -> Result<ChecklistItem, DomainError> {
        let index = self.backing_index(position)?;
        self.update_at = to_millis(now);
        Ok(self.items.remove(index))
    }

    /// Inserts a duplicate of an existing item directly after it.
    pub fn insert_after(&mut self, position: usize, item: ChecklistItem, now: DateTime<Utc>) {
        // position was resolved by the caller; fall back to append if
        // the backing index is somehow gone
        match self.backing_index(position) {
            Ok(index) => self.items.insert(index + 1, item),
            Err(_) => self.items.push(item),
        }
        self.update_at = to_millis(now);
    }

    pub fn skip(&mut self, now: DateTime<Utc>) {
        let now = to_millis(now);
        self.delete_at = now;
        self.update_at = now;
    }

    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.delete_at = NEVER;
        self.update_at = to_millis(now);
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.update_at = to_millis(now);
    }

    /// Deep copy with fresh IDs; live items only, completion-derived
    /// fields reset, skip flag cleared.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ChecklistId::new(),
            title: self.title.clone(),
            items: self.live_items().map(ChecklistItem::duplicate).collect(),
            delete_at: NEVER,
            update_at: NEVER,
        }
    }

    fn backing_index(&self, position: usize) -> Result<usize, DomainError> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_deleted())
            .nth(position)
            .map(|(index, _)| index)
            .ok_or_else(|| DomainError::index_out_of_range("item", position, self.live_len()))
    }

    fn insertion_index(&self, position: usize) -> Result<usize, DomainError> {
        let live_len = self.live_len();
        if position > live_len {
            return Err(DomainError::index_out_of_range(
                "item insertion",
                position,
                live_len,
            ));
        }
        if position == live_len {
            return Ok(self.items.len());
        }
        self.backing_index(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::item::ItemState;

    fn checklist_with(titles: &[&str]) -> Checklist {
        let mut checklist = Checklist::new("Test");
        for title in titles {
            checklist.push_item(ChecklistItem::new(*title), Utc::now());
        }
        checklist
    }

    fn titles(checklist: &Checklist) -> Vec<&str> {
        checklist.live_items().map(|i| i.title()).collect()
    }

    #[test]
    fn positions_skip_deleted_items() {
        let mut checklist = checklist_with(&["a", "b", "c"]);
        checklist
            .item_mut(1)
            .expect("item at 1")
            .mark_deleted(Utc::now());

        assert_eq!(checklist.live_len(), 2);
        assert_eq!(checklist.item(0).expect("item").title(), "a");
        // "c" slides into live position 1 while "b" stays in the vec
        assert_eq!(checklist.item(1).expect("item").title(), "c");
        assert_eq!(checklist.items().len(), 3);
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let checklist = checklist_with(&["a"]);
        let err = checklist.item(1).unwrap_err();
        assert!(matches!(err, DomainError::IndexOutOfRange { .. }));
    }

    #[test]
    fn insert_before_live_position_with_deleted_gap() {
        let mut checklist = checklist_with(&["a", "b", "c"]);
        checklist
            .item_mut(0)
            .expect("item at 0")
            .mark_deleted(Utc::now());

        // live order is now [b, c]; insert at live position 1
        checklist
            .insert_item(1, ChecklistItem::new("x"), Utc::now())
            .expect("insert");

        assert_eq!(titles(&checklist), vec!["b", "x", "c"]);
    }

    #[test]
    fn insert_at_live_len_appends() {
        let mut checklist = checklist_with(&["a"]);
        checklist
            .insert_item(1, ChecklistItem::new("z"), Utc::now())
            .expect("insert");
        assert_eq!(titles(&checklist), vec!["a", "z"]);

        assert!(checklist
            .insert_item(5, ChecklistItem::new("nope"), Utc::now())
            .is_err());
    }

    #[test]
    fn extract_and_reinsert_round_trips() {
        let mut checklist = checklist_with(&["a", "b", "c"]);
        let item = checklist.extract_item(1, Utc::now()).expect("extract");
        assert_eq!(item.title(), "b");
        assert_eq!(titles(&checklist), vec!["a", "c"]);

        checklist.insert_item(1, item, Utc::now()).expect("insert");
        assert_eq!(titles(&checklist), vec!["a", "b", "c"]);
    }

    #[test]
    fn skip_and_restore_toggle_delete_at() {
        let mut checklist = checklist_with(&["a"]);
        assert!(!checklist.is_skipped());

        checklist.skip(Utc::now());
        assert!(checklist.is_skipped());
        // children untouched by checklist-level skip
        assert_eq!(checklist.item(0).expect("item").state(), ItemState::Open);

        checklist.restore(Utc::now());
        assert!(!checklist.is_skipped());
    }

    #[test]
    fn duplicate_copies_live_items_only() {
        let mut checklist = checklist_with(&["a", "b"]);
        checklist
            .item_mut(0)
            .expect("item")
            .mark_deleted(Utc::now());
        checklist.skip(Utc::now());

        let copy = checklist.duplicate();

        assert_ne!(copy.id(), checklist.id());
        assert_eq!(titles(&copy), vec!["b"]);
        assert!(!copy.is_skipped());
        assert_ne!(copy.items()[0].id(), checklist.items()[1].id());
    }
}
