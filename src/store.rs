//! Result list and user queue.
//!
//! `ResultStore` holds the current search's hits in arrival order plus the
//! continuation cursor. `QueueStore` is the user's hand-picked list; it lives
//! across searches and is deduplicated by video id.

use crate::video::{SearchResultPage, VideoRef};

#[derive(Debug, Default)]
pub struct ResultStore {
  items: Vec<VideoRef>,
  cursor: Option<String>,
  /// Bumped on every `replace`. Index pointers taken under an older generation
  /// no longer refer to the same list.
  generation: u64,
}

impl ResultStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Discard the current list and start over with `page`.
  pub fn replace(&mut self, page: SearchResultPage) {
    self.items = page.items;
    self.cursor = page.cursor;
    self.generation += 1;
  }

  /// Append `page` after the existing items. Existing positions stay valid.
  pub fn append(&mut self, page: SearchResultPage) {
    self.items.extend(page.items);
    self.cursor = page.cursor;
  }

  pub fn index_of(&self, id: &str) -> Option<usize> {
    self.items.iter().position(|v| v.id == id)
  }

  /// Up to `n` items after the one with `id`. When `id` is not in the list the
  /// first `n` items are returned.
  pub fn following(&self, id: &str, n: usize) -> &[VideoRef] {
    let start = self.index_of(id).map_or(0, |i| i + 1);
    let end = (start + n).min(self.items.len());
    &self.items[start.min(end)..end]
  }

  pub fn get(&self, index: usize) -> Option<&VideoRef> {
    self.items.get(index)
  }

  pub fn items(&self) -> &[VideoRef] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn cursor(&self) -> Option<&str> {
    self.cursor.as_deref()
  }

  pub fn has_more(&self) -> bool {
    self.cursor.is_some()
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}

#[derive(Debug, Default)]
pub struct QueueStore {
  items: Vec<VideoRef>,
}

impl QueueStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append `video` unless its id is already queued. Returns whether it was added.
  pub fn enqueue(&mut self, video: VideoRef) -> bool {
    if self.contains(&video.id) {
      return false;
    }
    self.items.push(video);
    true
  }

  pub fn dequeue_at(&mut self, index: usize) -> Option<VideoRef> {
    (index < self.items.len()).then(|| self.items.remove(index))
  }

  /// Remove the entry with `id`, returning the position it occupied.
  pub fn remove_by_id(&mut self, id: &str) -> Option<usize> {
    let index = self.position(id)?;
    self.items.remove(index);
    Some(index)
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  pub fn position(&self, id: &str) -> Option<usize> {
    self.items.iter().position(|v| v.id == id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.position(id).is_some()
  }

  pub fn get(&self, index: usize) -> Option<&VideoRef> {
    self.items.get(index)
  }

  pub fn items(&self) -> &[VideoRef] {
    &self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  pub(crate) fn video(id: &str) -> VideoRef {
    VideoRef::new(id, format!("Title {id}"), "Channel")
  }

  pub(crate) fn page(prefix: &str, count: usize, cursor: Option<&str>) -> SearchResultPage {
    SearchResultPage {
      items: (0..count).map(|i| video(&format!("{prefix}{i}"))).collect(),
      cursor: cursor.map(str::to_string),
    }
  }

  fn ids(items: &[VideoRef]) -> Vec<&str> {
    items.iter().map(|v| v.id.as_str()).collect()
  }

  // --- ResultStore ---

  #[test]
  fn replace_discards_previous_list() {
    let mut store = ResultStore::new();
    store.replace(page("a", 3, Some("T1")));
    store.replace(page("b", 2, None));
    assert_eq!(ids(store.items()), vec!["b0", "b1"]);
    assert!(!store.has_more());
  }

  #[test]
  fn replace_bumps_generation_append_does_not() {
    let mut store = ResultStore::new();
    store.replace(page("a", 3, Some("T1")));
    let generation = store.generation();
    store.append(page("b", 3, None));
    assert_eq!(store.generation(), generation);
    store.replace(page("c", 1, None));
    assert_eq!(store.generation(), generation + 1);
  }

  #[test]
  fn lofi_scroll_appends_second_page() {
    let mut store = ResultStore::new();
    store.replace(page("p1-", 12, Some("T1")));
    let first: Vec<String> = store.items().iter().map(|v| v.id.clone()).collect();
    assert_eq!(store.cursor(), Some("T1"));

    store.append(page("p2-", 12, Some("T2")));
    assert_eq!(store.len(), 24);
    assert_eq!(ids(&store.items()[..12]), first.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(store.get(12).map(|v| v.id.as_str()), Some("p2-0"));
    assert_eq!(store.cursor(), Some("T2"));
  }

  #[test]
  fn append_keeps_duplicates_across_pages() {
    let mut store = ResultStore::new();
    store.replace(SearchResultPage { items: vec![video("x"), video("y")], cursor: Some("T".into()) });
    store.append(SearchResultPage { items: vec![video("y"), video("z")], cursor: None });
    assert_eq!(ids(store.items()), vec!["x", "y", "y", "z"]);
    assert_eq!(store.index_of("y"), Some(1));
  }

  #[test]
  fn empty_page_is_valid() {
    let mut store = ResultStore::new();
    store.replace(page("a", 2, Some("T1")));
    store.append(page("b", 0, None));
    assert_eq!(store.len(), 2);
    assert!(!store.has_more());

    store.replace(page("c", 0, None));
    assert!(store.is_empty());
  }

  #[test]
  fn index_of_missing_id() {
    let mut store = ResultStore::new();
    store.replace(page("a", 2, None));
    assert_eq!(store.index_of("nope"), None);
    assert_eq!(store.index_of("a1"), Some(1));
  }

  #[test]
  fn following_slices_after_the_item() {
    let mut store = ResultStore::new();
    store.replace(page("a", 12, None));
    assert_eq!(ids(store.following("a2", 3)), vec!["a3", "a4", "a5"]);
    assert_eq!(ids(store.following("a10", 9)), vec!["a11"]);
    assert!(store.following("a11", 9).is_empty());
  }

  #[test]
  fn following_unknown_id_starts_at_the_top() {
    let mut store = ResultStore::new();
    store.replace(page("a", 4, None));
    assert_eq!(ids(store.following("zzz", 2)), vec!["a0", "a1"]);
    assert!(ResultStore::new().following("zzz", 9).is_empty());
  }

  // --- QueueStore ---

  #[test]
  fn enqueue_rejects_duplicate_ids() {
    let mut queue = QueueStore::new();
    assert!(queue.enqueue(video("a")));
    assert!(queue.enqueue(video("b")));
    assert!(!queue.enqueue(video("a")));
    assert_eq!(ids(queue.items()), vec!["a", "b"]);
  }

  #[test]
  fn dequeue_and_remove() {
    let mut queue = QueueStore::new();
    for id in ["a", "b", "c"] {
      queue.enqueue(video(id));
    }
    assert_eq!(queue.dequeue_at(1).map(|v| v.id), Some("b".to_string()));
    assert!(queue.dequeue_at(5).is_none());
    assert_eq!(queue.remove_by_id("c"), Some(1));
    assert_eq!(queue.remove_by_id("c"), None);
    assert_eq!(ids(queue.items()), vec!["a"]);
  }

  #[test]
  fn clear_empties_queue() {
    let mut queue = QueueStore::new();
    queue.enqueue(video("a"));
    queue.clear();
    assert!(queue.is_empty());
    assert!(queue.enqueue(video("a")));
  }
}
