use crate::engine::Surface;

/// Everything the user can ask for. Key and mouse handlers produce these; the
/// app consumes them in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  // --- Search ---
  /// Run a fresh query with the text in the search box.
  Search,
  LoadMore,
  CycleRating,
  CycleContentType,

  // --- Playback ---
  /// Play the result at this index: in the mini player if it is showing, else in the modal.
  PlayResult(usize),
  PlayQueued(usize),
  /// Play the n-th recommendation shown under the modal.
  PlayRecommendation(usize),
  Next,
  Prev,
  TogglePause,

  // --- Queue ---
  Enqueue(usize),
  EnqueueCurrent,
  Dequeue(usize),
  /// Take the result at this index back out of the queue.
  Unqueue(usize),
  ClearQueue,

  // --- Surfaces ---
  /// Hand the modal's playback over to the mini player.
  Minimize,
  /// Hand the mini player's playback over to the modal.
  Expand,
  Close(Surface),
  /// Reopen the last played video after everything was closed.
  Resume,
  ToggleDescription,

  NextTheme,
  Quit,
}
