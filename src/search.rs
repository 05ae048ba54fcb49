//! Property search over a board listing.

use crate::monday::types::BoardItem;

/// Filter items by a free-text term.
///
/// A blank term returns every item. Otherwise an item matches when its name
/// contains the term (case-insensitive) or its id contains it. Listing order
/// is kept.
pub fn search_items<'a>(items: &'a [BoardItem], term: &str) -> Vec<&'a BoardItem> {
  let term = term.trim().to_lowercase();
  if term.is_empty() {
    return items.iter().collect();
  }

  items
    .iter()
    .filter(|item| item.name.to_lowercase().contains(&term) || item.id.contains(&term))
    .collect()
}
