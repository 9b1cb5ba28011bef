//! The loaded catalog plus the search and category filters applied to it.
//!
//! `visible` is always recomputed from `(records, search, category, hidden)`;
//! nothing reads state back out of the rendered grid.

use std::collections::HashSet;

use crate::manifest::VideoRecord;

/// Category names compare case-insensitively everywhere (Unicode folding).
fn same_category(a: &str, b: &str) -> bool {
  a == b || a.to_lowercase() == b.to_lowercase()
}

/// Category tab selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
  #[default]
  All,
  Named(String),
}

impl CategoryFilter {
  /// `"all"` (any case) or an empty name selects every category.
  pub fn parse(name: &str) -> Self {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("all") {
      CategoryFilter::All
    } else {
      CategoryFilter::Named(name.to_string())
    }
  }

  pub fn label(&self) -> &str {
    match self {
      CategoryFilter::All => "All",
      CategoryFilter::Named(name) => name.as_str(),
    }
  }

  pub fn matches(&self, record: &VideoRecord) -> bool {
    match self {
      CategoryFilter::All => true,
      CategoryFilter::Named(name) => record.category.as_deref().is_some_and(|c| same_category(c, name)),
    }
  }

  /// Whether two selections pick the same tab.
  pub fn same_tab(&self, other: &CategoryFilter) -> bool {
    match (self, other) {
      (CategoryFilter::All, CategoryFilter::All) => true,
      (CategoryFilter::Named(a), CategoryFilter::Named(b)) => same_category(a, b),
      _ => false,
    }
  }
}

/// Why the visible set is empty, if it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
  /// Nothing loaded at all.
  EmptyCatalog,
  /// The search term matched nothing.
  NoSearchResults,
  /// No search term, but the selected category has no (visible) members.
  EmptyCategory,
}

/// Case-insensitive title match. An empty term matches everything.
pub fn matches_search(record: &VideoRecord, term: &str) -> bool {
  term.is_empty() || record.title.to_lowercase().contains(&term.to_lowercase())
}

/// Indices of the records that pass every filter, in catalog order.
pub fn visible_indices(
  records: &[VideoRecord],
  search: &str,
  category: &CategoryFilter,
  hidden: &HashSet<String>,
) -> Vec<usize> {
  records
    .iter()
    .enumerate()
    .filter(|(_, r)| !hidden.contains(r.key()) && category.matches(r) && matches_search(r, search))
    .map(|(i, _)| i)
    .collect()
}

#[derive(Debug, Default)]
pub struct CatalogView {
  records: Vec<VideoRecord>,
  search: String,
  category: CategoryFilter,
  /// Keys of records the availability probe reported missing.
  hidden: HashSet<String>,
  visible: Vec<usize>,
}

impl CatalogView {
  pub fn new(records: Vec<VideoRecord>) -> Self {
    let mut view = Self { records, ..Self::default() };
    view.recompute();
    view
  }

  fn recompute(&mut self) {
    self.visible = visible_indices(&self.records, &self.search, &self.category, &self.hidden);
  }

  /// Swap in a freshly loaded catalog. The search term survives; a category
  /// that no longer exists falls back to `All`.
  pub fn replace(&mut self, records: Vec<VideoRecord>) {
    self.records = records;
    self.hidden.clear();
    if let CategoryFilter::Named(ref name) = self.category
      && !self.categories().iter().any(|c| same_category(c, name))
    {
      self.category = CategoryFilter::All;
    }
    self.recompute();
  }

  pub fn set_search(&mut self, term: &str) {
    self.search = term.to_string();
    self.recompute();
  }

  pub fn set_category(&mut self, category: CategoryFilter) {
    self.category = category;
    self.recompute();
  }

  /// Hide a record by key. Returns `true` if the visible set changed.
  pub fn hide(&mut self, key: &str) -> bool {
    if !self.hidden.insert(key.to_string()) {
      return false;
    }
    let before = self.visible.len();
    self.recompute();
    before != self.visible.len()
  }

  pub fn records(&self) -> &[VideoRecord] {
    &self.records
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn category(&self) -> &CategoryFilter {
    &self.category
  }

  pub fn hidden_count(&self) -> usize {
    self.records.iter().filter(|r| self.hidden.contains(r.key())).count()
  }

  pub fn visible_len(&self) -> usize {
    self.visible.len()
  }

  /// The `n`th visible record.
  pub fn visible_record(&self, n: usize) -> Option<&VideoRecord> {
    self.visible.get(n).and_then(|&i| self.records.get(i))
  }

  pub fn visible(&self) -> impl Iterator<Item = &VideoRecord> + '_ {
    self.visible.iter().filter_map(|&i| self.records.get(i))
  }

  /// Distinct category names in first-seen order; names differing only in
  /// case collapse into the first spelling.
  pub fn categories(&self) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in self.records.iter().filter_map(|r| r.category.as_deref()) {
      if !seen.iter().any(|s| same_category(s, name)) {
        seen.push(name.to_string());
      }
    }
    seen
  }

  /// Tab list: `All` followed by each category.
  pub fn category_tabs(&self) -> Vec<CategoryFilter> {
    std::iter::once(CategoryFilter::All).chain(self.categories().into_iter().map(CategoryFilter::Named)).collect()
  }

  /// Move the category selection by `delta` tabs, wrapping around.
  pub fn cycle_category(&mut self, delta: isize) {
    let tabs = self.category_tabs();
    let current = tabs.iter().position(|t| t.same_tab(&self.category)).unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(tabs.len() as isize) as usize;
    self.set_category(tabs[next].clone());
  }

  pub fn empty_state(&self) -> Option<EmptyState> {
    if !self.visible.is_empty() {
      return None;
    }
    if !self.search.is_empty() {
      Some(EmptyState::NoSearchResults)
    } else if self.category != CategoryFilter::All {
      Some(EmptyState::EmptyCategory)
    } else {
      Some(EmptyState::EmptyCatalog)
    }
  }
}
