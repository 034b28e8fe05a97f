use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::trace;

use crate::record::RecordCollection;
use crate::view_state::{SortDirection, ViewState};

/// Result of deriving the visible page from a collection and a view state.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Nothing fetched yet, or the fetched collection has no records.
    Loading,
    Page(PageSlice),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSlice {
    /// Indices into the collection, in display order.
    pub rows: Vec<usize>,
    pub filtered_count: usize,
    pub total_pages: usize,
    pub page: usize,
}

impl PageSlice {
    /// The collection has records but the search matched none of them.
    pub fn is_no_match(&self) -> bool {
        self.filtered_count == 0
    }
}

impl QueryResult {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryResult::Loading)
    }

    pub fn page(&self) -> Option<&PageSlice> {
        match self {
            QueryResult::Loading => None,
            QueryResult::Page(slice) => Some(slice),
        }
    }
}

/// Filter, sort and paginate `collection` according to `state`.
pub fn derive(
    collection: Option<&RecordCollection>,
    state: &ViewState,
    page_size: usize,
) -> QueryResult {
    let Some(collection) = collection.filter(|c| !c.is_empty()) else {
        return QueryResult::Loading;
    };
    let page_size = page_size.max(1);

    let mut rows = filter(collection, state.search_text());
    if let Some(field) = state.sort_field() {
        sort(collection, &mut rows, field, state.sort_direction());
    }

    let filtered_count = rows.len();
    let total_pages = filtered_count.div_ceil(page_size);
    let page = state.current_page();
    let start = (page - 1).saturating_mul(page_size).min(filtered_count);
    let end = start.saturating_add(page_size).min(filtered_count);
    trace!(
        "Derived page {}/{} with {} of {} records matching",
        page,
        total_pages,
        filtered_count,
        collection.len()
    );

    QueryResult::Page(PageSlice {
        rows: rows[start..end].to_vec(),
        filtered_count,
        total_pages,
        page,
    })
}

/// Indices of records with at least one field containing `term`, ignoring case.
pub fn filter(collection: &RecordCollection, term: &str) -> Vec<usize> {
    if term.is_empty() {
        return (0..collection.len()).collect();
    }
    let needle = term.to_lowercase();
    let schema = collection.schema();
    collection
        .records()
        .par_iter()
        .enumerate()
        .filter(|(_, record)| record.matches(schema, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// Stable sort of `rows` by the string form of `field`.
pub fn sort(
    collection: &RecordCollection,
    rows: &mut [usize],
    field: &str,
    direction: SortDirection,
) {
    let records = collection.records();
    let mut keyed: Vec<(usize, String)> = rows
        .iter()
        .map(|&idx| (idx, records[idx].get(field).as_text().into_owned()))
        .collect();

    match direction {
        SortDirection::Ascending => keyed.sort_by(|(_, a), (_, b)| collate(a, b)),
        SortDirection::Descending => keyed.sort_by(|(_, a), (_, b)| collate(b, a)),
    }

    for (slot, (idx, _)) in rows.iter_mut().zip(keyed) {
        *slot = idx;
    }
}

/// Dictionary-like order: case folded first, lowercase before uppercase on ties.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}
