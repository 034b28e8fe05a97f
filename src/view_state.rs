use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ascending"),
            SortDirection::Descending => write!(f, "descending"),
        }
    }
}

/// User controlled parameters of the table: search, sort and page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search_text: String,
    sort_field: Option<String>,
    sort_direction: SortDirection,
    current_page: usize, // 1-based
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            sort_field: None,
            sort_direction: SortDirection::Ascending,
            current_page: 1,
        }
    }
}

impl ViewState {
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_field.as_deref()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.current_page = 1;
    }

    /// A new field starts ascending, the current field flips direction.
    pub fn toggle_sort(&mut self, field: &str) {
        if self.sort_field.as_deref() == Some(field) {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_field = Some(field.to_string());
            self.sort_direction = SortDirection::Ascending;
        }
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Returns true if the page changed.
    pub fn clamp_page(&mut self, total_pages: usize) -> bool {
        let clamped = self.current_page.min(total_pages.max(1));
        let changed = clamped != self.current_page;
        self.current_page = clamped;
        changed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
