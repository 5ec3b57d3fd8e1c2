//! Listing contracts shared by the project and task list endpoints:
//! sortable fields, sort direction, free-text search and the `assignedTo`
//! filter.

use crate::error::CoreError;
use crate::status::define_string_enum;
use crate::types::DbId;

define_string_enum! {
    /// Sort direction (`?order=`).
    SortOrder ("sort order", default = Desc) {
        Asc => "asc",
        Desc => "desc",
    }
}

define_string_enum! {
    /// Sortable project fields (`?sortBy=`).
    ProjectSortField ("project sort field", default = CreatedAt) {
        CreatedAt => "createdAt",
        UpdatedAt => "updatedAt",
        Title => "title",
        Status => "status",
        Priority => "priority",
        Progress => "progress",
        StartDate => "startDate",
        DueDate => "dueDate",
    }
}

define_string_enum! {
    /// Sortable task fields (`?sortBy=`).
    TaskSortField ("task sort field", default = CreatedAt) {
        CreatedAt => "createdAt",
        UpdatedAt => "updatedAt",
        Title => "title",
        Status => "status",
        Priority => "priority",
        Progress => "progress",
        DueDate => "dueDate",
    }
}

/// A resolved `sortBy` + `order` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort<F> {
    pub field: F,
    pub order: SortOrder,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Maximum accepted length of a free-text search term.
pub const MAX_SEARCH_LEN: usize = 100;

/// Build a case-insensitive `ILIKE` substring pattern from user input.
///
/// Returns `None` for blank input. `%`, `_` and `\` are escaped so they match
/// literally.
pub fn search_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars().take(MAX_SEARCH_LEN) {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// The `assignedTo` query filter: a user id or the literal `me`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    Me,
    User(DbId),
}

impl AssigneeFilter {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("me") {
            return Ok(AssigneeFilter::Me);
        }
        raw.parse::<DbId>().map(AssigneeFilter::User).map_err(|_| {
            CoreError::invalid_field("assignedTo", "assignedTo must be a user id or 'me'")
        })
    }

    pub fn resolve(self, requester: DbId) -> DbId {
        match self {
            AssigneeFilter::Me => requester,
            AssigneeFilter::User(id) => id,
        }
    }
}
