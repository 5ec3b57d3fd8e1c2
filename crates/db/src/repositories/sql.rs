//! SQL fragments shared by the project and task repositories.

use taskboard_core::status::Priority;

/// Predicate: the project aliased `p` is owned by, or shared with, the user
/// bound at parameter `$idx`.
pub(crate) fn accessible_project(idx: u32) -> String {
    format!(
        "(p.owner_id = ${idx} OR EXISTS (\
            SELECT 1 FROM project_members pm \
            WHERE pm.project_id = p.id AND pm.user_id = ${idx}))"
    )
}

/// `CASE` expression ranking a priority column so it sorts Low < Urgent.
pub(crate) fn priority_rank(column: &str) -> String {
    let arms: String = Priority::ALL
        .iter()
        .map(|p| format!(" WHEN '{}' THEN {}", p.as_str(), p.rank()))
        .collect();
    format!("(CASE {column}{arms} END)")
}

/// Predicate: `pattern` at `$idx` matches the title, description or any tag
/// of the row aliased `alias`.
pub(crate) fn text_search(alias: &str, idx: u32) -> String {
    format!(
        "({alias}.title ILIKE ${idx} OR {alias}.description ILIKE ${idx} \
         OR EXISTS (SELECT 1 FROM unnest({alias}.tags) AS tag WHERE tag ILIKE ${idx}))"
    )
}
