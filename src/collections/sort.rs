use crate::core::{DbError, Result, SortKey, SortOrder, SortSpec};

/// Parse `sort_by` parameters into a sort specification.
///
/// A leading `-` sorts descending, a leading `+` sorts ascending, no prefix
/// sorts ascending. The two prefixes are deliberately distinct; see
/// DESIGN.md. An empty list falls back to `_id` ascending.
pub fn parse_sort_by(sort_by: &[String]) -> Result<SortSpec> {
    if sort_by.is_empty() {
        return Ok(SortSpec::default());
    }

    let mut keys = Vec::with_capacity(sort_by.len());
    for raw in sort_by {
        let (name, order) = match raw.strip_prefix('-') {
            Some(rest) => (rest, SortOrder::Descending),
            None => (raw.strip_prefix('+').unwrap_or(raw), SortOrder::Ascending),
        };
        if name.is_empty() {
            return Err(DbError::InvalidSortField(raw.clone()));
        }
        let key = if name == "_id" {
            SortKey::Id
        } else {
            SortKey::Field(name.to_string())
        };
        keys.push((key, order));
    }
    Ok(SortSpec(keys))
}
