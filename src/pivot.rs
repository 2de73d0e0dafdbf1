//! Pivot-table columns: one counting field spread across one column per enum member.

use crate::{
    error::{IssueCollector, ValidationError},
    record::{Counts, RawRow},
    schema::EnumDef,
};

/// Folds the member columns of `row` into a [`Counts`]. A member whose column is missing counts
/// as zero; a present column must hold a non-negative integer. Columns that are not members are
/// not inspected. Failures are attributed to the member's column name and aggregated.
pub fn collect(row: &RawRow, members: &EnumDef) -> Result<Counts, ValidationError> {
    let mut issues = IssueCollector::default();
    let mut counts = Counts::new();
    for member in members.members() {
        let count = match row.get(member) {
            None => 0,
            Some(text) => match parse_count(text) {
                Ok(count) => count,
                Err(reason) => {
                    issues.push(member.as_str(), reason);
                    continue;
                }
            },
        };
        counts.set(member.as_str(), count);
    }
    issues.finish(counts)
}

/// Spreads `counts` into `(member, count)` columns in enum declaration order, emitting zero for
/// members without an entry. Keys that are not members are dropped.
pub fn expand(counts: &Counts, members: &EnumDef) -> Vec<(String, u64)> {
    members
        .members()
        .iter()
        .map(|member| (member.clone(), counts.get(member)))
        .collect()
}

/// Keys of `counts` that are not members of the enum.
pub fn unknown_keys<'a>(counts: &'a Counts, members: &EnumDef) -> Vec<&'a str> {
    counts.keys().filter(|key| !members.contains(key)).collect()
}

fn parse_count(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty value is not a valid count".to_string());
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| format!("failed to parse '{text}' as a non-negative integer count"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases() -> EnumDef {
        EnumDef::new("Base", ["A", "C", "G", "T"])
    }

    #[test]
    fn collect_reads_every_member_column() {
        let row: RawRow = [("A", "10"), ("C", "5"), ("G", "3"), ("T", "2")]
            .into_iter()
            .collect();
        let counts = collect(&row, &bases()).unwrap();
        assert_eq!(counts.get("A"), 10);
        assert_eq!(counts.get("C"), 5);
        assert_eq!(counts.get("G"), 3);
        assert_eq!(counts.get("T"), 2);
    }

    #[test]
    fn collect_defaults_missing_members_to_zero() {
        let row: RawRow = [("A", "10")].into_iter().collect();
        let counts = collect(&row, &bases()).unwrap();
        assert_eq!(counts.get("A"), 10);
        for member in ["C", "G", "T"] {
            assert_eq!(counts.get(member), 0);
        }
        assert_eq!(counts.keys().count(), 4);
    }

    #[test]
    fn collect_attributes_failures_to_columns() {
        let row: RawRow = [("A", "ten"), ("C", "-1"), ("G", ""), ("T", "2")]
            .into_iter()
            .collect();
        let err = collect(&row, &bases()).unwrap_err();
        assert_eq!(err.fields().collect::<Vec<_>>(), vec!["A", "C", "G"]);
    }

    #[test]
    fn collect_ignores_unrelated_columns_and_leaves_row_intact() {
        let row: RawRow = [("name", "x"), ("A", "1"), ("N", "9")].into_iter().collect();
        let before = row.clone();
        let counts = collect(&row, &bases()).unwrap();
        assert_eq!(counts.get("A"), 1);
        assert_eq!(row, before);
    }

    #[test]
    fn expand_emits_all_members_in_order() {
        let counts: Counts = [("G", 3), ("A", 1)].into_iter().collect();
        let columns = expand(&counts, &bases());
        assert_eq!(
            columns,
            vec![
                ("A".to_string(), 1),
                ("C".to_string(), 0),
                ("G".to_string(), 3),
                ("T".to_string(), 0),
            ]
        );
    }

    #[test]
    fn unknown_keys_are_reported() {
        let counts: Counts = [("A", 1), ("N", 2)].into_iter().collect();
        assert_eq!(unknown_keys(&counts, &bases()), vec!["N"]);
    }
}
