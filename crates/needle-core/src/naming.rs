//! Folder key / package name conversions and the count ordering used by reports.

use std::cmp::Ordering;

use crate::types::ROOT_KEY;

/// `/sub/dir` -> `sub/dir`; the root key stays `/`.
pub fn node_to_package_name(node: &str) -> String {
    let name = node.trim_start_matches('/');
    if name.is_empty() {
        ROOT_KEY.to_string()
    } else {
        name.to_string()
    }
}

/// `sub/dir` -> `/sub/dir`; `/` and `""` map to the root key.
pub fn package_to_node_name(package: &str) -> String {
    let name = package.trim_start_matches('/');
    format!("/{name}")
}

/// Count descending, then name ascending.
pub fn count_desc_then_name<N: Ord>(a: &(N, usize), b: &(N, usize)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Sort `(name, count)` rows by count descending with an alphabetic tiebreak.
pub fn sort_desc_count<N: Ord>(rows: &mut [(N, usize)]) {
    rows.sort_by(count_desc_then_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_to_package_name() {
        assert_eq!(node_to_package_name("/"), "/");
        assert_eq!(node_to_package_name("/internal/db"), "internal/db");
        assert_eq!(node_to_package_name(""), "/");
    }

    #[test]
    fn test_package_to_node_name() {
        assert_eq!(package_to_node_name("internal/db"), "/internal/db");
        assert_eq!(package_to_node_name("/"), "/");
        assert_eq!(package_to_node_name(""), "/");
    }

    #[test]
    fn test_names_round_trip_for_sub_packages() {
        let node = "/cmd/needle";
        assert_eq!(package_to_node_name(&node_to_package_name(node)), node);
    }

    #[test]
    fn test_sort_desc_count_ties_break_by_name() {
        let mut rows = vec![("zeta", 2), ("alpha", 2), ("mid", 5), ("beta", 0)];
        sort_desc_count(&mut rows);
        assert_eq!(
            rows,
            vec![("mid", 5), ("alpha", 2), ("zeta", 2), ("beta", 0)]
        );
    }
}
