//! Dotted numeric version comparison.
//!
//! Versions are split on `.` and compared component-wise as unsigned
//! integers, padding the shorter side with zeros. Only the leading digit run
//! of a component counts: `"3-beta"` reads as `3`, `"rc1"` as `0`.
//! Pre-release and build-metadata qualifiers are not interpreted.

use std::cmp::Ordering;

/// Compare two dotted version strings.
pub fn compare_versions(v1: &str, v2: &str) -> Ordering {
    let a: Vec<u64> = v1.split('.').map(component_value).collect();
    let b: Vec<u64> = v2.split('.').map(component_value).collect();

    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn component_value(component: &str) -> u64 {
    let trimmed = component.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    // Saturate oversized components rather than collapsing them to zero.
    trimmed[..end]
        .parse::<u64>()
        .unwrap_or(if end == 0 { 0 } else { u64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_are_implicit() {
        assert_eq!(compare_versions("1.2.0", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1", "1.0.0.0"), Ordering::Equal);
    }

    #[test]
    fn first_difference_wins() {
        assert_eq!(compare_versions("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
    }

    #[test]
    fn non_numeric_components_read_as_leading_digits() {
        assert_eq!(compare_versions("3-beta", "3"), Ordering::Equal);
        assert_eq!(compare_versions("latest", "0"), Ordering::Equal);
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
        assert_eq!(compare_versions("1.rc1", "1.0"), Ordering::Equal);
    }

    #[test]
    fn huge_components_saturate() {
        assert_eq!(
            compare_versions("99999999999999999999999", "1"),
            Ordering::Greater
        );
    }
}
