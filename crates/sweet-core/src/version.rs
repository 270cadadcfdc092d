// ── Firmware version ordering ──
//
// Versions are compared segment-wise: runs of ASCII digits compare by
// numeric value, everything else compares character by character. This
// orders "1.10.0" after "1.9.0" without requiring strict semver.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use crate::model::Release;

/// Compare two version strings with numeric-aware segment ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let ord = compare_digit_runs(&take_digits(&mut a), &take_digits(&mut b));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                a.next();
                b.next();
            }
        }
    }
}

/// `true` if `version` orders strictly after `other`.
pub fn is_version_higher_than(version: &str, other: &str) -> bool {
    compare_versions(version, other) == Ordering::Greater
}

/// `true` if `version` orders after or equal to `other`.
pub fn is_version_higher_or_equal(version: &str, other: &str) -> bool {
    compare_versions(version, other) != Ordering::Less
}

/// Whether `release` is newer than the running firmware.
///
/// Always `false` while `enabled` is off; the comparison itself stays live
/// so the gate is the only switch.
pub fn update_available(current: &str, release: Option<&Release>, enabled: bool) -> bool {
    let Some(release) = release else {
        return false;
    };
    enabled && is_version_higher_than(&release.version, current)
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

/// Compare decimal digit strings of arbitrary length without parsing.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_digit_minor_is_higher() {
        assert!(is_version_higher_than("1.10.0", "1.9.0"));
        assert!(!is_version_higher_than("1.9.0", "1.10.0"));
    }

    #[test]
    fn equal_versions() {
        assert!(is_version_higher_or_equal("2.0.0", "2.0.0"));
        assert!(!is_version_higher_than("2.0.0", "2.0.0"));
        assert_eq!(compare_versions("0.3.1", "0.3.1"), Ordering::Equal);
    }

    #[test]
    fn longer_version_with_same_prefix_is_higher() {
        assert!(is_version_higher_than("1.2.1", "1.2"));
        assert!(!is_version_higher_or_equal("1.2", "1.2.1"));
    }

    #[test]
    fn leading_zeros_do_not_matter() {
        assert_eq!(compare_versions("1.010", "1.10"), Ordering::Equal);
    }

    #[test]
    fn huge_segments_do_not_overflow() {
        assert!(is_version_higher_than(
            "1.123456789012345678901234567890",
            "1.99999999999999999999"
        ));
    }

    #[test]
    fn update_gate_forces_false() {
        let release = Release::new("9.0.0");
        assert!(!update_available("1.0.0", Some(&release), false));
        assert!(update_available("1.0.0", Some(&release), true));
    }

    #[test]
    fn no_release_means_no_update() {
        assert!(!update_available("1.0.0", None, true));
    }

    #[test]
    fn older_release_is_not_an_update() {
        let release = Release::new("0.9.0");
        assert!(!update_available("1.0.0", Some(&release), true));
    }
}
