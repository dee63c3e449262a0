//! Contract identifier sequence derived from one starting identifier.
//!
//! A trailing run of ASCII digits is incremented in place, keeping its
//! zero-padded width and growing when the value needs more digits. An
//! identifier without trailing digits is used as-is for the first contract and
//! gets a `-2`, `-3`, ... suffix for the following ones.

/// Returns the identifier at position `n` (0-based) of the sequence starting at `start`.
pub fn nth(start: &str, n: usize) -> String {
    let stem = start.trim_end_matches(|character: char| character.is_ascii_digit());
    let digits = &start[stem.len()..];
    if !digits.is_empty() {
        format!("{stem}{}", add_decimal(digits, n))
    } else if n == 0 {
        start.to_owned()
    } else {
        format!("{start}-{}", n + 1)
    }
}

/// Returns the first `count` identifiers of the sequence starting at `start`.
pub fn take(start: &str, count: usize) -> Vec<String> {
    (0..count).map(|n| nth(start, n)).collect()
}

/// Adds `n` to a decimal digit string of any length.
/// Leading zeros are kept; the result widens when it carries past the first digit.
fn add_decimal(digits: &str, n: usize) -> String {
    let mut carry = n as u128;
    let mut reversed = Vec::<char>::with_capacity(digits.len() + 1);
    for byte in digits.bytes().rev() {
        let sum = u128::from(byte - b'0') + carry;
        reversed.push(to_digit(sum % 10));
        carry = sum / 10;
    }
    while carry > 0 {
        reversed.push(to_digit(carry % 10));
        carry /= 10;
    }
    reversed.into_iter().rev().collect()
}

#[inline]
fn to_digit(value: u128) -> char {
    char::from(b'0' + value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn nth_identity() {
        assert_eq!(nth("CT-001", 0), "CT-001");
        assert_eq!(nth("0000", 0), "0000");
        assert_eq!(nth("CT", 0), "CT");
    }

    #[test]
    fn nth_keeps_width() {
        assert_eq!(nth("X-098", 5), "X-103");
        assert_eq!(take("CT-001", 3), ["CT-001", "CT-002", "CT-003"]);
    }

    #[test]
    fn nth_grows_width() {
        assert_eq!(nth("X-998", 5), "X-1003");
        assert_eq!(nth("9", 1), "10");
    }

    #[test]
    fn nth_keeps_prefix_separators() {
        assert_eq!(nth("สัญญา/2567-09", 1), "สัญญา/2567-10");
        assert_eq!(nth("A1B2", 3), "A1B5");
    }

    #[test]
    fn nth_does_not_overflow() {
        let start = "ID-99999999999999999999999999999999999999999";
        assert_eq!(nth(start, 1), "ID-100000000000000000000000000000000000000000");
        assert_eq!(nth("ID-0", usize::MAX), format!("ID-{}", usize::MAX));
    }

    #[test]
    fn nth_without_digits() {
        assert_eq!(nth("CONTRACT", 1), "CONTRACT-2");
        assert_eq!(nth("CONTRACT", 2), "CONTRACT-3");

        let identifiers = take("CONTRACT", 50);
        let unique: HashSet<&String> = identifiers.iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn nth_ignores_non_ascii_digits() {
        // Thai digits are not incremented
        assert_eq!(nth("เลขที่๑", 1), "เลขที่๑-2");
    }

    #[test]
    fn nth_empty_start() {
        assert_eq!(nth("", 0), "");
        assert_eq!(nth("", 1), "-2");
    }
}
