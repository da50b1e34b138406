use std::cmp::Ordering;

/// Compare two strings in natural order: runs of ASCII digits compare
/// numerically, everything else compares case-insensitively character by
/// character. Ties are broken by the raw strings so the ordering is total.
///
/// `"disk 2" < "disk 10"`, unlike plain lexicographic order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_digits(&mut ai);
                    let nb = take_digits(&mut bi);
                    let ord = cmp_digit_runs(&na, &nb);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                } else {
                    let la = ca.to_ascii_lowercase();
                    let lb = cb.to_ascii_lowercase();
                    if la != lb {
                        return la.cmp(&lb);
                    }
                    ai.next();
                    bi.next();
                }
            }
        }
    }
}

fn take_digits(iter: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = iter.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        iter.next();
    }
    run
}

/// Compare two digit runs numerically without parsing, so arbitrarily long
/// runs cannot overflow: strip leading zeros, then compare by length and
/// lexicographically.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_runs() {
        assert_eq!(natural_cmp("disk 2", "disk 10"), Ordering::Less);
        assert_eq!(natural_cmp("disk 10", "disk 2"), Ordering::Greater);
        assert_eq!(natural_cmp("disk 2", "disk 2"), Ordering::Equal);
    }

    #[test]
    fn test_leading_zeros() {
        // 02 and 2 are numerically equal; the raw-string tiebreak keeps
        // the ordering total.
        assert_eq!(natural_cmp("track 02", "track 2"), Ordering::Less);
        assert_ne!(natural_cmp("track 02", "track 2"), Ordering::Equal);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(natural_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(natural_cmp("PACMAN b", "pacman a"), Ordering::Greater);
    }

    #[test]
    fn test_huge_numbers_do_not_overflow() {
        let a = "v99999999999999999999999999999999999999";
        let b = "v100000000000000000000000000000000000000";
        assert_eq!(natural_cmp(a, b), Ordering::Less);
    }

    #[test]
    fn test_prefix_ordering() {
        assert_eq!(natural_cmp("game", "game (usa)"), Ordering::Less);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }
}
