/*!
 * Wildcard Matcher
 * Glob matching used by directory listing filters
 */

/// Match a string against a glob pattern.
///
/// Supports `?` (exactly one character) and `*` (zero or more characters,
/// stopping at path separators and never matching a leading dot). With
/// `partial`, the match succeeds as soon as either side is exhausted,
/// which directory listing uses to accept an entry's leading form.
pub fn wildcard_match(s: &str, pattern: &str, partial: bool) -> bool {
    let s: Vec<char> = s.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    match_at(&s, &p, partial)
}

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn match_at(s: &[char], p: &[char], partial: bool) -> bool {
    match p.first() {
        None => s.is_empty() || partial,
        Some('*') => {
            // A star never matches a leading dot implicitly, mirroring
            // hidden-file conventions.
            if s.first() == Some(&'.') {
                return false;
            }
            let mut i = 0;
            loop {
                if match_at(&s[i..], &p[1..], partial) {
                    return true;
                }
                if i >= s.len() || is_separator(s[i]) {
                    return false;
                }
                i += 1;
            }
        }
        Some('?') => {
            if s.is_empty() {
                return partial;
            }
            match_at(&s[1..], &p[1..], partial)
        }
        Some(&lit) => {
            if s.is_empty() {
                return partial;
            }
            s[0] == lit && match_at(&s[1..], &p[1..], partial)
        }
    }
}
