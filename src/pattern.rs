//! Hierarchical glob pattern matcher (component C2).
//!
//! `*` matches any substring; `%` matches any substring not crossing the
//! hierarchy separator. Mailbox patterns use the namespace separator;
//! entry patterns use `/`. Grounded on the dynamic-programming matcher in
//! `aero-proto/src/imap/command/authenticated.rs::matches_wildcard`,
//! generalized to a configurable separator plus fixed-prefix extraction.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern<'a> {
    raw: &'a str,
    separator: char,
}

impl<'a> Pattern<'a> {
    pub fn new(raw: &'a str, separator: char) -> Self {
        Self { raw, separator }
    }

    pub fn is_wildcard(&self) -> bool {
        self.raw.contains('*') || self.raw.contains('%')
    }

    /// Characters before the first wildcard character, used to narrow
    /// database scans to a literal prefix (spec invariant 4).
    pub fn fixed_prefix(&self) -> &'a str {
        match self.raw.find(['*', '%']) {
            Some(idx) => &self.raw[..idx],
            None => self.raw,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        matches_wildcard(self.raw, name, self.separator)
    }
}

fn matches_wildcard(wildcard: &str, name: &str, separator: char) -> bool {
    let wildcard = wildcard.chars().collect::<Vec<char>>();
    let name = name.chars().collect::<Vec<char>>();

    let mut matches = vec![vec![false; wildcard.len() + 1]; name.len() + 1];

    for i in 0..=name.len() {
        for j in 0..=wildcard.len() {
            matches[i][j] = (i == 0 && j == 0)
                || (j > 0
                    && matches[i][j - 1]
                    && (wildcard[j - 1] == '%' || wildcard[j - 1] == '*'))
                || (i > 0
                    && j > 0
                    && matches[i - 1][j - 1]
                    && wildcard[j - 1] == name[i - 1]
                    && wildcard[j - 1] != '%'
                    && wildcard[j - 1] != '*')
                || (i > 0
                    && j > 0
                    && matches[i - 1][j]
                    && (wildcard[j - 1] == '*'
                        || (wildcard[j - 1] == '%' && name[i - 1] != separator)));
        }
    }

    matches[name.len()][wildcard.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(Pattern::new("/comment", '/').matches("/comment"));
        assert!(!Pattern::new("/comment", '/').matches("/sort"));
    }

    #[test]
    fn star_crosses_separator() {
        assert!(Pattern::new("*", '/').matches("/vendor/cmu/cyrus-imapd/expire"));
        assert!(Pattern::new("/vendor/*", '/').matches("/vendor/cmu/cyrus-imapd/expire"));
    }

    #[test]
    fn percent_does_not_cross_separator() {
        assert!(!Pattern::new("%", '.').matches("Sent.A"));
        assert!(Pattern::new("Sent.%", '.').matches("Sent.A"));
        assert!(!Pattern::new("Sent.%", '.').matches("Sent.A.B"));
    }

    #[test]
    fn fixed_prefix_extraction() {
        assert_eq!(Pattern::new("/vendor/cmu/*", '/').fixed_prefix(), "/vendor/cmu/");
        assert_eq!(Pattern::new("/comment", '/').fixed_prefix(), "/comment");
        assert_eq!(Pattern::new("*", '/').fixed_prefix(), "");
    }

    #[test]
    fn no_wildcard_detection() {
        assert!(!Pattern::new("/comment", '/').is_wildcard());
        assert!(Pattern::new("/com%ent", '/').is_wildcard());
    }
}
