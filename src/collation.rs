//! Name folding for uniqueness checks.
//!
//! Usernames and record titles are compared case- and accent-insensitively.
//! The folded form is stored next to the original value in a `UNIQUE` column,
//! so the database is the final judge of duplicates.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Fold a name into its comparison key: NFKD, strip combining marks, lowercase, trim.
pub fn fold(name: &str) -> String {
    name.trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
