//! Typed Gram-matrix entry identifiers.
//!
//! Gram entries cross the text boundary as `l_<id>_<row>_<col>` symbols;
//! everywhere else they travel as [`GramEntry`] values. The symmetric
//! aliasing (entry `(i, j)` and `(j, i)` are the same unknown) is baked in
//! by canonicalizing to `row <= col` at construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SdpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GramEntry {
    pub id: usize,
    pub row: usize,
    pub col: usize,
}

impl GramEntry {
    pub fn new(id: usize, row: usize, col: usize) -> Self {
        Self {
            id,
            row: row.min(col),
            col: row.max(col),
        }
    }

    /// The symbol name this entry is interned under.
    pub fn name(&self) -> String {
        format!("l_{}_{}_{}", self.id, self.row, self.col)
    }

    /// Name of the whole matrix this entry belongs to.
    pub fn matrix_name(id: usize) -> String {
        format!("l_{id}")
    }

    /// True for names in the Gram namespace. The `l_` prefix is reserved:
    /// a user-declared symbol that also parses as `l_<id>_<row>_<col>`
    /// would be routed into a matrix entry instead of a free scalar, so
    /// callers generating symbols must keep user names out of this prefix.
    pub fn is_gram_name(name: &str) -> bool {
        name.starts_with("l_")
    }

    /// Parses `l_<id>_<row>_<col>` back into an entry.
    pub fn parse(name: &str) -> Result<Self, SdpError> {
        let bad = || SdpError::BadGramName(name.to_string());
        let mut parts = name.split('_');
        if parts.next() != Some("l") {
            return Err(bad());
        }
        let id = parts.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        let row = parts.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        let col = parts.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Self::new(id, row, col))
    }
}

impl fmt::Display for GramEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn name_round_trips() {
        let entry = GramEntry::new(3, 0, 2);
        assert_eq!(entry.name(), "l_3_0_2");
        assert_eq!(GramEntry::parse("l_3_0_2").expect("parse"), entry);
    }

    #[test]
    fn transposed_indices_alias() {
        assert_eq!(GramEntry::new(1, 2, 0), GramEntry::new(1, 0, 2));
        assert_eq!(GramEntry::new(1, 2, 0).name(), "l_1_0_2");
    }

    #[test]
    fn coefficient_names_are_not_gram_names() {
        assert!(!GramEntry::is_gram_name("_coeff_0_1_T"));
        assert!(GramEntry::parse("_coeff_0_1_T").is_err());
    }

    #[test]
    fn short_and_long_names_are_rejected() {
        assert!(GramEntry::parse("l_1_2").is_err());
        assert!(GramEntry::parse("l_1_2_3_4").is_err());
        assert!(GramEntry::parse("lvar").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn parse_inverts_name(id in 0usize..100, row in 0usize..20, col in 0usize..20) {
            let entry = GramEntry::new(id, row, col);
            let parsed = GramEntry::parse(&entry.name()).expect("parse own name");
            prop_assert_eq!(parsed, entry);
            prop_assert!(parsed.row <= parsed.col);
        }
    }
}
