//! Who may register.

use std::collections::HashSet;

#[derive(Clone, Debug)]
pub enum AdmissionPolicy {
    /// Anyone may register.
    Open,
    /// Only holders of one of these keys.
    Keys(HashSet<String>),
}

impl AdmissionPolicy {
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn admits(&self, key: &str) -> bool {
        match self {
            Self::Open => true,
            Self::Keys(keys) => keys.contains(key),
        }
    }
}
