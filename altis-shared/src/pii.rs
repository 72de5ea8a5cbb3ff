use serde::{Serialize, Deserialize, Serializer};
use std::fmt;

/// A wrapper for personal data (emails, national IDs) that hides its value in
/// Debug and Display output. Serialization passes the real value through so the
/// document store and API responses keep working.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Masked(value)
    }
}

/// Masks a document number for log lines, keeping only the last two characters.
/// `"52998224725"` becomes `"*********25"`.
pub fn mask_document(document: &str) -> String {
    let visible = 2;
    let len = document.chars().count();
    if len <= visible {
        return "*".repeat(len);
    }
    document
        .chars()
        .enumerate()
        .map(|(i, c)| if i < len - visible { '*' } else { c })
        .collect()
}
