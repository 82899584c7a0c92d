//! Fully-qualified construct addresses.

use std::fmt;

use itertools::Itertools;

/// Separator between local names in a rendered address.
pub const SEPARATOR: &str = "/";

/// Root-to-node path of local names. The root itself has an empty address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Vec<String>);

impl Address {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Address of a child named `name` below `self`.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Last local name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.iter().join(SEPARATOR))
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Address {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
