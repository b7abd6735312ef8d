//! Job command line.

use serde::{Deserialize, Deserializer, Serialize};

/// Executable followed by its argument templates.
///
/// Definitions may give either a single string or a list; both normalise
/// to a sequence here so nothing downstream cares which form was used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Command(Vec<String>);

impl Command {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// The executable, if any.
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Argument templates following the executable.
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Command {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<Vec<String>> for Command {
    fn from(parts: Vec<String>) -> Self {
        Self(parts)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommand {
    Single(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawCommand::deserialize(deserializer)? {
            RawCommand::Single(program) => Self(vec![program]),
            RawCommand::List(parts) => Self(parts),
        })
    }
}
