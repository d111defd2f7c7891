use std::fmt;

use serde::{Serialize, Serializer};

use super::resource_type::ResourceType;

/// Live state reported in `ls_state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum State {
    Up,
    Down,
    Unreachable,
    Ok,
    Warning,
    Critical,
    Unknown,
    Pending,
    Other(String),
}

impl State {
    /// Whether this state counts as a failure for a record of `kind`.
    ///
    /// Hosts fail when DOWN or UNREACHABLE; services when WARNING,
    /// CRITICAL, UNKNOWN or UNREACHABLE. PENDING is never a failure.
    pub fn is_failure_for(&self, kind: ResourceType) -> bool {
        match kind {
            ResourceType::Host => matches!(self, Self::Down | Self::Unreachable),
            ResourceType::Service => matches!(
                self,
                Self::Warning | Self::Critical | Self::Unknown | Self::Unreachable
            ),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Unreachable => "UNREACHABLE",
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
            Self::Pending => "PENDING",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "UNREACHABLE" => Self::Unreachable,
            "OK" => Self::Ok,
            "WARNING" => Self::Warning,
            "CRITICAL" => Self::Critical,
            "UNKNOWN" => Self::Unknown,
            "PENDING" => Self::Pending,
            _ => Self::Other(s.to_owned()),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(State::from("down"), State::Down);
        assert_eq!(State::from("Critical"), State::Critical);
        assert_eq!(State::from("FLAPPING"), State::Other("FLAPPING".into()));
    }

    #[test]
    fn failure_states_depend_on_kind() {
        assert!(State::Down.is_failure_for(ResourceType::Host));
        assert!(!State::Warning.is_failure_for(ResourceType::Host));
        assert!(State::Warning.is_failure_for(ResourceType::Service));
        assert!(State::Unreachable.is_failure_for(ResourceType::Service));
        assert!(!State::Pending.is_failure_for(ResourceType::Service));
        assert!(!State::Down.is_failure_for(ResourceType::Daemon));
    }
}
