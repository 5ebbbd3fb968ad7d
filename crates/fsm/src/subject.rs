//! Subject grammar.
//!
//! ```text
//! service.<create|delete|patch|import>            inbound commands
//! service.<create|delete|import>.<done|error>     terminal subjects
//! <type>.<create|update|delete|find>              outbound commands
//! <type>.<create|update|delete|find>.<done|error> worker outcomes
//! ```

use std::fmt;

use domain::{ResourceType, Stage};

use crate::error::{FsmError, Result};

/// The reserved first segment of service-level subjects.
pub const SERVICE: &str = "service";

/// Verb of a resource subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Update,
    Delete,
    Find,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
            Verb::Find => "find",
        }
    }

    /// Returns the reconciliation stage this verb drives, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Verb::Create => Some(Stage::Create),
            Verb::Update => Some(Stage::Update),
            Verb::Delete => Some(Stage::Delete),
            Verb::Find => None,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Verb::Create),
            "update" => Some(Verb::Update),
            "delete" => Some(Verb::Delete),
            "find" => Some(Verb::Find),
            _ => None,
        }
    }
}

/// Verb of a `service.*` subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCommand {
    Create,
    Delete,
    Patch,
    Import,
}

impl ServiceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCommand::Create => "create",
            ServiceCommand::Delete => "delete",
            ServiceCommand::Patch => "patch",
            ServiceCommand::Import => "import",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ServiceCommand::Create),
            "delete" => Some(ServiceCommand::Delete),
            "patch" => Some(ServiceCommand::Patch),
            "import" => Some(ServiceCommand::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Done,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "done" => Some(Outcome::Done),
            "error" => Some(Outcome::Error),
            _ => None,
        }
    }
}

/// A parsed subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// `service.<command>`
    Service(ServiceCommand),
    /// `service.<command>.<outcome>`
    Terminal(ServiceCommand, Outcome),
    /// `<type>.<verb>`
    Command(ResourceType, Verb),
    /// `<type>.<verb>.<outcome>`
    Result(ResourceType, Verb, Outcome),
}

impl Subject {
    /// Parses a dot-delimited subject.
    pub fn parse(subject: &str) -> Result<Self> {
        let malformed = || FsmError::MalformedSubject(subject.to_string());
        let parts: Vec<&str> = subject.split('.').collect();

        match parts.as_slice() {
            [SERVICE, command] => ServiceCommand::parse(command)
                .map(Subject::Service)
                .ok_or_else(malformed),
            [SERVICE, command, outcome] => {
                match (ServiceCommand::parse(command), Outcome::parse(outcome)) {
                    (Some(command), Some(outcome)) => Ok(Subject::Terminal(command, outcome)),
                    _ => Err(malformed()),
                }
            }
            [resource, verb] => {
                let verb = Verb::parse(verb).ok_or_else(malformed)?;
                Ok(Subject::Command(resource.parse()?, verb))
            }
            [resource, verb, outcome] => {
                let verb = Verb::parse(verb).ok_or_else(malformed)?;
                let outcome = Outcome::parse(outcome).ok_or_else(malformed)?;
                Ok(Subject::Result(resource.parse()?, verb, outcome))
            }
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Service(command) => write!(f, "{SERVICE}.{}", command.as_str()),
            Subject::Terminal(command, outcome) => {
                write!(f, "{SERVICE}.{}.{}", command.as_str(), outcome.as_str())
            }
            Subject::Command(resource, verb) => write!(f, "{resource}.{}", verb.as_str()),
            Subject::Result(resource, verb, outcome) => {
                write!(f, "{resource}.{}.{}", verb.as_str(), outcome.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_shape() {
        assert_eq!(
            Subject::parse("service.create").unwrap(),
            Subject::Service(ServiceCommand::Create)
        );
        assert_eq!(
            Subject::parse("service.delete.done").unwrap(),
            Subject::Terminal(ServiceCommand::Delete, Outcome::Done)
        );
        assert_eq!(
            Subject::parse("networks.update").unwrap(),
            Subject::Command(ResourceType::Networks, Verb::Update)
        );
        assert_eq!(
            Subject::parse("nats.delete.error").unwrap(),
            Subject::Result(ResourceType::Nats, Verb::Delete, Outcome::Error)
        );
    }

    #[test]
    fn display_round_trips() {
        for raw in [
            "service.import",
            "service.create.error",
            "vpcs.find",
            "routers.create.done",
        ] {
            assert_eq!(Subject::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        for raw in ["start", "a.b.c.d", "routers.explode", "routers.create.maybe", "service.set"] {
            assert!(
                matches!(Subject::parse(raw), Err(FsmError::MalformedSubject(_))),
                "{raw} should be malformed"
            );
        }
    }

    #[test]
    fn unknown_resource_is_distinct_from_malformed() {
        assert!(matches!(
            Subject::parse("widgets.create.done"),
            Err(FsmError::UnknownResource(ref r)) if r == "widgets"
        ));
    }
}
