use thiserror::Error;

/// Errors raised while turning collaborator input into something drawable.
///
/// All of them are terminal for the render attempt that produced them: nothing is laid out
/// or drawn from input that failed here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("link '{source_id}' -> '{target_id}' references unknown node '{missing}'")]
    DanglingLink {
        source_id: String,
        target_id: String,
        missing: String,
    },

    #[error("node id '{0}' is declared more than once")]
    DuplicateNodeId(String),
}

/// Coarse classification of [`Error`], useful for picking a user facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    ReferentialIntegrity,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedInput(_) => ErrorKind::MalformedInput,
            Error::DanglingLink { .. } | Error::DuplicateNodeId(_) => {
                ErrorKind::ReferentialIntegrity
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(
            Error::MalformedInput("x".into()).kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            Error::DuplicateNodeId("a".into()).kind(),
            ErrorKind::ReferentialIntegrity
        );
        let dangling = Error::DanglingLink {
            source_id: "a".into(),
            target_id: "b".into(),
            missing: "b".into(),
        };
        assert_eq!(dangling.kind(), ErrorKind::ReferentialIntegrity);
        assert_eq!(
            dangling.to_string(),
            "link 'a' -> 'b' references unknown node 'b'"
        );
    }
}
