//! Error taxonomy shared by the wire layer and the client.

use std::io;

/// Every failure a GUI RPC exchange can report.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Host name did not resolve to any address.
    #[error("can't resolve host '{0}'")]
    GetHostByName(String),

    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("socket error: {0}")]
    Socket(#[source] io::Error),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("poll failed: {0}")]
    Select(#[source] io::Error),

    /// The stream ended before the closing tag of the named element.
    #[error("unexpected end of stream inside <{0}>")]
    XmlParse(String),

    /// Element contents exceeded a fixed-size destination.
    #[error("contents of <{0}> exceed buffer")]
    BufferOverflow(String),

    #[error("authentication failed")]
    Authenticator,

    /// Asynchronous connect still in progress; poll again.
    #[error("connection in progress")]
    Retry,

    #[error("invalid URL")]
    InvalidUrl,

    #[error("already attached to project")]
    AlreadyAttached,

    /// Numeric status returned by the peer in `<status>N</status>`.
    #[error("peer returned status {0}")]
    Status(i32),

    /// Any `<error>` message without a dedicated mapping.
    #[error("peer error: {0}")]
    Failed(String),

    #[error("unknown operation '{0}'")]
    UnknownOp(String),
}

impl RpcError {
    /// Integer code for callers that still speak the numeric error table.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::Select(_) => -100,
            RpcError::Read(_) => -102,
            RpcError::Write(_) => -103,
            RpcError::Connect(_) => -104,
            RpcError::XmlParse(_) => -112,
            RpcError::GetHostByName(_) => -113,
            RpcError::BufferOverflow(_) => -118,
            RpcError::AlreadyAttached => -130,
            RpcError::Socket(_) => -150,
            RpcError::Authenticator => -155,
            RpcError::Retry => -186,
            RpcError::InvalidUrl => -189,
            RpcError::Status(n) => *n,
            RpcError::Failed(_) | RpcError::UnknownOp(_) => -1,
        }
    }

    /// True for errors after which the connection must be closed and
    /// re-established before issuing another request.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::GetHostByName(_)
                | RpcError::Connect(_)
                | RpcError::Socket(_)
                | RpcError::Read(_)
                | RpcError::Write(_)
                | RpcError::Select(_)
        )
    }
}

pub type Result<T, E = RpcError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_fatal() {
        let eof = || io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(RpcError::Read(eof()).is_transport());
        assert!(RpcError::Write(eof()).is_transport());
        assert!(RpcError::GetHostByName("nowhere".into()).is_transport());
        assert!(!RpcError::Authenticator.is_transport());
        assert!(!RpcError::Retry.is_transport());
        assert!(!RpcError::XmlParse("project".into()).is_transport());
    }

    #[test]
    fn status_code_passes_through() {
        assert_eq!(RpcError::Status(-136).code(), -136);
        assert_eq!(RpcError::Failed("nope".into()).code(), -1);
        assert!(RpcError::Authenticator.code() < 0);
    }
}
