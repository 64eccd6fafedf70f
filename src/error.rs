use thiserror::Error;

/// Errors surfaced by the bot core and the protocol boundary.
#[derive(Debug, Error)]
pub enum BotError {
    /// Network session could not be opened. Fatal during startup.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Server rejected the bot credentials. Fatal during startup.
    #[error("unable to authorize user {0}")]
    AuthFailure(String),

    /// Room id without exactly one `@`.
    #[error("malformed room identifier: {0}")]
    MalformedRoomIdentifier(String),

    /// Leave/subject requested for a room the bot is not in.
    #[error("not joined to room: {0}")]
    NotJoined(String),

    /// Address that does not parse as `node@domain/resource`.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Command names must be a single non-empty token.
    #[error("invalid command name: {0:?}")]
    InvalidCommandName(String),

    /// Outbound side of the protocol client has gone away.
    #[error("protocol client closed")]
    ClientClosed,

    #[error("protocol client not connected")]
    NotConnected,
}

pub type BotResult<T> = Result<T, BotError>;
