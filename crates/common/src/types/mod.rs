use serde::{Deserialize, Serialize};

/// Message returned by every successful mutation.
pub const OPERATION_SUCCEEDED: &str = "operation succeeded";

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// `{ "message": ... }` body used by create/delete responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
