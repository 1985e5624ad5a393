//! Wire protocol for the daemon
//!
//! One JSON object per line in each direction. Clients send a [`Request`]
//! tagged by `op`; the server writes [`Frame`]s tagged by `kind`, either the
//! response to a request or a pushed room event.

use crate::core::validation::{validate_identifier, ValidationError};
use crate::notifications::api::{Event, NotificationError, RoomId};
use crate::queue::api::{QueueError, UserId, VenueId};
use serde::{Deserialize, Serialize};

/// One client request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Echoed back in the response so clients can pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    Subscribe {
        room: RoomId,
    },
    Unsubscribe {
        room: RoomId,
    },
    BindProvider {
        provider_id: UserId,
        venue_id: VenueId,
        venue_name: String,
    },
    Join {
        venue_id: VenueId,
        user_id: UserId,
        /// Signed so a negative size reaches the core as `InvalidParty`
        party_size: i64,
    },
    Leave {
        venue_id: VenueId,
        user_id: UserId,
    },
    Advance {
        provider_id: UserId,
        venue_id: VenueId,
    },
    Remove {
        provider_id: UserId,
        venue_id: VenueId,
        user_id: UserId,
    },
    Arrive {
        venue_id: VenueId,
        user_id: UserId,
    },
    Checkout {
        venue_id: VenueId,
        user_id: UserId,
    },
    Snapshot {
        venue_id: VenueId,
    },
    Status {
        user_id: UserId,
    },
    Position {
        user_id: UserId,
    },
    Ping,
}

impl Request {
    /// Reject empty or malformed identifiers before they reach the core
    pub fn validate(&self) -> Result<(), ValidationError> {
        let venue = |v: &VenueId| validate_identifier("venueId", v.as_str());
        let user = |u: &UserId| validate_identifier("userId", u.as_str());
        let provider = |p: &UserId| validate_identifier("providerId", p.as_str());

        match self {
            Request::Subscribe { room } | Request::Unsubscribe { room } => {
                validate_identifier("room", room.as_str())
            }
            Request::BindProvider {
                provider_id,
                venue_id,
                venue_name,
            } => {
                provider(provider_id)?;
                venue(venue_id)?;
                if venue_name.trim().is_empty() {
                    return Err(ValidationError::new("venueName cannot be empty"));
                }
                Ok(())
            }
            Request::Join {
                venue_id, user_id, ..
            }
            | Request::Leave { venue_id, user_id }
            | Request::Arrive { venue_id, user_id }
            | Request::Checkout { venue_id, user_id } => {
                venue(venue_id)?;
                user(user_id)
            }
            Request::Advance {
                provider_id,
                venue_id,
            } => {
                provider(provider_id)?;
                venue(venue_id)
            }
            Request::Remove {
                provider_id,
                venue_id,
                user_id,
            } => {
                provider(provider_id)?;
                venue(venue_id)?;
                user(user_id)
            }
            Request::Snapshot { venue_id } => venue(venue_id),
            Request::Status { user_id } | Request::Position { user_id } => user(user_id),
            Request::Ping => Ok(()),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::Subscribe { .. } => "subscribe",
            Request::Unsubscribe { .. } => "unsubscribe",
            Request::BindProvider { .. } => "bindProvider",
            Request::Join { .. } => "join",
            Request::Leave { .. } => "leave",
            Request::Advance { .. } => "advance",
            Request::Remove { .. } => "remove",
            Request::Arrive { .. } => "arrive",
            Request::Checkout { .. } => "checkout",
            Request::Snapshot { .. } => "snapshot",
            Request::Status { .. } => "status",
            Request::Position { .. } => "position",
            Request::Ping => "ping",
        }
    }
}

/// Failure detail carried by an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable snake_case name clients switch on
    pub code: String,
    pub message: String,
    /// Whether repeating the same request may succeed
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: Option<u64>, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                id,
                ok: true,
                result: Some(value),
                error: None,
            },
            Err(e) => Self::failure(id, "internal", format!("Cannot encode result: {e}"), true),
        }
    }

    pub fn failure(
        id: Option<u64>,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
                retryable,
            }),
        }
    }

    pub fn from_queue_error(id: Option<u64>, err: &QueueError) -> Self {
        Self::failure(id, err.code(), err.to_string(), err.is_retryable())
    }

    pub fn from_notification_error(id: Option<u64>, err: &NotificationError) -> Self {
        Self::failure(id, err.code(), err.to_string(), false)
    }

    pub fn invalid_request(id: Option<u64>, message: impl Into<String>) -> Self {
        Self::failure(id, "invalid_request", message, false)
    }
}

/// One server line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Frame {
    Response(Response),
    Event(Event),
}

impl Frame {
    /// Encode as a single line, without the trailing newline
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse a request line, mapping malformed input to an error response
pub fn parse_request(line: &str) -> Result<RequestEnvelope, Box<Response>> {
    let envelope: RequestEnvelope = serde_json::from_str(line).map_err(|e| {
        let id = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|v| v.get("id").and_then(serde_json::Value::as_u64));
        Box::new(Response::invalid_request(id, format!("Malformed request: {e}")))
    })?;

    envelope
        .request
        .validate()
        .map_err(|e| Box::new(Response::invalid_request(envelope.id, e.message())))?;

    Ok(envelope)
}
