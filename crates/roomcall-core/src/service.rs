//! Server-side room administration against the media service.
//!
//! Mints join tokens and manages rooms through the service API. This is
//! the deployment-side counterpart of the client: room names are created
//! here and handed to clients, which never see the API secret.

use chrono::{DateTime, Utc};
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::CallError;

/// An active room as reported by the service.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub sid: String,
    pub num_participants: u32,
    pub created_at: Option<DateTime<Utc>>,
}

/// A participant currently in a room.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSummary {
    pub identity: String,
    pub name: String,
    pub sid: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub state: String,
}

/// Room and token administration for one media service deployment.
pub struct RoomDirectory {
    api_key: String,
    api_secret: String,
    client: RoomClient,
}

impl RoomDirectory {
    /// `service_url` may be the WebSocket form (`wss://`); the API client
    /// talks to its HTTP counterpart.
    pub fn new(service_url: &str, api_key: &str, api_secret: &str) -> Self {
        let http_url = service_url
            .replace("wss://", "https://")
            .replace("ws://", "http://");
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            client: RoomClient::with_api_key(&http_url, api_key, api_secret),
        }
    }

    /// Mint an access token letting `identity` join and publish into
    /// `room_name`.
    pub fn mint_join_token(&self, room_name: &str, identity: &str) -> Result<String, CallError> {
        AccessToken::with_api_key(&self.api_key, &self.api_secret)
            .with_identity(identity)
            .with_name(identity)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                ..Default::default()
            })
            .to_jwt()
            .map_err(|e| CallError::Auth(e.to_string()))
    }

    /// Generate a fresh room name: `room_` plus 8 hex characters.
    pub fn generate_room_name() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("room_{}", &id[..8])
    }

    /// Whether `name` matches the generated room name format.
    pub fn is_valid_room_name(name: &str) -> bool {
        let re = regex::Regex::new(r"^room_[0-9a-f]{8}$").unwrap();
        re.is_match(name)
    }

    pub async fn create_room(&self, name: &str) -> Result<RoomSummary, CallError> {
        let room = self
            .client
            .create_room(name, CreateRoomOptions::default())
            .await
            .map_err(|e| CallError::Http(format!("create room: {e}")))?;
        tracing::info!(room = %room.name, "room created");
        Ok(RoomSummary {
            name: room.name,
            sid: room.sid,
            num_participants: room.num_participants,
            created_at: DateTime::from_timestamp(room.creation_time, 0),
        })
    }

    /// Delete a room. A missing room is not an error; the service cleans
    /// up empty rooms on its own.
    pub async fn delete_room(&self, name: &str) -> Result<(), CallError> {
        if let Err(e) = self.client.delete_room(name).await {
            tracing::warn!(room = %name, "room deletion skipped: {e}");
        }
        Ok(())
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomSummary>, CallError> {
        let rooms = self
            .client
            .list_rooms(Vec::new())
            .await
            .map_err(|e| CallError::Http(format!("list rooms: {e}")))?;
        Ok(rooms
            .into_iter()
            .map(|room| RoomSummary {
                name: room.name,
                sid: room.sid,
                num_participants: room.num_participants,
                created_at: DateTime::from_timestamp(room.creation_time, 0),
            })
            .collect())
    }

    pub async fn list_participants(
        &self,
        room_name: &str,
    ) -> Result<Vec<ParticipantSummary>, CallError> {
        let participants = self
            .client
            .list_participants(room_name)
            .await
            .map_err(|e| CallError::Http(format!("list participants: {e}")))?;
        Ok(participants
            .into_iter()
            .map(|p| ParticipantSummary {
                identity: p.identity,
                name: p.name,
                sid: p.sid,
                joined_at: DateTime::from_timestamp(p.joined_at, 0),
                state: participant_state_name(p.state).to_string(),
            })
            .collect())
    }
}

fn participant_state_name(state: i32) -> &'static str {
    match state {
        0 => "JOINING",
        1 => "JOINED",
        2 => "ACTIVE",
        3 => "DISCONNECTED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_room_names_validate() {
        for _ in 0..16 {
            let name = RoomDirectory::generate_room_name();
            assert!(RoomDirectory::is_valid_room_name(&name), "{name}");
        }
    }

    #[test]
    fn room_name_validation_rejects_malformed_input() {
        assert!(!RoomDirectory::is_valid_room_name("room_"));
        assert!(!RoomDirectory::is_valid_room_name("room_xyz"));
        assert!(!RoomDirectory::is_valid_room_name("room_ABF2B70A"));
        assert!(!RoomDirectory::is_valid_room_name("meeting_abf2b70a"));
        assert!(RoomDirectory::is_valid_room_name("room_abf2b70a"));
    }

    #[test]
    fn minted_token_is_a_jwt() {
        let directory = RoomDirectory::new("wss://media.test", "api-key", "api-secret-value");
        let token = directory.mint_join_token("room_abf2b70a", "saket").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn participant_states_map_to_names() {
        assert_eq!(participant_state_name(0), "JOINING");
        assert_eq!(participant_state_name(2), "ACTIVE");
        assert_eq!(participant_state_name(99), "UNKNOWN");
    }
}
