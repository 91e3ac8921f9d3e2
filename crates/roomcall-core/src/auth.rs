use serde::Deserialize;

use crate::errors::CallError;

/// Response from POST /auth/login.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    token_type: String,
}

/// Media credentials returned by POST /rooms/{id}/join.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomTicket {
    /// Access token for the media service.
    pub token: String,
    /// Service URL the token is valid for.
    pub room_url: String,
}

/// Client for the room backend that logs users in and issues media
/// tickets per room.
pub struct TokenClient {
    base_url: String,
    http: reqwest::Client,
}

impl TokenClient {
    /// `base_url` is the backend root, e.g. `https://rooms.example.com`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Log in and return the backend JWT.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, CallError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(username),
            urlencoding::encode(password)
        );

        tracing::info!("logging in to {url}");

        let resp = self
            .http
            .post(&url)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| CallError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CallError::Auth(format!(
                "login returned status {}",
                resp.status()
            )));
        }

        let data: LoginResponse = resp
            .json()
            .await
            .map_err(|e| CallError::Auth(format!("invalid login response: {e}")))?;

        Ok(data.access_token)
    }

    /// Join a room and obtain a media ticket for it.
    pub async fn join_room(&self, jwt: &str, room_id: i64) -> Result<RoomTicket, CallError> {
        let url = format!("{}/rooms/{}/join", self.base_url, room_id);

        tracing::info!("requesting room ticket from {url}");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(jwt)
            .send()
            .await
            .map_err(|e| CallError::Http(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CallError::Auth(format!("join returned status {status}")));
        }
        if !status.is_success() {
            return Err(CallError::Http(format!("join returned status {status}")));
        }

        resp.json()
            .await
            .map_err(|e| CallError::Http(format!("invalid join response: {e}")))
    }

    /// Login and join in one step.
    pub async fn fetch_ticket(
        &self,
        username: &str,
        password: &str,
        room_id: i64,
    ) -> Result<RoomTicket, CallError> {
        let jwt = self.login(username, password).await?;
        self.join_room(&jwt, room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = TokenClient::new("https://rooms.example.com/");
        assert_eq!(client.base_url, "https://rooms.example.com");
        let client = TokenClient::new("http://localhost:8000");
        assert_eq!(client.base_url, "http://localhost:8000");
    }

    #[test]
    fn room_ticket_deserializes() {
        let ticket: RoomTicket = serde_json::from_str(
            r#"{"token":"jwt-abc","room_url":"wss://media.example.com?token=jwt-abc"}"#,
        )
        .unwrap();
        assert_eq!(ticket.token, "jwt-abc");
        assert!(ticket.room_url.starts_with("wss://"));
    }

    #[test]
    fn login_response_tolerates_missing_token_type() {
        let resp: LoginResponse = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(resp.access_token, "abc");
    }
}
