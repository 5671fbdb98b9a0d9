use shared::models::{LoginRequest, LoginResponse};
use tracing::info;

use super::JobBoardClient;
use crate::error::GatewayResult;

impl JobBoardClient {
    /// Exchange credentials for a bearer token; the token is kept on this client.
    ///
    /// # Errors
    /// Returns the classified gateway error; bad credentials surface as
    /// `Unauthorized` or `Validation` depending on the backend.
    pub async fn login(&self, payload: &LoginRequest) -> GatewayResult<LoginResponse> {
        let url = self.api_url("login");
        let body: LoginResponse = self.send_json(self.http().post(url).json(payload)).await?;
        self.set_token(Some(body.token.clone()));
        info!(user_id = %body.user.id, role = %body.user.role, "logged in");
        Ok(body)
    }

    /// Revoke the current token. The local token is cleared even if the request fails.
    ///
    /// # Errors
    /// Returns the classified gateway error from the revoke request.
    pub async fn logout(&self) -> GatewayResult<()> {
        let url = self.api_url("logout");
        let result = self.send_empty(self.http().post(url)).await;
        self.set_token(None);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, gateway::test_support::spawn_backend};
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn login_stores_token_and_logout_clears_it() {
        let router = Router::new()
            .route(
                "/api/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret" {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "token": "abc123",
                                "user": {"id": 4, "name": "Nour", "email": body["email"], "role": "itian"}
                            })),
                        )
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"message": "Invalid credentials"})),
                        )
                    }
                }),
            )
            .route("/api/logout", post(|| async { StatusCode::NO_CONTENT }));
        let base = spawn_backend(router).await;
        let client = JobBoardClient::new(&base).unwrap();

        let rejected = client
            .login(&LoginRequest {
                email: "n@example.com".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(rejected.kind(), ErrorKind::Unauthorized);
        assert_eq!(client.current_token(), None);

        let response = client
            .login(&LoginRequest {
                email: "n@example.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.user.email, "n@example.com");
        assert_eq!(client.current_token().as_deref(), Some("abc123"));

        client.logout().await.unwrap();
        assert_eq!(client.current_token(), None);
    }
}
