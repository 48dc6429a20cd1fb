//! Auth endpoints over the request pipeline

use serde::{Deserialize, Serialize};

use adminkit_http::{Method, RequestError, RequestOptions, RequestPipeline, Transport};
use adminkit_session::{AuthBackend, LoginGrant, LoginRequest, SessionError, UserProfile};

const LOGIN_FAILED: &str = "登录失败";

/// `{success, message?, data?}` envelope used by the auth endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// The payload when the server reported success and sent one,
    /// otherwise the server's message (if any)
    pub fn into_data(self) -> Result<T, Option<String>> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message.filter(|m| !m.trim().is_empty())),
        }
    }
}

pub struct AuthApi<T> {
    pipeline: RequestPipeline<T>,
}

impl<T: Transport> AuthApi<T> {
    pub fn new(pipeline: RequestPipeline<T>) -> Self {
        Self { pipeline }
    }
}

impl<T: Transport> AuthBackend for AuthApi<T> {
    async fn login(&self, request: &LoginRequest) -> Result<LoginGrant, SessionError> {
        // The form shows its own feedback, and a stale token must not ride along
        let response: ApiResponse<LoginGrant> = self
            .pipeline
            .post("/auth/login", request, RequestOptions::anonymous().silent())
            .await
            .map_err(SessionError::backend)?;

        response.into_data().map_err(|message| {
            SessionError::LoginRejected(message.unwrap_or_else(|| LOGIN_FAILED.to_string()))
        })
    }

    async fn user_info(&self) -> Result<UserProfile, SessionError> {
        let response: ApiResponse<UserProfile> = self
            .pipeline
            .get("/auth/userinfo", RequestOptions::quiet())
            .await
            .map_err(SessionError::backend)?;

        response.into_data().map_err(|message| {
            SessionError::ProfileUnavailable(message.unwrap_or_else(|| "no profile returned".to_string()))
        })
    }

    async fn logout(&self) -> Result<(), SessionError> {
        let response: ApiResponse<serde_json::Value> = self
            .pipeline
            .request::<_, ()>("/auth/logout", Method::POST, None, RequestOptions::quiet())
            .await
            .map_err(SessionError::backend)?;

        if response.success {
            Ok(())
        } else {
            Err(SessionError::backend(RequestError::validation(
                response.message.unwrap_or_else(|| "logout not acknowledged".to_string()),
            )))
        }
    }
}
