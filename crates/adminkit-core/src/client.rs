//! Client façade
//!
//! One `AdminClient` per signed-in surface. It owns the session and hands
//! out resource clients that share the same pipeline, so a 401 from any of
//! them tears down the one session every observer watches.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use adminkit_http::{HttpTransport, Notice, NotificationBus, Notifier, RequestPipeline, Transport};
use adminkit_session::{
    CredentialCache, LoginRequest, Session, SessionEvent, SessionManager, SessionStore,
    UserProfile,
};
use adminkit_storage::{CredentialStore, Database, SqliteCredentialStore};

use crate::auth::AuthApi;
use crate::category::CategoryApi;
use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

pub struct AdminClient<T = HttpTransport> {
    config: Config,
    pipeline: RequestPipeline<T>,
    sessions: SessionManager<AuthApi<T>>,
    categories: CategoryApi<T>,
    notifications: NotificationBus,
}

impl AdminClient<HttpTransport> {
    /// Client backed by reqwest and the SQLite credential store at
    /// `config.database_path`
    pub fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database_path)?;
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db));
        let transport = HttpTransport::new(config.timeout())?;

        Self::with_parts(config, transport, store)
    }
}

impl<T: Transport> AdminClient<T> {
    pub fn with_parts(config: Config, transport: T, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let base_url = config.api_url()?;
        let notifications = NotificationBus::new();

        let session_store = SessionStore::new(CredentialCache::new(store));
        let pipeline = RequestPipeline::new(transport, session_store.clone(), base_url)
            .with_notifier(Arc::new(notifications.clone()));

        let sessions = SessionManager::new(session_store, AuthApi::new(pipeline.clone()));
        let categories = CategoryApi::new(pipeline.clone());

        tracing::debug!(base_url = %pipeline.base_url(), "Admin client created");

        Ok(Self {
            config,
            pipeline,
            sessions,
            categories,
            notifications,
        })
    }

    /// Restore the persisted session. See [`SessionManager::initialize`].
    pub async fn initialize(&self) -> Result<Option<JoinHandle<()>>> {
        Ok(self.sessions.initialize().await?)
    }

    /// Sign in, posting a notice either way
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let request = LoginRequest::new(username, password);

        match self.sessions.login(&request).await {
            Ok(user) => {
                self.notify(Notice::success("登录成功"));
                Ok(user)
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.notify(Notice::error(err.login_message()));
                Err(err)
            }
        }
    }

    pub async fn logout(&self) {
        self.sessions.logout().await;
        self.notify(Notice::success("已退出登录"));
    }

    pub async fn refresh_user(&self) -> Session {
        self.sessions.refresh_user().await
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated()
    }

    pub fn session(&self) -> Session {
        self.sessions.session()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.sessions.current_user()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sessions.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.sessions.events()
    }

    pub fn categories(&self) -> &CategoryApi<T> {
        &self.categories
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    pub fn pipeline(&self) -> &RequestPipeline<T> {
        &self.pipeline
    }

    pub fn sessions(&self) -> &SessionManager<AuthApi<T>> {
        &self.sessions
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn notify(&self, notice: Notice) {
        self.notifications.notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CreateCategory;
    use adminkit_http::testing::ScriptedTransport;
    use adminkit_http::{ErrorKind, NoticeLevel, OutboundRequest};
    use adminkit_session::SessionStatus;
    use adminkit_storage::{MemoryCredentialStore, StoredCredential};
    use serde_json::json;

    const ADMIN: &str = r#"{"Id": 1, "Username": "admin", "Nickname": "管理员", "Role": "admin"}"#;

    fn admin() -> serde_json::Value {
        serde_json::from_str(ADMIN).unwrap()
    }

    fn client(backing: &MemoryCredentialStore) -> (ScriptedTransport, AdminClient<ScriptedTransport>) {
        let transport = ScriptedTransport::new();
        let config = Config::new(std::env::temp_dir().join("adminkit-client-tests"));
        let client =
            AdminClient::with_parts(config, transport.clone(), Arc::new(backing.clone())).unwrap();
        (transport, client)
    }

    fn bearer(request: &OutboundRequest) -> Option<String> {
        request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        notices
    }

    #[tokio::test]
    async fn test_admin_login() {
        let backing = MemoryCredentialStore::new();
        let (transport, client) = client(&backing);
        let mut notices = client.notifications().subscribe();

        assert!(client.initialize().await.unwrap().is_none());
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);

        transport.reply_json(200, json!({"success": true, "data": {"token": "t1", "user": admin()}}));
        let user = client.login("admin", "admin123").await.unwrap();

        assert_eq!(user.username, "admin");
        let session = client.session();
        assert_eq!(session.status, SessionStatus::Authenticated);
        assert_eq!(session.token.as_deref(), Some("t1"));
        assert_eq!(backing.load().unwrap().unwrap().token, "t1");
        assert!(bearer(&transport.last_sent().unwrap()).is_none());

        let notices = drain(&mut notices);
        assert_eq!(notices, vec![Notice::success("登录成功")]);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_state() {
        let backing = MemoryCredentialStore::new();
        let (transport, client) = client(&backing);
        client.initialize().await.unwrap();
        let mut notices = client.notifications().subscribe();

        transport.reply_json(200, json!({"success": false, "message": "用户名或密码错误"}));
        let err = client.login("admin", "wrong").await.unwrap_err();

        assert_eq!(err.login_message(), "用户名或密码错误");
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);
        assert!(backing.load().unwrap().is_none());
        assert_eq!(drain(&mut notices), vec![Notice::error("用户名或密码错误")]);
    }

    #[tokio::test]
    async fn test_login_offline() {
        let (_, client) = client(&MemoryCredentialStore::new());
        client.initialize().await.unwrap();
        let mut notices = client.notifications().subscribe();

        // Nothing scripted: the transport cannot connect
        assert!(client.login("admin", "admin123").await.is_err());
        assert_eq!(drain(&mut notices), vec![Notice::error("登录失败，请检查网络")]);
    }

    #[tokio::test]
    async fn test_unauthorized_anywhere_signs_out() {
        let backing = MemoryCredentialStore::new();
        let (transport, client) = client(&backing);
        client.initialize().await.unwrap();

        transport.reply_json(200, json!({"success": true, "data": {"token": "t1", "user": admin()}}));
        client.login("admin", "admin123").await.unwrap();
        let mut events = client.events();

        transport.reply(401, "");
        let err = client.categories().list().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(bearer(&transport.last_sent().unwrap()).as_deref(), Some("Bearer t1"));
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);
        assert_eq!(client.session().token, None);
        assert!(backing.load().unwrap().is_none());
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Invalidated);
    }

    #[tokio::test]
    async fn test_initialize_with_invalid_credential() {
        let backing = MemoryCredentialStore::with_credential(StoredCredential::new(
            "expired",
            Some(ADMIN.to_string()),
        ));
        let (transport, client) = client(&backing);
        transport.reply(401, "");

        let validation = client.initialize().await.unwrap().unwrap();
        // Optimistic restore from the cached profile
        assert!(client.session().status.carries_token());

        validation.await.unwrap();
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);
        assert!(backing.load().unwrap().is_none());
        assert_eq!(transport.last_sent().unwrap().url.path(), "/api/v1/auth/userinfo");
    }

    #[tokio::test]
    async fn test_initialize_with_valid_credential() {
        let backing = MemoryCredentialStore::with_credential(StoredCredential::new(
            "t1",
            Some(ADMIN.to_string()),
        ));
        let (transport, client) = client(&backing);
        transport.reply_json(200, json!({"success": true, "data": admin()}));

        let validation = client.initialize().await.unwrap().unwrap();
        validation.await.unwrap();

        assert!(client.is_authenticated());
        assert_eq!(client.current_user().unwrap().display_name(), "管理员");
        assert_eq!(bearer(&transport.last_sent().unwrap()).as_deref(), Some("Bearer t1"));
    }

    #[tokio::test]
    async fn test_server_error_leaves_session() {
        let backing = MemoryCredentialStore::new();
        let (transport, client) = client(&backing);
        client.initialize().await.unwrap();
        transport.reply_json(200, json!({"success": true, "data": {"token": "t1", "user": admin()}}));
        client.login("admin", "admin123").await.unwrap();
        let mut notices = client.notifications().subscribe();

        transport.reply(500, "");
        let err = client.categories().list().await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Http);
        assert_eq!(err.status, Some(500));
        assert!(client.is_authenticated());
        let notices = drain(&mut notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "服务器内部错误");
    }

    #[tokio::test]
    async fn test_create_without_token_sends_no_header() {
        let (transport, client) = client(&MemoryCredentialStore::new());
        client.initialize().await.unwrap();

        transport.reply(401, "");
        let err = client
            .categories()
            .create(&CreateCategory::new("新闻"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(bearer(&transport.last_sent().unwrap()).is_none());
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout() {
        let backing = MemoryCredentialStore::new();
        let (transport, client) = client(&backing);
        client.initialize().await.unwrap();
        transport.reply_json(200, json!({"success": true, "data": {"token": "t1", "user": admin()}}));
        client.login("admin", "admin123").await.unwrap();
        let mut notices = client.notifications().subscribe();

        transport.reply_json(200, json!({"success": true, "message": "登出成功"}));
        client.logout().await;

        assert_eq!(transport.last_sent().unwrap().url.path(), "/api/v1/auth/logout");
        assert_eq!(client.session().status, SessionStatus::Unauthenticated);
        assert!(backing.load().unwrap().is_none());
        assert_eq!(drain(&mut notices), vec![Notice::success("已退出登录")]);
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        };

        let result = AdminClient::with_parts(
            config,
            ScriptedTransport::new(),
            Arc::new(MemoryCredentialStore::new()),
        );
        assert!(result.is_err());
    }
}
