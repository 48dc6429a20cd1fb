//! Category resource client

use serde::{Deserialize, Serialize};

use adminkit_http::{RequestError, RequestOptions, RequestOutcome, RequestPipeline, Transport};

const NAME_REQUIRED: &str = "分类名称不能为空";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// 0 for a top-level category
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub order: i64,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl CreateCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

/// Partial update; absent fields are left out of the body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedId {
    pub id: i64,
}

pub struct CategoryApi<T> {
    pipeline: RequestPipeline<T>,
}

impl<T: Transport> CategoryApi<T> {
    pub fn new(pipeline: RequestPipeline<T>) -> Self {
        Self { pipeline }
    }

    pub async fn list(&self) -> RequestOutcome<Vec<Category>> {
        // An empty table comes back as a literal `null`
        let categories: Option<Vec<Category>> = self
            .pipeline
            .get("/categories", RequestOptions::default())
            .await?;
        Ok(categories.unwrap_or_default())
    }

    pub async fn get_by_id(&self, id: i64) -> RequestOutcome<Category> {
        self.pipeline
            .get(&format!("/categories/{}", id), RequestOptions::default())
            .await
    }

    pub async fn create(&self, params: &CreateCategory) -> RequestOutcome<CreatedId> {
        check_name(&params.name)?;

        let created: CreatedId = self
            .pipeline
            .post("/categories", params, RequestOptions::default())
            .await?;
        tracing::info!(id = created.id, name = %params.name, "Created category");
        Ok(created)
    }

    pub async fn update(&self, id: i64, params: &UpdateCategory) -> RequestOutcome<String> {
        if let Some(name) = &params.name {
            check_name(name)?;
        }

        self.pipeline
            .put(&format!("/categories/{}", id), params, RequestOptions::default())
            .await
    }

    pub async fn delete(&self, id: i64) -> RequestOutcome<String> {
        let reply: String = self
            .pipeline
            .delete(&format!("/categories/{}", id), RequestOptions::default())
            .await?;
        tracing::info!(id, "Deleted category");
        Ok(reply)
    }
}

impl<T> Clone for CategoryApi<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
        }
    }
}

fn check_name(name: &str) -> RequestOutcome<()> {
    if name.trim().is_empty() {
        return Err(RequestError::validation(NAME_REQUIRED));
    }
    Ok(())
}

/// Display name of a category's parent within `categories`
pub fn parent_name(categories: &[Category], parent_id: i64) -> String {
    if parent_id == 0 {
        return "无".to_string();
    }
    categories
        .iter()
        .find(|c| c.id == parent_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "未知".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminkit_http::testing::{RecordingNotifier, ScriptedTransport};
    use adminkit_http::{ErrorKind, Method, NoticeLevel};
    use adminkit_session::{CredentialCache, SessionStore};
    use adminkit_storage::MemoryCredentialStore;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn api() -> (ScriptedTransport, RecordingNotifier, CategoryApi<ScriptedTransport>) {
        let transport = ScriptedTransport::new();
        let notifier = RecordingNotifier::new();
        let store = SessionStore::new(CredentialCache::new(Arc::new(MemoryCredentialStore::new())));
        let pipeline = RequestPipeline::new(
            transport.clone(),
            store,
            Url::parse("http://localhost:3000/api/v1").unwrap(),
        )
        .with_notifier(Arc::new(notifier.clone()));

        (transport, notifier, CategoryApi::new(pipeline))
    }

    fn category(id: i64, name: &str, parent_id: i64) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id,
            order: 0,
        }
    }

    #[tokio::test]
    async fn test_list() {
        let (transport, _, api) = api();
        transport.reply_json(
            200,
            json!([
                {"Id": 1, "Name": "新闻", "ParentId": 0, "Order": 1},
                {"Id": 2, "Name": "国内", "ParentId": 1, "Order": 2}
            ]),
        );

        let categories = api.list().await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].parent_id, 1);
        assert!(categories[0].is_root());

        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.method, Method::GET);
        assert_eq!(sent.url.as_str(), "http://localhost:3000/api/v1/categories");
    }

    #[tokio::test]
    async fn test_null_list_is_empty() {
        let (transport, _, api) = api();
        transport.reply(200, "null");
        assert!(api.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_body_is_parse_failure() {
        let (transport, notifier, api) = api();
        transport.reply(200, "");

        let err = api.list().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.message, "响应数据格式错误");
        assert_eq!(notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let (transport, _, api) = api();
        transport.reply_json(200, json!({"Id": 7, "Name": "体育", "ParentId": 0, "Order": 3}));

        let found = api.get_by_id(7).await.unwrap();
        assert_eq!(found.name, "体育");
        assert_eq!(transport.last_sent().unwrap().url.path(), "/api/v1/categories/7");
    }

    #[tokio::test]
    async fn test_create_omits_unset_fields() {
        let (transport, _, api) = api();
        transport.reply_json(200, json!({"id": 12}));

        let created = api.create(&CreateCategory::new("科技").order(5)).await.unwrap();
        assert_eq!(created, CreatedId { id: 12 });

        let body: serde_json::Value =
            serde_json::from_slice(&transport.last_sent().unwrap().body.unwrap()).unwrap();
        assert_eq!(body, json!({"Name": "科技", "Order": 5}));
    }

    #[tokio::test]
    async fn test_blank_name_never_sent() {
        let (transport, _, api) = api();

        let err = api.create(&CreateCategory::new("   ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, NAME_REQUIRED);

        let update = UpdateCategory {
            name: Some(String::new()),
            ..UpdateCategory::default()
        };
        assert!(api.update(3, &update).await.is_err());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (transport, _, api) = api();
        transport.reply_json(200, json!("OK"));
        transport.reply_json(200, json!("OK"));

        let update = UpdateCategory {
            order: Some(9),
            ..UpdateCategory::default()
        };
        assert_eq!(api.update(4, &update).await.unwrap(), "OK");
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.method, Method::PUT);
        let body: serde_json::Value = serde_json::from_slice(&sent.body.unwrap()).unwrap();
        assert_eq!(body, json!({"Order": 9}));

        assert_eq!(api.delete(4).await.unwrap(), "OK");
        let sent = transport.last_sent().unwrap();
        assert_eq!(sent.method, Method::DELETE);
        assert_eq!(sent.url.path(), "/api/v1/categories/4");
    }

    #[tokio::test]
    async fn test_server_error_is_notified_once() {
        let (transport, notifier, api) = api();
        transport.reply(404, "");

        let err = api.get_by_id(99).await.unwrap_err();
        assert_eq!(err.status, Some(404));

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].message, "请求资源不存在");
    }

    #[test]
    fn test_parent_name() {
        let categories = vec![category(1, "新闻", 0), category(2, "国内", 1)];
        assert_eq!(parent_name(&categories, 0), "无");
        assert_eq!(parent_name(&categories, 1), "新闻");
        assert_eq!(parent_name(&categories, 42), "未知");
    }
}
