//! Production backend speaking the platform's HTTP protocol: row queries
//! against `/rest/v1/<table>` and identity operations against `/auth/v1`.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::store::{AuthBackend, AuthSession, AuthUser, Filter, Query, RemoteStore};

pub struct HttpBackend {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    /// Access token of the signed-in identity, when there is one.
    token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let base = Url::parse(&config.remote.url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            api_key: config.remote.key.clone(),
            token: RwLock::new(None),
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base.as_str().trim_end_matches('/'), table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn bearer(&self) -> String {
        let token = self.token.read().await;
        token.clone().unwrap_or_else(|| self.api_key.clone())
    }

    async fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(self.bearer().await)
    }

    /// Surface a non-success response as the platform's error descriptor.
    async fn check(&self, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Err(decode_error(status, &body))
    }
}

/// Pull `code`/`message` out of an error body; the auth subsystem uses
/// `msg`/`error_description` instead of `message`.
fn decode_error(status: StatusCode, body: &Value) -> StoreError {
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string));
    let message = body
        .get("message")
        .or_else(|| body.get("msg"))
        .or_else(|| body.get("error_description"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {status}"));
    StoreError::api(code, message)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Filters as query parameters, one comparison operator per filter.
fn render_filters(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for filter in &query.filters {
        match filter {
            Filter::Eq(col, v) => params.push((col.clone(), format!("eq.{}", render_value(v)))),
            Filter::Ilike(col, fragment) => {
                params.push((col.clone(), format!("ilike.*{fragment}*")))
            }
            Filter::Gte(col, v) => params.push((col.clone(), format!("gte.{}", render_value(v)))),
            Filter::Lte(col, v) => params.push((col.clone(), format!("lte.{}", render_value(v)))),
            Filter::In(col, values) => {
                let list = values
                    .iter()
                    .map(render_value)
                    .collect::<Vec<_>>()
                    .join(",");
                params.push((col.clone(), format!("in.({list})")));
            }
        }
    }
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

/// The `select` parameter: projection plus embedded related rows.
fn render_select(query: &Query) -> String {
    let mut parts = vec![match &query.columns {
        Some(columns) => columns.join(","),
        None => "*".to_string(),
    }];
    for embed in &query.embeds {
        parts.push(format!(
            "{}:{}({})",
            embed.alias,
            embed.table,
            embed.columns.join(",")
        ));
    }
    parts.join(",")
}

#[async_trait]
impl RemoteStore for HttpBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        let mut params = vec![("select".to_string(), render_select(query))];
        params.extend(render_filters(query));
        let req = self.http.get(self.rest_url(table)).query(&params);
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn select_one(&self, table: &str, query: &Query) -> Result<Value, StoreError> {
        let mut params = vec![("select".to_string(), render_select(query))];
        params.extend(render_filters(query));
        let req = self
            .http
            .get(self.rest_url(table))
            .query(&params)
            .header("Accept", "application/vnd.pgrst.object+json");
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, StoreError> {
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(render_filters(query));
        let req = self
            .http
            .head(self.rest_url(table))
            .query(&params)
            .header("Prefer", "count=exact");
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        range
            .rsplit('/')
            .next()
            .and_then(|total| total.parse().ok())
            .ok_or_else(|| StoreError::api(None, format!("Unparseable count range '{range}'")))
    }

    async fn insert(&self, table: &str, row: &Value) -> Result<Value, StoreError> {
        let req = self
            .http
            .post(self.rest_url(table))
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(row);
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        let params = render_filters(query);
        let req = self
            .http
            .patch(self.rest_url(table))
            .query(&params)
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(patch);
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<(), StoreError> {
        let params = render_filters(query);
        let req = self
            .http
            .delete(self.rest_url(table))
            .query(&params)
            .header("Prefer", "return=minimal");
        self.check(self.with_auth(req).await.send().await?).await?;
        Ok(())
    }
}

fn parse_auth_user(body: &Value) -> Result<AuthUser, StoreError> {
    // Signup responses nest the identity under `user` when a session is
    // issued immediately; otherwise the identity is the body itself.
    let user = body.get("user").unwrap_or(body);
    let id = user
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::api(None, "Auth response missing user id"))?;
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(AuthUser { id, email })
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let req = self
            .http
            .post(self.auth_url("signup"))
            .json(&json!({ "email": email, "password": password }));
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        let body: Value = response.json().await?;
        parse_auth_user(&body)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StoreError> {
        let req = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.check(self.with_auth(req).await.send().await?).await?;
        let body: Value = response.json().await?;
        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::api(None, "Auth response missing access token"))?
            .to_string();
        let user = parse_auth_user(&body)?;
        *self.token.write().await = Some(access_token.clone());
        Ok(AuthSession { access_token, user })
    }

    async fn sign_out(&self) -> Result<(), StoreError> {
        let req = self.http.post(self.auth_url("logout"));
        let result = self.with_auth(req).await.send().await;
        // The local token is gone either way.
        *self.token.write().await = None;
        self.check(result?).await?;
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<AuthSession>, StoreError> {
        let token = match self.token.read().await.clone() {
            Some(token) => token,
            None => return Ok(None),
        };
        let req = self.http.get(self.auth_url("user"));
        let response = self.with_auth(req).await.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            *self.token.write().await = None;
            return Ok(None);
        }
        let response = self.check(response).await?;
        let body: Value = response.json().await?;
        let user = parse_auth_user(&body)?;
        Ok(Some(AuthSession {
            access_token: token,
            user,
        }))
    }

    async fn admin_delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let req = self.http.delete(self.auth_url(&format!("admin/users/{id}")));
        self.check(self.with_auth(req).await.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Embed;

    #[test]
    fn filters_render_with_operators() {
        let query = Query::new()
            .eq("user_id", "abc")
            .ilike("description", "sunset")
            .gte("age", 18)
            .is_in("post_id", vec![1, 2])
            .order_desc("created_at");
        let params = render_filters(&query);
        assert_eq!(
            params,
            vec![
                ("user_id".to_string(), "eq.abc".to_string()),
                ("description".to_string(), "ilike.*sunset*".to_string()),
                ("age".to_string(), "gte.18".to_string()),
                ("post_id".to_string(), "in.(1,2)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn select_renders_projection_and_embeds() {
        let query = Query::new().embed(Embed::new(
            "user",
            "users",
            "user_id",
            "user_id",
            &["id", "nick_name"],
        ));
        assert_eq!(render_select(&query), "*,user:users(id,nick_name)");

        let query = Query::new().columns(&["id"]);
        assert_eq!(render_select(&query), "id");
    }

    #[test]
    fn error_decode_prefers_platform_fields() {
        let body = serde_json::json!({ "code": "PGRST116", "message": "0 rows" });
        assert!(decode_error(StatusCode::NOT_ACCEPTABLE, &body).is_no_rows());

        let body = serde_json::json!({ "msg": "Invalid login credentials" });
        let err = decode_error(StatusCode::BAD_REQUEST, &body);
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
