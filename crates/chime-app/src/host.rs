//! REST client for the chat host the plugin runs inside.

use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use chime_core::config::HostConfig;
use chime_core::model::{ChannelId, UserId};
use chime_service::error::{ServiceError, ServiceResult};
use chime_service::notify::{Attachment, Messenger, OutgoingPost};

use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct CreatePostRequest<'a> {
    user_id: &'a str,
    channel_id: &'a str,
    message: &'a str,
    props: PostProps<'a>,
}

#[derive(Serialize)]
struct PostProps<'a> {
    attachments: [&'a Attachment; 1],
}

impl<'a> From<&'a OutgoingPost> for CreatePostRequest<'a> {
    fn from(post: &'a OutgoingPost) -> Self {
        Self {
            user_id: post.user_id.as_str(),
            channel_id: post.channel_id.as_str(),
            message: "",
            props: PostProps {
                attachments: [&post.attachment],
            },
        }
    }
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct UserResponse {
    username: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// Bot-authenticated client for the host's v4 REST API.
#[derive(Clone)]
pub struct HostClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HostClient {
    /// ## Summary
    /// Builds a client for the configured host.
    ///
    /// ## Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &HostConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v4/{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> AppResult<T> {
        let response = request.bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(AppError::HostStatus {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// ## Summary
    /// `POST /api/v4/posts`
    ///
    /// ## Errors
    /// Returns an error if the request fails or the host rejects it.
    #[tracing::instrument(skip_all, fields(channel_id = %post.channel_id))]
    pub async fn create_post(&self, post: &OutgoingPost) -> AppResult<()> {
        let created: IdResponse = self
            .send(
                self.http
                    .post(self.endpoint("posts"))
                    .json(&CreatePostRequest::from(post)),
            )
            .await?;
        tracing::trace!(post_id = %created.id, "Post created");
        Ok(())
    }

    /// ## Summary
    /// `POST /api/v4/channels/direct`
    ///
    /// ## Errors
    /// Returns an error if the request fails or the host rejects it.
    pub async fn direct_channel(&self, first: &UserId, second: &UserId) -> AppResult<ChannelId> {
        let channel: IdResponse = self
            .send(
                self.http
                    .post(self.endpoint("channels/direct"))
                    .json(&[first, second]),
            )
            .await?;
        Ok(ChannelId::new(channel.id))
    }

    /// ## Summary
    /// `POST /api/v4/channels/group`; the host returns the existing channel
    /// when the same member set already has one.
    ///
    /// ## Errors
    /// Returns an error if the request fails or the host rejects it.
    pub async fn group_channel(&self, members: &[UserId]) -> AppResult<ChannelId> {
        let channel: IdResponse = self
            .send(
                self.http
                    .post(self.endpoint("channels/group"))
                    .json(members),
            )
            .await?;
        Ok(ChannelId::new(channel.id))
    }

    /// ## Summary
    /// `GET /api/v4/users/{id}`, returning the username.
    ///
    /// ## Errors
    /// Returns an error if the request fails or the user does not exist.
    pub async fn username(&self, user: &UserId) -> AppResult<String> {
        let found: UserResponse = self
            .send(self.http.get(self.endpoint(&format!("users/{user}"))))
            .await?;
        Ok(found.username)
    }
}

fn host_error(err: AppError) -> ServiceError {
    match err {
        AppError::HostStatus { status: 404, message } => ServiceError::NotFound(message),
        other => ServiceError::HostError(other.to_string()),
    }
}

impl Messenger for HostClient {
    fn create_post<'a>(&'a self, post: &'a OutgoingPost) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move { HostClient::create_post(self, post).await.map_err(host_error) })
    }

    fn direct_channel<'a>(
        &'a self,
        first: &'a UserId,
        second: &'a UserId,
    ) -> BoxFuture<'a, ServiceResult<ChannelId>> {
        Box::pin(async move {
            HostClient::direct_channel(self, first, second)
                .await
                .map_err(host_error)
        })
    }

    fn group_channel<'a>(
        &'a self,
        members: &'a [UserId],
    ) -> BoxFuture<'a, ServiceResult<ChannelId>> {
        Box::pin(async move { HostClient::group_channel(self, members).await.map_err(host_error) })
    }

    fn display_name<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(async move { self.username(user).await.map_err(host_error) })
    }
}
