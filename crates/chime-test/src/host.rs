//! Chat host doubles that record every call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;

use chime_core::model::{ChannelId, UserId};
use chime_service::error::{ServiceError, ServiceResult};
use chime_service::notify::{Broadcaster, Messenger, OutgoingPost, RealtimeEvent};

use crate::lock;

/// [`Messenger`] that records posts and channel requests.
///
/// Display names resolve only for users registered with [`Self::with_user`];
/// any other lookup fails with `NotFound`.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    names: Mutex<HashMap<UserId, String>>,
    posts: Mutex<Vec<OutgoingPost>>,
    direct_requests: Mutex<Vec<(UserId, UserId)>>,
    group_requests: Mutex<Vec<Vec<UserId>>>,
    fail_posts: AtomicBool,
}

impl RecordingMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(self, user: &str, name: &str) -> Self {
        lock(&self.names).insert(UserId::from(user), name.to_owned());
        self
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn posts(&self) -> Vec<OutgoingPost> {
        lock(&self.posts).clone()
    }

    #[must_use]
    pub fn direct_requests(&self) -> Vec<(UserId, UserId)> {
        lock(&self.direct_requests).clone()
    }

    #[must_use]
    pub fn group_requests(&self) -> Vec<Vec<UserId>> {
        lock(&self.group_requests).clone()
    }
}

impl Messenger for RecordingMessenger {
    fn create_post<'a>(&'a self, post: &'a OutgoingPost) -> BoxFuture<'a, ServiceResult<()>> {
        Box::pin(async move {
            if self.fail_posts.load(Ordering::SeqCst) {
                return Err(ServiceError::HostError("post rejected".to_owned()));
            }
            lock(&self.posts).push(post.clone());
            Ok(())
        })
    }

    fn direct_channel<'a>(
        &'a self,
        first: &'a UserId,
        second: &'a UserId,
    ) -> BoxFuture<'a, ServiceResult<ChannelId>> {
        Box::pin(async move {
            lock(&self.direct_requests).push((first.clone(), second.clone()));
            Ok(ChannelId::new(format!("dm_{first}_{second}")))
        })
    }

    fn group_channel<'a>(
        &'a self,
        members: &'a [UserId],
    ) -> BoxFuture<'a, ServiceResult<ChannelId>> {
        Box::pin(async move {
            lock(&self.group_requests).push(members.to_vec());
            let joined: Vec<&str> = members.iter().map(UserId::as_str).collect();
            Ok(ChannelId::new(format!("group_{}", joined.join("_"))))
        })
    }

    fn display_name<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(async move {
            lock(&self.names)
                .get(user)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(format!("user {user}")))
        })
    }
}

/// A real-time event as handed to the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub event_name: String,
    pub payload: RealtimeEvent,
    pub recipient: UserId,
}

/// [`Broadcaster`] that records deliveries and can reject chosen recipients.
#[derive(Debug, Default)]
pub struct RecordingBroadcaster {
    published: Mutex<Vec<Published>>,
    rejected: Mutex<HashSet<UserId>>,
}

impl RecordingBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rejecting(self, user: &str) -> Self {
        lock(&self.rejected).insert(UserId::from(user));
        self
    }

    #[must_use]
    pub fn published(&self) -> Vec<Published> {
        lock(&self.published).clone()
    }

    #[must_use]
    pub fn recipients(&self) -> Vec<UserId> {
        lock(&self.published)
            .iter()
            .map(|p| p.recipient.clone())
            .collect()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(
        &self,
        event_name: &str,
        payload: &RealtimeEvent,
        recipient: &UserId,
    ) -> ServiceResult<()> {
        if lock(&self.rejected).contains(recipient) {
            return Err(ServiceError::HostError(format!("{recipient} unreachable")));
        }
        lock(&self.published).push(Published {
            event_name: event_name.to_owned(),
            payload: payload.clone(),
            recipient: recipient.clone(),
        });
        Ok(())
    }
}
