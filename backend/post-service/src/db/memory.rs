use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FollowRepository, NotificationRepository, PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::pagination::window;
use crate::models::{
    Comment, Follow, ImageAppend, NewNotification, NewPost, NewUser, Notification, Post,
    PostFilter, PostUpdate, ToggleOutcome, User,
};

/// In-process store implementing every repository trait.
///
/// Collections are kept in insertion order; listings walk them backwards to
/// get newest-first results. All mutations take the write lock, so a toggle
/// is a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    posts: Vec<Post>,
    follows: Vec<Follow>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn post_mut(&mut self, post_id: Uuid) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == post_id)
    }
}

fn matches_filter(post: &Post, filter: &PostFilter) -> bool {
    match filter {
        PostFilter::All => true,
        PostFilter::Author(user_id) => post.user_id == *user_id,
        PostFilter::Authors(user_ids) => user_ids.contains(&post.user_id),
        PostFilter::SavedBy(user_id) => post.saves.contains(user_id),
        PostFilter::LikedBy(user_id) => post.likes.contains(user_id),
    }
}

/// Add `user_id` when absent, remove it when present. Returns whether it is
/// now a member.
fn toggle_member(members: &mut Vec<Uuid>, user_id: Uuid) -> bool {
    if let Some(pos) = members.iter().position(|id| *id == user_id) {
        members.remove(pos);
        false
    } else {
        members.push(user_id);
        true
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        let taken = state.users.iter().any(|u| {
            u.username == new_user.username || u.email.eq_ignore_ascii_case(&new_user.email)
        });
        if taken {
            return Err(AppError::Conflict(
                "Username or email already registered".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            avatar: None,
            created_at: Utc::now(),
        };
        state.users.push(user.clone());

        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, new_post: NewPost) -> Result<Post> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            user_id: new_post.user_id,
            title: new_post.title,
            text: new_post.text,
            images: Vec::new(),
            likes: Vec::new(),
            saves: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.state.write().await.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let state = self.state.read().await;
        Ok(state.posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn update_post(&self, post_id: Uuid, update: PostUpdate) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state.post_mut(post_id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(text) = update.text {
            post.text = text;
        }
        post.updated_at = Utc::now();

        Ok(Some(post.clone()))
    }

    async fn append_images(
        &self,
        post_id: Uuid,
        images: &[String],
        max_images: usize,
    ) -> Result<ImageAppend> {
        let mut state = self.state.write().await;
        let Some(post) = state.post_mut(post_id) else {
            return Ok(ImageAppend::PostNotFound);
        };

        if post.images.len() + images.len() > max_images {
            return Ok(ImageAppend::LimitExceeded);
        }
        post.images.extend_from_slice(images);
        post.updated_at = Utc::now();

        Ok(ImageAppend::Appended(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.posts.len();
        state.posts.retain(|p| p.id != post_id);
        let removed = state.posts.len() < before;

        if removed {
            state
                .notifications
                .retain(|n| n.post_id != Some(post_id));
        }

        Ok(removed)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)> {
        let state = self.state.read().await;
        let matching: Vec<Post> = state
            .posts
            .iter()
            .rev()
            .filter(|p| matches_filter(p, filter))
            .cloned()
            .collect();

        let total = matching.len() as i64;
        Ok((window(&matching, limit, offset), total))
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>> {
        let mut state = self.state.write().await;
        Ok(state.post_mut(post_id).map(|post| {
            let active = toggle_member(&mut post.likes, user_id);
            ToggleOutcome {
                post_id,
                active,
                users: post.likes.clone(),
            }
        }))
    }

    async fn toggle_save(&self, post_id: Uuid, user_id: Uuid) -> Result<Option<ToggleOutcome>> {
        let mut state = self.state.write().await;
        Ok(state.post_mut(post_id).map(|post| {
            let active = toggle_member(&mut post.saves, user_id);
            ToggleOutcome {
                post_id,
                active,
                users: post.saves.clone(),
            }
        }))
    }

    async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: String,
    ) -> Result<Option<Vec<Comment>>> {
        let mut state = self.state.write().await;
        Ok(state.post_mut(post_id).map(|post| {
            post.comments.push(Comment {
                id: Uuid::new_v4(),
                post_id,
                user_id,
                text,
                created_at: Utc::now(),
            });
            post.comments.clone()
        }))
    }

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .and_then(|p| p.comments.iter().find(|c| c.id == comment_id))
            .cloned())
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Vec<Comment>> {
        let mut state = self.state.write().await;
        match state.post_mut(post_id) {
            Some(post) => {
                post.comments.retain(|c| c.id != comment_id);
                Ok(post.comments.clone())
            }
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn toggle_follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        if follower_id == following_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        let mut state = self.state.write().await;
        let existing = state
            .follows
            .iter()
            .position(|f| f.follower_id == follower_id && f.following_id == following_id);

        match existing {
            Some(pos) => {
                state.follows.remove(pos);
                Ok(false)
            }
            None => {
                state.follows.push(Follow {
                    follower_id,
                    following_id,
                    created_at: Utc::now(),
                });
                Ok(true)
            }
        }
    }

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    async fn following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect())
    }

    async fn list_following(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .rev()
            .filter(|f| f.follower_id == user_id)
            .map(|f| f.following_id)
            .collect();

        let total = ids.len() as i64;
        Ok((window(&ids, limit, offset), total))
    }

    async fn list_followers(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Uuid>, i64)> {
        let state = self.state.read().await;
        let ids: Vec<Uuid> = state
            .follows
            .iter()
            .rev()
            .filter(|f| f.following_id == user_id)
            .map(|f| f.follower_id)
            .collect();

        let total = ids.len() as i64;
        Ok((window(&ids, limit, offset), total))
    }

    async fn follow_counts(&self, user_id: Uuid) -> Result<(i64, i64)> {
        let state = self.state.read().await;
        let followers = state
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .count() as i64;
        let following = state
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .count() as i64;

        Ok((followers, following))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(&self, new: NewNotification) -> Result<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: new.recipient_id,
            sender_id: new.sender_id,
            kind: new.kind,
            post_id: new.post_id,
            read: false,
            created_at: Utc::now(),
        };

        self.state
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Notification>, i64)> {
        let state = self.state.read().await;
        let mine: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();

        let total = mine.len() as i64;
        Ok((window(&mine, limit, offset), total))
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as i64)
    }

    async fn mark_read(
        &self,
        notification_id: Uuid,
        recipient_id: Uuid,
    ) -> Result<Option<Notification>> {
        let mut state = self.state.write().await;
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.recipient_id == recipient_id)
            .map(|n| {
                n.read = true;
                n.clone()
            }))
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
        {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, notification_id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == notification_id && n.recipient_id == recipient_id));
        Ok(state.notifications.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationKind, Role};
    use std::sync::Arc;

    async fn seed_user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap()
    }

    async fn seed_post(store: &MemoryStore, user_id: Uuid, text: &str) -> Post {
        store
            .create_post(NewPost {
                user_id,
                title: None,
                text: text.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        seed_user(&store, "alice").await;

        let err = store
            .create_user(NewUser {
                username: "alice2".to_string(),
                email: "ALICE@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_posts_newest_first_with_total() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        for i in 0..5 {
            seed_post(&store, alice.id, &format!("post {}", i)).await;
        }

        let (page, total) = store.list_posts(&PostFilter::All, 2, 0).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page[0].text, "post 4");
        assert_eq!(page[1].text, "post 3");

        let (page, _) = store.list_posts(&PostFilter::All, 2, 4).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text, "post 0");
    }

    #[tokio::test]
    async fn test_toggle_like_twice_restores_state() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let post = seed_post(&store, alice.id, "hello").await;

        let first = store.toggle_like(post.id, alice.id).await.unwrap().unwrap();
        assert!(first.active);
        assert_eq!(first.users, vec![alice.id]);

        let second = store.toggle_like(post.id, alice.id).await.unwrap().unwrap();
        assert!(!second.active);
        assert!(second.users.is_empty());

        assert!(store
            .toggle_like(Uuid::new_v4(), alice.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_ids_unique() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed_user(&store, "alice").await;
        let post = seed_post(&store, alice.id, "hello").await;

        let (post_id, user_id) = (post.id, alice.id);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.toggle_save(post_id, user_id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // an even number of toggles leaves the user out
        let post = store.find_post(post_id).await.unwrap().unwrap();
        assert!(post.saves.is_empty());
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments_and_notifications() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let post = seed_post(&store, alice.id, "hello").await;

        store
            .add_comment(post.id, bob.id, "nice".to_string())
            .await
            .unwrap();
        store
            .create_notification(NewNotification {
                recipient_id: alice.id,
                sender_id: bob.id,
                kind: NotificationKind::Comment,
                post_id: Some(post.id),
            })
            .await
            .unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.find_post(post.id).await.unwrap().is_none());
        assert_eq!(store.unread_count(alice.id).await.unwrap(), 0);
        assert!(!store.delete_post(post.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_toggle_and_counts() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        assert!(store.toggle_follow(alice.id, bob.id).await.unwrap());
        assert!(store.is_following(alice.id, bob.id).await.unwrap());
        assert_eq!(store.follow_counts(bob.id).await.unwrap(), (1, 0));
        assert_eq!(store.follow_counts(alice.id).await.unwrap(), (0, 1));

        assert!(!store.toggle_follow(alice.id, bob.id).await.unwrap());
        assert_eq!(store.follow_counts(bob.id).await.unwrap(), (0, 0));

        assert!(store.toggle_follow(alice.id, alice.id).await.is_err());
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_recipient() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        let n = store
            .create_notification(NewNotification {
                recipient_id: alice.id,
                sender_id: bob.id,
                kind: NotificationKind::Follow,
                post_id: None,
            })
            .await
            .unwrap();

        assert!(store.mark_read(n.id, bob.id).await.unwrap().is_none());
        assert!(store.mark_read(n.id, alice.id).await.unwrap().unwrap().read);
        assert_eq!(store.mark_all_read(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_images_enforces_limit_under_lock() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let post = seed_post(&store, alice.id, "gallery").await;
        let images: Vec<String> = (0..4)
            .map(|i| format!("/uploads/{}/{}.png", post.id, i))
            .collect();

        let first = store.append_images(post.id, &images, 6).await.unwrap();
        assert!(matches!(first, ImageAppend::Appended(ref p) if p.images.len() == 4));

        let second = store.append_images(post.id, &images, 6).await.unwrap();
        assert!(matches!(second, ImageAppend::LimitExceeded));
        assert_eq!(store.find_post(post.id).await.unwrap().unwrap().images.len(), 4);

        let missing = store.append_images(Uuid::new_v4(), &images, 6).await.unwrap();
        assert!(matches!(missing, ImageAppend::PostNotFound));
    }

    #[tokio::test]
    async fn test_update_can_clear_title() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let post = store
            .create_post(NewPost {
                user_id: alice.id,
                title: Some("Draft".to_string()),
                text: "body".to_string(),
            })
            .await
            .unwrap();

        let edit = PostUpdate {
            title: None,
            text: Some("edited".to_string()),
        };
        let kept = store.update_post(post.id, edit).await.unwrap().unwrap();
        assert_eq!(kept.title.as_deref(), Some("Draft"));

        let clear = PostUpdate {
            title: Some(None),
            text: None,
        };
        let cleared = store.update_post(post.id, clear).await.unwrap().unwrap();
        assert_eq!(cleared.title, None);
        assert_eq!(cleared.text, "edited");
    }
}
