/// Ownership checks for posts and comments
///
/// The owner of a resource may modify it, and so may any `root` account.
/// Failures surface as 401 with a fixed message.
use uuid::Uuid;

use super::AuthUser;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post, Role};

const NOT_AUTHORIZED: &str = "User not authorized";

impl AuthUser {
    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }

    pub fn can_modify(&self, owner_id: Uuid) -> bool {
        self.id == owner_id || self.is_root()
    }
}

/// Post owner or root
pub fn check_post_ownership(user: &AuthUser, post: &Post) -> Result<()> {
    if user.can_modify(post.user_id) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()))
    }
}

/// Comment author, owner of the post it sits on, or root
pub fn check_comment_deletion(user: &AuthUser, post: &Post, comment: &Comment) -> Result<()> {
    if user.can_modify(comment.user_id) || user.can_modify(post.user_id) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(NOT_AUTHORIZED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post_by(owner: Uuid) -> Post {
        Post {
            id: Uuid::new_v4(),
            user_id: owner,
            title: None,
            text: "hello".to_string(),
            images: Vec::new(),
            likes: Vec::new(),
            saves: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn test_owner_and_root_can_modify() {
        let owner = user(Role::User);
        let post = post_by(owner.id);

        assert!(check_post_ownership(&owner, &post).is_ok());
        assert!(check_post_ownership(&user(Role::Root), &post).is_ok());
    }

    #[test]
    fn test_others_cannot_modify() {
        let post = post_by(Uuid::new_v4());

        assert!(matches!(
            check_post_ownership(&user(Role::User), &post),
            Err(AppError::Unauthorized(_))
        ));
        // admin carries no ownership override
        assert!(check_post_ownership(&user(Role::Admin), &post).is_err());
    }

    #[test]
    fn test_comment_deletion() {
        let owner = user(Role::User);
        let author = user(Role::User);
        let post = post_by(owner.id);
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: post.id,
            user_id: author.id,
            text: "nice".to_string(),
            created_at: Utc::now(),
        };

        assert!(check_comment_deletion(&author, &post, &comment).is_ok());
        assert!(check_comment_deletion(&owner, &post, &comment).is_ok());
        assert!(check_comment_deletion(&user(Role::Root), &post, &comment).is_ok());
        assert!(check_comment_deletion(&user(Role::User), &post, &comment).is_err());
    }
}
