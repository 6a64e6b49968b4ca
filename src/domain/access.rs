//! Role-based access predicates.
//!
//! Three tiers of write access exist: user management is admin-only, the
//! catalog (categories, genres, titles) is admin-writable, and content
//! (reviews, comments) is writable by its author plus any staff member.
//! Reads are open to everyone, including anonymous callers.

use crate::entities::users::Model as User;

/// Admin-only surfaces: user management and catalog writes.
#[must_use]
pub fn is_admin(user: &User) -> bool {
    user.role.is_admin()
}

/// Staff may act on other people's content: moderators and admins.
#[must_use]
pub fn is_staff(user: &User) -> bool {
    user.role.is_staff()
}

/// A review or comment can be modified by its author or by staff.
#[must_use]
pub fn can_modify_content(user: &User, author_id: i32) -> bool {
    user.id == author_id || is_staff(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users::Role;

    fn user_with_role(id: i32, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            first_name: None,
            last_name: None,
            bio: None,
            role,
            confirmation_code: "code".to_string(),
        }
    }

    #[test]
    fn admin_is_staff_and_admin() {
        let admin = user_with_role(1, Role::Admin);
        assert!(is_admin(&admin));
        assert!(is_staff(&admin));
    }

    #[test]
    fn moderator_is_staff_but_not_admin() {
        let moderator = user_with_role(2, Role::Moderator);
        assert!(!is_admin(&moderator));
        assert!(is_staff(&moderator));
    }

    #[test]
    fn author_can_modify_own_content_only() {
        let user = user_with_role(3, Role::User);
        assert!(can_modify_content(&user, 3));
        assert!(!can_modify_content(&user, 4));
    }

    #[test]
    fn moderator_can_modify_others_content() {
        let moderator = user_with_role(2, Role::Moderator);
        assert!(can_modify_content(&moderator, 99));
    }
}
