/// Role and ownership checks over an already validated identity.

use crate::auth::claims::{Identity, Role};
use crate::error::AuthError;

/// The caller's role must equal `required` exactly.
pub fn require_role(identity: &Identity, required: Role) -> Result<(), AuthError> {
    if identity.user_type != required {
        return Err(AuthError::Unauthorized);
    }
    Ok(())
}

/// Regular users may only act on their own resource; any other role must be
/// `privileged`.
pub fn require_self_or_role(
    identity: &Identity,
    requested_owner_id: &str,
    privileged: Role,
) -> Result<(), AuthError> {
    if identity.user_type == Role::User {
        if identity.user_id != requested_owner_id {
            return Err(AuthError::Unauthorized);
        }
        return Ok(());
    }

    require_role(identity, privileged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, user_id: &str) -> Identity {
        Identity {
            email_address: format!("{}@x.com", user_id),
            first_name: "Test".to_string(),
            last_name: "Caller".to_string(),
            user_type: role,
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&caller(Role::Admin, "a1"), Role::Admin).is_ok());
        assert!(matches!(
            require_role(&caller(Role::User, "u1"), Role::Admin),
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            require_role(&caller(Role::Admin, "a1"), Role::User),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_user_cannot_act_on_someone_else() {
        let result = require_self_or_role(&caller(Role::User, "u1"), "u2", Role::Admin);
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn test_user_can_act_on_self() {
        assert!(require_self_or_role(&caller(Role::User, "u1"), "u1", Role::Admin).is_ok());
    }

    #[test]
    fn test_admin_can_act_on_anyone() {
        let admin = caller(Role::Admin, "a1");
        for owner in ["a1", "u1", "u2", ""] {
            assert!(require_self_or_role(&admin, owner, Role::Admin).is_ok());
        }
    }

    #[test]
    fn test_non_user_role_is_checked_against_privileged_role() {
        // A privileged role other than ADMIN turns admins away too.
        let result = require_self_or_role(&caller(Role::Admin, "a1"), "a1", Role::User);
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }
}
