//! Authorization gate
//!
//! A single pure function decides every role check in the system. It takes
//! an already-resolved principal, the requested action and (where relevant)
//! the owning account of the target resource, and performs no I/O, so it is
//! unit-testable without a database.

use uuid::Uuid;

use crate::{
    error::Deny,
    models::principal::{Principal, PrincipalKind},
};

/// Every gated operation, as a tagged variant rather than a string, so the
/// compiler enforces exhaustiveness when routes are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListUsers,
    ViewUser,
    UpdateUser,
    DeleteUser,
    CreateStaff,
    ListStaff,
    ViewStaff,
    UpdateStaff,
    DeleteStaff,
    IssueLoan,
    ReturnLoan,
    ListLoans,
    ViewLoan,
    DeleteLoan,
    LinkExternalIdentity,
}

/// Who may perform an action, before ownership is considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Any active principal
    Any,
    /// Any active staff member
    Staff,
    /// Admins only
    Admin,
    /// The owning account, or any staff member
    OwnerOrStaff,
    /// The owning account, or an admin
    OwnerOrAdmin,
}

impl Action {
    fn scope(&self) -> Scope {
        match self {
            Action::ListUsers => Scope::Staff,
            Action::ViewUser => Scope::OwnerOrStaff,
            Action::UpdateUser => Scope::OwnerOrAdmin,
            Action::DeleteUser => Scope::Admin,
            Action::CreateStaff => Scope::Admin,
            Action::ListStaff => Scope::Staff,
            Action::ViewStaff => Scope::Staff,
            Action::UpdateStaff => Scope::OwnerOrAdmin,
            Action::DeleteStaff => Scope::Admin,
            Action::IssueLoan => Scope::Staff,
            Action::ReturnLoan => Scope::Staff,
            Action::ListLoans => Scope::Staff,
            Action::ViewLoan => Scope::OwnerOrStaff,
            Action::DeleteLoan => Scope::Admin,
            Action::LinkExternalIdentity => Scope::Any,
        }
    }
}

/// Decide whether `principal` may perform `action` on a resource owned by
/// `owner` (if the action is owner-scoped). Rules are evaluated in order;
/// the first matching denial wins.
pub fn authorize(principal: &Principal, action: Action, owner: Option<Uuid>) -> Result<(), Deny> {
    if !principal.active {
        return Err(Deny::AccountInactive);
    }

    let is_staff = principal.kind == PrincipalKind::Staff;
    let owns = owner.is_some_and(|o| o == principal.id);

    match action.scope() {
        Scope::Any => Ok(()),
        Scope::Admin => {
            if principal.is_admin {
                Ok(())
            } else {
                Err(Deny::AdminRequired)
            }
        }
        Scope::Staff => {
            if is_staff || principal.is_admin {
                Ok(())
            } else {
                Err(Deny::StaffRequired)
            }
        }
        Scope::OwnerOrStaff => {
            if owns || is_staff || principal.is_admin {
                Ok(())
            } else {
                Err(Deny::OwnershipRequired)
            }
        }
        Scope::OwnerOrAdmin => {
            if owns || principal.is_admin {
                Ok(())
            } else {
                Err(Deny::OwnershipRequired)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(kind: PrincipalKind, is_admin: bool, active: bool) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            kind,
            email: "p@example.org".to_string(),
            display_name: "Test Principal".to_string(),
            is_admin,
            active,
        }
    }

    #[test]
    fn inactive_account_denied_before_anything_else() {
        // Even an admin is denied once inactive, and the reason is the
        // account state, not a missing role.
        let p = principal(PrincipalKind::Staff, true, false);
        assert_eq!(
            authorize(&p, Action::ViewUser, Some(p.id)),
            Err(Deny::AccountInactive)
        );
        assert_eq!(
            authorize(&p, Action::DeleteUser, None),
            Err(Deny::AccountInactive)
        );
    }

    #[test]
    fn admin_actions_require_admin_flag() {
        let staff = principal(PrincipalKind::Staff, false, true);
        assert_eq!(
            authorize(&staff, Action::DeleteUser, None),
            Err(Deny::AdminRequired)
        );

        let admin = principal(PrincipalKind::Staff, true, true);
        assert_eq!(authorize(&admin, Action::DeleteUser, None), Ok(()));
    }

    #[test]
    fn staff_actions_denied_to_members() {
        let member = principal(PrincipalKind::User, false, true);
        assert_eq!(
            authorize(&member, Action::IssueLoan, None),
            Err(Deny::StaffRequired)
        );

        let staff = principal(PrincipalKind::Staff, false, true);
        assert_eq!(authorize(&staff, Action::IssueLoan, None), Ok(()));
    }

    #[test]
    fn owner_may_touch_own_record_only() {
        let member = principal(PrincipalKind::User, false, true);
        assert_eq!(authorize(&member, Action::UpdateUser, Some(member.id)), Ok(()));
        assert_eq!(
            authorize(&member, Action::UpdateUser, Some(Uuid::new_v4())),
            Err(Deny::OwnershipRequired)
        );
    }

    #[test]
    fn admin_overrides_ownership() {
        let admin = principal(PrincipalKind::Staff, true, true);
        assert_eq!(
            authorize(&admin, Action::UpdateUser, Some(Uuid::new_v4())),
            Ok(())
        );
    }

    #[test]
    fn staff_may_view_but_not_update_member_records() {
        let staff = principal(PrincipalKind::Staff, false, true);
        let other = Some(Uuid::new_v4());
        assert_eq!(authorize(&staff, Action::ViewUser, other), Ok(()));
        assert_eq!(
            authorize(&staff, Action::UpdateUser, other),
            Err(Deny::OwnershipRequired)
        );
    }

    #[test]
    fn any_active_principal_may_link_identity() {
        let member = principal(PrincipalKind::User, false, true);
        assert_eq!(authorize(&member, Action::LinkExternalIdentity, None), Ok(()));
    }
}
