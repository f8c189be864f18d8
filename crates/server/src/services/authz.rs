//! Central authorization policy.
//!
//! Every staff entry point consults [`can`] instead of re-deriving role
//! checks locally. Ownership scoping of per-user rows (orders, addresses,
//! cart items) is handled in the repositories, where foreign rows read as
//! missing.

use securecart_core::Role;

/// Actions gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Browse all orders and their details on the staff surface.
    ViewOrders,
    /// Advance an order through its status machine.
    TransitionOrder,
    /// Create or edit catalog products, including the low-stock view.
    ManageProducts,
    /// List accounts on the staff surface.
    ViewUsers,
    /// Edit an account with the given role.
    EditUser {
        /// Role of the account being edited.
        target: Role,
    },
    /// Change an account's role.
    AssignRole,
    /// Read the login audit log.
    ViewAuditLog,
    /// Bulk-delete the login audit log.
    PurgeAuditLog,
}

/// Whether `actor` may perform `action`.
#[must_use]
pub const fn can(actor: Role, action: Action) -> bool {
    match action {
        Action::ViewOrders
        | Action::TransitionOrder
        | Action::ManageProducts
        | Action::ViewUsers => actor.is_staff(),
        // Non-superuser staff may only touch customer accounts.
        Action::EditUser { target } => {
            actor.is_superuser() || (actor.is_staff() && matches!(target, Role::Customer))
        }
        Action::AssignRole | Action::ViewAuditLog | Action::PurgeAuditLog => actor.is_superuser(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customers_have_no_staff_powers() {
        for action in [
            Action::ViewOrders,
            Action::TransitionOrder,
            Action::ManageProducts,
            Action::ViewUsers,
            Action::AssignRole,
            Action::ViewAuditLog,
            Action::PurgeAuditLog,
        ] {
            assert!(!can(Role::Customer, action));
        }
    }

    #[test]
    fn test_admin_powers() {
        assert!(can(Role::Admin, Action::ViewOrders));
        assert!(can(Role::Admin, Action::TransitionOrder));
        assert!(can(Role::Admin, Action::ManageProducts));
        assert!(can(Role::Admin, Action::ViewUsers));
        // Admins manage customers but not other staff, roles, or the audit log.
        assert!(can(Role::Admin, Action::EditUser { target: Role::Customer }));
        assert!(!can(Role::Admin, Action::EditUser { target: Role::Admin }));
        assert!(!can(Role::Admin, Action::EditUser { target: Role::Superuser }));
        assert!(!can(Role::Admin, Action::AssignRole));
        assert!(!can(Role::Admin, Action::ViewAuditLog));
        assert!(!can(Role::Admin, Action::PurgeAuditLog));
    }

    #[test]
    fn test_superuser_powers() {
        assert!(can(Role::Superuser, Action::AssignRole));
        assert!(can(Role::Superuser, Action::ViewAuditLog));
        assert!(can(Role::Superuser, Action::PurgeAuditLog));
        assert!(can(Role::Superuser, Action::EditUser { target: Role::Admin }));
        assert!(can(Role::Superuser, Action::EditUser { target: Role::Superuser }));
    }
}
