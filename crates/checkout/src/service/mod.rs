//! Cart and order orchestration.
//!
//! Services own the control flow of the checkout pipeline: they read and
//! write through the store traits, enforce the guards (stock, coupon
//! validity, status transitions, ownership), and keep the cart's derived
//! totals current. Each service is generic over its store handle, which is
//! injected at construction.

pub mod cart;
pub mod order;

pub use cart::CartService;
pub use order::{CreateOrderInput, OrderService, StatusUpdate};

use clementine_core::{UserId, UserRole};

/// The authenticated identity behind a request, as asserted by the
/// upstream gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Requester {
    /// A regular shopper.
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: UserRole::Customer,
        }
    }

    /// A store administrator.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: UserRole::Admin,
        }
    }

    /// Whether this requester has the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether this requester may act on a resource owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_access() {
        let owner = UserId::new(1);
        assert!(Requester::customer(owner).can_access(owner));
        assert!(!Requester::customer(UserId::new(2)).can_access(owner));
        assert!(Requester::admin(UserId::new(2)).can_access(owner));
    }
}
