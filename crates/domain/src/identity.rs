//! Resolved caller identity.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// The authenticated caller, passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Identity {
    /// Creates a regular (non-admin) identity.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    /// Creates an admin identity.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Returns true if the caller owns the resource or is an admin.
    pub fn can_manage(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "only admins can {action}"
            )))
        }
    }
}
