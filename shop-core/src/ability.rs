//! Role/subject/action permission evaluation for admin users.
//!
//! A rule grants `action` on `subject`. `manage` stands for every action and
//! `all` for every subject, so `(all, manage)` is equivalent to super admin.

use serde::Serialize;

use crate::common::error::{Result, ShopError};
use crate::domain::Permission;

pub const MANAGE: &str = "manage";
pub const ALL: &str = "all";

/// Actions checked by handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Act {
    Create,
    Read,
    Update,
    Delete,
}

impl Act {
    pub fn as_str(&self) -> &'static str {
        match self {
            Act::Create => "create",
            Act::Read => "read",
            Act::Update => "update",
            Act::Delete => "delete",
        }
    }
}

/// Subjects seeded by the initial migration.
pub mod subjects {
    pub const PRODUCT: &str = "product";
    pub const CATEGORY: &str = "category";
    pub const SUBCATEGORY: &str = "subcategory";
    pub const ARRIVAL: &str = "arrival";
    pub const REALIZATION: &str = "realization";
    pub const DISCOUNT: &str = "discount";
    pub const EMPLOYEE: &str = "employee";
    pub const PAYROLL: &str = "payroll";
    pub const ORDER: &str = "order";
    pub const REVIEW: &str = "review";
    pub const MEDIA: &str = "media";
    pub const ADMIN_USER: &str = "admin_user";
    pub const SUBJECT: &str = "subject";
    pub const ACTION: &str = "action";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    pub is_super: bool,
    pub rules: Vec<Permission>,
}

impl Ability {
    pub fn new(is_super: bool, rules: Vec<Permission>) -> Self {
        Self { is_super, rules }
    }

    pub fn can(&self, action: &str, subject: &str) -> bool {
        if self.is_super {
            return true;
        }
        self.rules.iter().any(|rule| {
            (rule.subject == subject || rule.subject == ALL) && (rule.action == action || rule.action == MANAGE)
        })
    }

    pub fn ensure(&self, action: Act, subject: &str) -> Result<()> {
        if self.can(action.as_str(), subject) {
            Ok(())
        } else {
            Err(ShopError::Forbidden(format!(
                "not allowed to {} {}",
                action.as_str(),
                subject
            )))
        }
    }

    /// Whether this admin may hand `(subject, action)` to someone else.
    ///
    /// Wildcard rules are reserved for super admins. Anyone else may only pass
    /// on a pair they already hold.
    pub fn ensure_grantable(&self, subject: &str, action: &str) -> Result<()> {
        if self.is_super {
            return Ok(());
        }
        if subject == ALL || action == MANAGE {
            return Err(ShopError::Forbidden(format!(
                "only a super admin may grant {action} on {subject}"
            )));
        }
        if !self.can(action, subject) {
            return Err(ShopError::Forbidden(format!(
                "cannot grant {action} on {subject} without holding it"
            )));
        }
        Ok(())
    }
}
