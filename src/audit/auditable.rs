use uuid::Uuid;

use crate::models::audit::AuditAction;

/// Entities that appear as the subject of audit entries.
pub trait Auditable {
    /// Resource name stored in the `resource` column ("task", "user", ...).
    fn resource_name() -> &'static str;

    fn audit_id(&self) -> Uuid;

    /// Short human label, e.g. a task title or a user's email.
    fn audit_label(&self) -> String;
}

pub(crate) fn describe<T: Auditable>(action: AuditAction, entity: &T) -> String {
    let verb = match action {
        AuditAction::Create => "Created",
        AuditAction::Read => "Read",
        AuditAction::Update => "Updated",
        AuditAction::Delete => "Deleted",
        AuditAction::Login => "Logged in",
        AuditAction::Logout => "Logged out",
        AuditAction::AccessDenied => "Denied access to",
    };
    format!("{verb} {} '{}'", T::resource_name(), entity.audit_label())
}
