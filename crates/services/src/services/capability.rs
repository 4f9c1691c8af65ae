//! Mutation-time authorization.
//!
//! Every gate is a pure decision over the acting user and an [`Operation`]
//! describing the resource. Callers load whatever context an operation needs
//! (owner ids, assignee departments) before asking.

use db::models::user::{Department, User};
use uuid::Uuid;

use super::error::{DomainError, Result};

#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    UpdateProject { owner_id: Uuid },
    DeleteProject { owner_id: Uuid },
    ArchiveProject { owner_id: Uuid },
    /// Replacing a task or subtask assignee set with a different one.
    ChangeAssignees,
    /// Moving task or subtask ownership to another user.
    AssignOwner,
    /// Editing fields, logging time, archiving or deleting a work item.
    EditWorkItem { is_participant: bool },
    Comment {
        assignees: &'a [Uuid],
        assignee_departments: &'a [Department],
    },
    ProjectReport { is_member: bool },
    UserReport { subject_id: Uuid },
    TeamReport { department: Department },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny(&'static str),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Grant)
    }
}

fn grant_if(condition: bool, reason: &'static str) -> Decision {
    if condition {
        Decision::Grant
    } else {
        Decision::Deny(reason)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityEvaluator {
    admin_project_override: bool,
}

impl CapabilityEvaluator {
    pub fn new(admin_project_override: bool) -> Self {
        Self {
            admin_project_override,
        }
    }

    pub fn evaluate(&self, actor: &User, operation: &Operation<'_>) -> Decision {
        match *operation {
            Operation::UpdateProject { owner_id }
            | Operation::DeleteProject { owner_id }
            | Operation::ArchiveProject { owner_id } => grant_if(
                actor.id == owner_id || (self.admin_project_override && actor.is_admin()),
                "Only the project owner can modify this project",
            ),
            Operation::ChangeAssignees | Operation::AssignOwner => grant_if(
                actor.is_manager_or_admin(),
                "Insufficient permissions: manager or admin role required",
            ),
            Operation::EditWorkItem { is_participant } => grant_if(
                is_participant || actor.is_manager_or_admin(),
                "Insufficient permissions to modify this item",
            ),
            Operation::Comment {
                assignees,
                assignee_departments,
            } => grant_if(
                assignees.contains(&actor.id)
                    || assignee_departments.contains(&actor.department)
                    || actor.is_manager_or_admin(),
                "Insufficient permissions to comment on this item",
            ),
            Operation::ProjectReport { is_member } => grant_if(
                is_member || actor.is_manager_or_admin(),
                "Insufficient permissions to report on this project",
            ),
            Operation::UserReport { subject_id } => grant_if(
                actor.id == subject_id || actor.is_manager_or_admin(),
                "Insufficient permissions to report on this user",
            ),
            Operation::TeamReport { department } => grant_if(
                actor.is_admin() || (actor.is_manager_or_admin() && actor.department == department),
                "Insufficient permissions to report on this team",
            ),
        }
    }

    pub fn require(&self, actor: &User, operation: &Operation<'_>) -> Result<()> {
        match self.evaluate(actor, operation) {
            Decision::Grant => Ok(()),
            Decision::Deny(reason) => {
                tracing::debug!(user_id = %actor.id, ?operation, reason, "Capability denied");
                Err(DomainError::forbidden(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::user::Role;

    use super::*;

    fn user(roles: &[Role], department: Department) -> User {
        User {
            id: Uuid::new_v4(),
            username: "someone@example.com".to_string(),
            roles: roles.to_vec(),
            department,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn staff_cannot_change_assignees_but_managers_can() {
        let evaluator = CapabilityEvaluator::default();
        let staff = user(&[Role::Staff], Department::Engineering);
        let manager = user(&[Role::Staff, Role::Manager], Department::Engineering);

        let err = evaluator.require(&staff, &Operation::ChangeAssignees).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(evaluator.require(&manager, &Operation::ChangeAssignees).is_ok());
        assert!(evaluator.require(&manager, &Operation::AssignOwner).is_ok());
    }

    #[test]
    fn project_mutation_is_owner_only_unless_override_enabled() {
        let admin = user(&[Role::Admin], Department::Hr);
        let owner = user(&[Role::Staff], Department::Hr);
        let op = Operation::DeleteProject { owner_id: owner.id };

        let strict = CapabilityEvaluator::new(false);
        assert!(strict.evaluate(&owner, &op).is_granted());
        assert!(!strict.evaluate(&admin, &op).is_granted());

        let relaxed = CapabilityEvaluator::new(true);
        assert!(relaxed.evaluate(&admin, &op).is_granted());
    }

    #[test]
    fn comment_gate_accepts_assignees_colleagues_and_managers() {
        let evaluator = CapabilityEvaluator::default();
        let assignee = user(&[Role::Staff], Department::Design);
        let colleague = user(&[Role::Staff], Department::Design);
        let outsider = user(&[Role::Staff], Department::Sales);
        let manager = user(&[Role::Manager], Department::Sales);

        let assignees = [assignee.id];
        let departments = [Department::Design];
        let op = Operation::Comment {
            assignees: &assignees,
            assignee_departments: &departments,
        };
        assert!(evaluator.evaluate(&assignee, &op).is_granted());
        assert!(evaluator.evaluate(&colleague, &op).is_granted());
        assert!(evaluator.evaluate(&manager, &op).is_granted());
        assert_eq!(
            evaluator.evaluate(&outsider, &op),
            Decision::Deny("Insufficient permissions to comment on this item")
        );
    }

    #[test]
    fn team_reports_need_a_manager_of_that_team_or_an_admin() {
        let evaluator = CapabilityEvaluator::default();
        let manager = user(&[Role::Manager], Department::Finance);
        let admin = user(&[Role::Admin], Department::Hr);
        let staff = user(&[Role::Staff], Department::Finance);

        let op = Operation::TeamReport {
            department: Department::Finance,
        };
        assert!(evaluator.evaluate(&manager, &op).is_granted());
        assert!(evaluator.evaluate(&admin, &op).is_granted());
        assert!(!evaluator.evaluate(&staff, &op).is_granted());
        assert!(
            !evaluator
                .evaluate(
                    &manager,
                    &Operation::TeamReport {
                        department: Department::Sales
                    }
                )
                .is_granted()
        );
    }
}
