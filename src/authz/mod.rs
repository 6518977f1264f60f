//! Authorization: role/permission model, organization scoping and the
//! access policy engine.
//!
//! Requests pass two independent layers:
//! - the route [`Requirement`] gate (permissions and roles), enforced by the
//!   [`enforce_requirement`] middleware
//! - the resource policy ([`AccessPolicy::authorize`] and the organization
//!   and user rules), applied by the services once the target is loaded

mod evaluator;
mod guard;
mod model;
mod principal;
pub mod requirement;
pub mod scope;

pub use evaluator::{AccessPolicy, Decision};
pub use guard::enforce_requirement;
pub use model::{Permission, PermissionTable, Role};
pub use principal::{Action, Actor, ResourceKind, ResourceRef};
pub use requirement::{ops, Requirement};
pub use scope::{accessible_org_ids, OrgScope};
