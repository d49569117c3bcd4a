//! Memory scope types.
//!
//! Scope is derived, never stored. It is recomputed on demand from an
//! observation's session spread and the core-eligibility thresholds, so the
//! same memory can widen from session to project to global as evidence
//! accumulates, with no migration step.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::memory::LongTermMemory;

/// Visibility level of a memory within the hierarchy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Visible only within the session that produced it.
    Session,
    /// Visible across sessions of one project.
    Project,
    /// Visible everywhere.
    Global,
}

impl Scope {
    /// The inheritance chain rooted at this scope, widening toward global.
    pub fn inheritance_chain(&self) -> &'static [Scope] {
        match self {
            Scope::Session => &[Scope::Session, Scope::Project, Scope::Global],
            Scope::Project => &[Scope::Project, Scope::Global],
            Scope::Global => &[Scope::Global],
        }
    }
}

/// A memory paired with its derived scope and scope context.
///
/// `session_id` is the originating session for session-scoped memories;
/// `project` is read from the observation's metadata for project-scoped
/// ones. Both stay `None` when the scope carries no such context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopedMemory {
    /// The underlying long-term memory.
    pub memory: LongTermMemory,
    /// Derived visibility level.
    pub scope: Scope,
    /// Originating session, for session scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Associated project, for project scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl ScopedMemory {
    /// Wrap a memory with its derived scope, without scope context.
    pub fn new(memory: LongTermMemory, scope: Scope) -> Self {
        Self {
            memory,
            scope,
            session_id: None,
            project: None,
        }
    }

    /// Set the originating session.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the associated project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}
