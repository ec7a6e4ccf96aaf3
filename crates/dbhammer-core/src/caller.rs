use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::procedure::ProcedureMetadata;

/// Caller classification used to bias the synthetic traffic mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CallerRole {
    /// Interactive application traffic.
    User,
    /// Scheduled and bulk jobs.
    Batch,
    /// Back-office and operator traffic.
    Admin,
}

impl CallerRole {
    /// All recognized roles, in selection band order.
    pub const ALL: [CallerRole; 3] = [CallerRole::User, CallerRole::Batch, CallerRole::Admin];

    /// Returns the canonical role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Batch => "Batch",
            Self::Admin => "Admin",
        }
    }

    /// Matches a free-form caller tag against the recognized role names,
    /// ignoring ASCII case and surrounding whitespace.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Procedures grouped by caller role, plus the unpartitioned list.
///
/// Read-only after construction; every entry points into the same catalog
/// snapshot.
#[derive(Debug, Clone, Default)]
pub struct CallerBuckets {
    by_role: BTreeMap<CallerRole, Vec<Arc<ProcedureMetadata>>>,
    all: Vec<Arc<ProcedureMetadata>>,
}

impl CallerBuckets {
    #[must_use]
    pub fn new(
        by_role: BTreeMap<CallerRole, Vec<Arc<ProcedureMetadata>>>,
        all: Vec<Arc<ProcedureMetadata>>,
    ) -> Self {
        Self { by_role, all }
    }

    /// Procedures tagged with `role`; empty when none are.
    #[must_use]
    pub fn bucket(&self, role: CallerRole) -> &[Arc<ProcedureMetadata>] {
        self.by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every catalog procedure, tagged or not.
    #[must_use]
    pub fn all(&self) -> &[Arc<ProcedureMetadata>] {
        &self.all
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
