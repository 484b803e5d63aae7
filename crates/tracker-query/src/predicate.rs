use tracker_types::models::{Application, ApplicationStatus, ApplicationType};
use uuid::Uuid;

use crate::dates::DateRange;

/// Free-text columns that substring filters may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    CompanyName,
    Position,
    Location,
    Notes,
}

impl TextField {
    /// Fields a `keyword` search fans out across.
    pub const KEYWORD: [TextField; 4] = [
        TextField::CompanyName,
        TextField::Position,
        TextField::Notes,
        TextField::Location,
    ];

    pub fn value<'a>(&self, app: &'a Application) -> &'a str {
        match self {
            TextField::CompanyName => &app.company_name,
            TextField::Position => &app.position,
            TextField::Location => &app.location,
            TextField::Notes => &app.notes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Status(ApplicationStatus),
    Type(ApplicationType),
    AppliedWithin(DateRange),
    /// Case-insensitive substring match on one field.
    Contains(TextField, String),
    /// Case-insensitive substring match on any of the fields.
    AnyContains(Vec<TextField>, String),
}

impl Condition {
    pub fn matches(&self, app: &Application) -> bool {
        match self {
            Condition::Status(status) => app.status == *status,
            Condition::Type(kind) => app.application_type == *kind,
            Condition::AppliedWithin(range) => range.contains(app.application_date),
            Condition::Contains(field, needle) => contains_ci(field.value(app), needle),
            Condition::AnyContains(fields, needle) => {
                fields.iter().any(|field| contains_ci(field.value(app), needle))
            }
        }
    }
}

/// A conjunction of conditions, always scoped to a single owner.
///
/// The only way to build one is [`Predicate::for_owner`], so a query that
/// forgets the owner cannot be expressed.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    owner: Uuid,
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn for_owner(owner: Uuid) -> Self {
        Self {
            owner,
            conditions: Vec::new(),
        }
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// In-memory evaluation with the same semantics the store compiles to.
    pub fn matches(&self, app: &Application) -> bool {
        app.owner == self.owner && self.conditions.iter().all(|c| c.matches(app))
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
