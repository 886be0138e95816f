//! Invocation policy of a curation task.
//!
//! A task never carries its policy directly. It carries a [`TaskDeclaration`],
//! an ordered list of [`Marker`]s written by registration code or read from a
//! task descriptor, and the wrapper materializes a [`TaskPolicy`] from it once.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

/// Which invocation of the curator a suspend request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Invoked {
    Interactive,
    Batch,
    Any,
}

impl Invoked {
    /// True when a task suspending in `self` mode should halt a curator running in `current`.
    pub fn applies_to(self, current: Invoked) -> bool {
        self == Invoked::Any || self == current
    }
}

/// One "record this" request: emit `record_type`/`value` whenever the task
/// returns a status code contained in `status_codes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpec {
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub status_codes: BTreeSet<i32>,
}

impl RecordSpec {
    pub fn new(record_type: &str, value: &str, status_codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            record_type: record_type.to_string(),
            value: value.to_string(),
            status_codes: status_codes.into_iter().collect(),
        }
    }

    pub fn triggers_on(&self, status: i32) -> bool {
        self.status_codes.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Distributive,
    Mutative,
    Suspendable {
        invoked: Invoked,
        status_codes: Vec<i32>,
    },
    Record(RecordSpec),
    Records(Vec<RecordSpec>),
}

/// Declarative metadata attached to a task at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDeclaration {
    markers: Vec<Marker>,
}

impl TaskDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn distributive(self) -> Self {
        self.marker(Marker::Distributive)
    }

    pub fn mutative(self) -> Self {
        self.marker(Marker::Mutative)
    }

    pub fn suspendable(self, invoked: Invoked, status_codes: impl IntoIterator<Item = i32>) -> Self {
        self.marker(Marker::Suspendable {
            invoked,
            status_codes: status_codes.into_iter().collect(),
        })
    }

    pub fn record(self, record_type: &str, value: &str, status_codes: impl IntoIterator<Item = i32>) -> Self {
        self.marker(Marker::Record(RecordSpec::new(record_type, value, status_codes)))
    }

    pub fn records(self, specs: Vec<RecordSpec>) -> Self {
        self.marker(Marker::Records(specs))
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Suspend metadata surfaced to the curator. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub invoked: Invoked,
    pub status_codes: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPolicy {
    pub distributive: bool,
    pub mutative: bool,
    pub suspension: Option<Suspension>,
    pub record_specs: Vec<RecordSpec>,
}

impl TaskPolicy {
    pub fn extract(declaration: &TaskDeclaration) -> Self {
        let mut policy = TaskPolicy::default();
        for marker in declaration.markers() {
            match marker {
                Marker::Distributive => policy.distributive = true,
                Marker::Mutative => policy.mutative = true,
                Marker::Suspendable { invoked, status_codes } => {
                    policy.suspension = Some(Suspension {
                        invoked: *invoked,
                        status_codes: status_codes.clone(),
                    });
                }
                Marker::Record(spec) => policy.record_specs.push(spec.clone()),
                Marker::Records(specs) => policy.record_specs.extend(specs.iter().cloned()),
            }
        }
        policy
    }

    pub fn requires_recorder(&self) -> bool {
        !self.record_specs.is_empty()
    }

    /// Specs that fire for `status`, in declaration order.
    pub fn triggered(&self, status: i32) -> impl Iterator<Item = &RecordSpec> {
        self.record_specs.iter().filter(move |spec| spec.triggers_on(status))
    }
}
