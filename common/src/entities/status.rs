use std::{fmt, str::FromStr};

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// Why a complaint is considered done. Both literals are kept on the wire
/// for compatibility with stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Closure {
    Completed,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ComplaintStatus {
    #[default]
    Pending,
    InProgress,
    PartialCompleted,
    Done(Closure),
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display(fmt = "Unknown complaint status: {}", _0)]
pub struct UnknownStatus(#[error(not(source))] pub String);

impl ComplaintStatus {
    pub const COMPLETED: ComplaintStatus = ComplaintStatus::Done(Closure::Completed);
    pub const RESOLVED: ComplaintStatus = ComplaintStatus::Done(Closure::Resolved);

    pub const ALL: [ComplaintStatus; 5] = [
        ComplaintStatus::Pending,
        ComplaintStatus::InProgress,
        ComplaintStatus::PartialCompleted,
        ComplaintStatus::COMPLETED,
        ComplaintStatus::RESOLVED,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::InProgress => "in-progress",
            ComplaintStatus::PartialCompleted => "partial-completed",
            ComplaintStatus::Done(Closure::Completed) => "completed",
            ComplaintStatus::Done(Closure::Resolved) => "resolved",
        }
    }

    /// Capitalized form used in audit actions, e.g. `In-progress`.
    pub fn label(&self) -> String {
        let mut chars = self.as_str().chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ComplaintStatus::Done(_))
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ComplaintStatus::Pending),
            "in-progress" => Ok(ComplaintStatus::InProgress),
            "partial-completed" => Ok(ComplaintStatus::PartialCompleted),
            "completed" => Ok(ComplaintStatus::COMPLETED),
            "resolved" => Ok(ComplaintStatus::RESOLVED),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl From<ComplaintStatus> for String {
    fn from(status: ComplaintStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<String> for ComplaintStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

type Transition = (ComplaintStatus, ComplaintStatus);

/// Moves towards completion. Terminal statuses have no way out.
const FORWARD_ONLY: &[Transition] = &[
    (ComplaintStatus::Pending, ComplaintStatus::InProgress),
    (ComplaintStatus::Pending, ComplaintStatus::PartialCompleted),
    (ComplaintStatus::Pending, ComplaintStatus::COMPLETED),
    (ComplaintStatus::Pending, ComplaintStatus::RESOLVED),
    (ComplaintStatus::InProgress, ComplaintStatus::PartialCompleted),
    (ComplaintStatus::InProgress, ComplaintStatus::COMPLETED),
    (ComplaintStatus::InProgress, ComplaintStatus::RESOLVED),
    (ComplaintStatus::PartialCompleted, ComplaintStatus::InProgress),
    (ComplaintStatus::PartialCompleted, ComplaintStatus::COMPLETED),
    (ComplaintStatus::PartialCompleted, ComplaintStatus::RESOLVED),
];

/// Which status changes a status update may perform.
///
/// `Permissive` is how complaints have always behaved: any status may be
/// written over any other, including reopening a finished complaint.
/// `ForwardOnly` uses the built-in forward table and `Table` an explicit
/// list of permitted `(from, to)` pairs. Re-reporting the current status is
/// always allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    ForwardOnly,
    Table(Vec<Transition>),
}

impl TransitionPolicy {
    pub fn allows(&self, from: ComplaintStatus, to: ComplaintStatus) -> bool {
        if from == to {
            return true;
        }
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::ForwardOnly => FORWARD_ONLY.contains(&(from, to)),
            TransitionPolicy::Table(permitted) => permitted.contains(&(from, to)),
        }
    }
}

/// `permissive`, `forward-only`, or a comma separated list of pairs such as
/// `pending->in-progress,in-progress->completed`.
impl FromStr for TransitionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward-only" => Ok(TransitionPolicy::ForwardOnly),
            table if table.contains("->") => table
                .split(',')
                .map(|pair| -> anyhow::Result<Transition> {
                    let (from, to) = pair
                        .split_once("->")
                        .ok_or_else(|| anyhow::anyhow!("Malformed transition: {}", pair.trim()))?;
                    Ok((from.trim().parse()?, to.trim().parse()?))
                })
                .collect::<anyhow::Result<Vec<_>>>()
                .map(TransitionPolicy::Table),
            other => Err(anyhow::anyhow!("Unknown transition policy: {}", other)),
        }
    }
}
