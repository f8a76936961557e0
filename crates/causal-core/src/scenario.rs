//! Scripted scenarios.
//!
//! A scenario is plain data: the group size, one ordered instruction list per
//! process, and optionally where a snapshot round is initiated. Keeping it as
//! a value lets the same runtime execute the reference trace, scenarios
//! loaded from TOML, or generated scripts in tests.

use crate::errors::{CoreError, CoreResult};
use crate::identifiers::ProcessId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One step of a process script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// Local event: advance the own clock component
    Internal {
        /// Event label
        label: String,
    },
    /// Hand a message to the outbound unit
    Send {
        /// Event label, also the label carried by the message
        label: String,
        /// Destination process
        to: ProcessId,
        /// Label of the matching receive at the destination
        peer_label: String,
    },
    /// Wait for the next delivered message and merge its clock
    Receive {
        /// Event label
        label: String,
        /// Label of the matching send at the origin
        peer_label: String,
    },
}

impl Instruction {
    /// Build an internal event.
    pub fn internal(label: impl Into<String>) -> Self {
        Self::Internal {
            label: label.into(),
        }
    }

    /// Build a send request.
    pub fn send(label: impl Into<String>, to: ProcessId, peer_label: impl Into<String>) -> Self {
        Self::Send {
            label: label.into(),
            to,
            peer_label: peer_label.into(),
        }
    }

    /// Build a receive.
    pub fn receive(label: impl Into<String>, peer_label: impl Into<String>) -> Self {
        Self::Receive {
            label: label.into(),
            peer_label: peer_label.into(),
        }
    }

    /// Event label of this step.
    pub fn label(&self) -> &str {
        match self {
            Self::Internal { label } | Self::Send { label, .. } | Self::Receive { label, .. } => {
                label
            }
        }
    }
}

/// Ordered instructions of one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Process executing the script
    pub process: ProcessId,
    /// Steps, consumed strictly in order
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Script {
    /// Create a script.
    pub fn new(process: ProcessId, instructions: Vec<Instruction>) -> Self {
        Self {
            process,
            instructions,
        }
    }

    /// Check the script against a group of `processes` members: the owner
    /// exists and every send targets another existing process.
    pub fn validate(&self, processes: usize) -> CoreResult<()> {
        check_member(self.process, processes)?;
        for instruction in &self.instructions {
            if let Instruction::Send { to, label, .. } = instruction {
                check_member(*to, processes)?;
                if *to == self.process {
                    return Err(CoreError::invalid_scenario(format!(
                        "{} sends {label} to itself",
                        self.process
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_member(process: ProcessId, processes: usize) -> CoreResult<()> {
    if process.index() < processes {
        Ok(())
    } else {
        Err(CoreError::UnknownProcess {
            process,
            processes,
        })
    }
}

/// Where a snapshot round is initiated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTrigger {
    /// Process that initiates the round
    pub initiator: ProcessId,
    /// Label of the internal event after which the round starts
    pub after: String,
}

/// A complete run description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Group size N
    pub processes: usize,
    /// Optional snapshot initiation point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotTrigger>,
    /// One script per process
    #[serde(rename = "script", default)]
    pub scripts: Vec<Script>,
}

impl Scenario {
    /// Script of `process`, if present.
    pub fn script_for(&self, process: ProcessId) -> Option<&Script> {
        self.scripts.iter().find(|s| s.process == process)
    }

    /// Check that the scenario can run.
    ///
    /// Every rank in `0..processes` has exactly one script, sends target an
    /// existing process other than the sender, and the snapshot trigger
    /// names an existing internal event.
    pub fn validate(&self) -> CoreResult<()> {
        if self.processes == 0 {
            return Err(CoreError::invalid_scenario("a group needs at least one process"));
        }

        let mut seen = BTreeSet::new();
        for script in &self.scripts {
            script.validate(self.processes)?;
            if !seen.insert(script.process) {
                return Err(CoreError::invalid_scenario(format!(
                    "{} has more than one script",
                    script.process
                )));
            }
        }
        if let Some(missing) = ProcessId::all(self.processes).find(|p| !seen.contains(p)) {
            return Err(CoreError::invalid_scenario(format!("{missing} has no script")));
        }

        if let Some(trigger) = &self.snapshot {
            check_member(trigger.initiator, self.processes)?;
            let has_event = self
                .script_for(trigger.initiator)
                .map(|script| {
                    script.instructions.iter().any(|i| {
                        matches!(i, Instruction::Internal { label } if *label == trigger.after)
                    })
                })
                .unwrap_or(false);
            if !has_event {
                return Err(CoreError::invalid_scenario(format!(
                    "{} has no internal event {:?} to snapshot after",
                    trigger.initiator, trigger.after
                )));
            }
        }
        Ok(())
    }

    /// The three-process reference trace, snapshot initiated at P0 after `a`.
    ///
    /// ```text
    /// P0: a  b->P1  c<-h  d->P2  e<-l  f->P1  g
    /// P1: h->P0  i<-b  j<-f
    /// P2: k  l->P0  m<-d
    /// ```
    pub fn reference() -> Self {
        let p0 = ProcessId::new(0);
        let p1 = ProcessId::new(1);
        let p2 = ProcessId::new(2);
        Self {
            processes: 3,
            snapshot: Some(SnapshotTrigger {
                initiator: p0,
                after: "a".to_string(),
            }),
            scripts: vec![
                Script::new(
                    p0,
                    vec![
                        Instruction::internal("a"),
                        Instruction::send("b", p1, "i"),
                        Instruction::receive("c", "h"),
                        Instruction::send("d", p2, "m"),
                        Instruction::receive("e", "l"),
                        Instruction::send("f", p1, "j"),
                        Instruction::internal("g"),
                    ],
                ),
                Script::new(
                    p1,
                    vec![
                        Instruction::send("h", p0, "c"),
                        Instruction::receive("i", "b"),
                        Instruction::receive("j", "f"),
                    ],
                ),
                Script::new(
                    p2,
                    vec![
                        Instruction::internal("k"),
                        Instruction::send("l", p0, "e"),
                        Instruction::receive("m", "d"),
                    ],
                ),
            ],
        }
    }
}
