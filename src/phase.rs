//! Phase catalogue for the scripted tutoring dialogue.
//!
//! Every stage of the dialogue graph is a variant of [`Phase`]. The short code
//! (e.g. `APK`) is both the serialized and the displayed form, so session files
//! and CLI arguments use the same spelling.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A named stage of the scripted dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Placeholder for logs that never recorded a transition.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "APK")]
    Apk,
    #[serde(rename = "CI")]
    Ci,
    #[serde(rename = "GE")]
    Ge,
    #[serde(rename = "MH")]
    Mh,
    #[serde(rename = "AR")]
    Ar,
    #[serde(rename = "TC")]
    Tc,
    #[serde(rename = "RLC")]
    Rlc,
    #[serde(rename = "END")]
    End,
    #[serde(rename = "SIM_CC")]
    SimConcept,
    #[serde(rename = "SIM_VARS")]
    SimVars,
    #[serde(rename = "SIM_ACTION")]
    SimAction,
    #[serde(rename = "SIM_EXPECT")]
    SimExpect,
    #[serde(rename = "SIM_EXECUTE")]
    SimExecute,
    #[serde(rename = "SIM_OBSERVE")]
    SimObserve,
    #[serde(rename = "SIM_INSIGHT")]
    SimInsight,
    #[serde(rename = "SIM_REFLECT")]
    SimReflect,
}

impl Phase {
    /// All phases in script order, `Unknown` last.
    pub const ALL: [Phase; 18] = [
        Phase::Start,
        Phase::Apk,
        Phase::Ci,
        Phase::SimConcept,
        Phase::SimVars,
        Phase::SimAction,
        Phase::SimExpect,
        Phase::SimExecute,
        Phase::SimObserve,
        Phase::SimInsight,
        Phase::SimReflect,
        Phase::Ge,
        Phase::Mh,
        Phase::Ar,
        Phase::Tc,
        Phase::Rlc,
        Phase::End,
        Phase::Unknown,
    ];

    /// Short code used in session files, logs and on the command line.
    pub fn code(self) -> &'static str {
        match self {
            Phase::Unknown => "unknown",
            Phase::Start => "START",
            Phase::Apk => "APK",
            Phase::Ci => "CI",
            Phase::Ge => "GE",
            Phase::Mh => "MH",
            Phase::Ar => "AR",
            Phase::Tc => "TC",
            Phase::Rlc => "RLC",
            Phase::End => "END",
            Phase::SimConcept => "SIM_CC",
            Phase::SimVars => "SIM_VARS",
            Phase::SimAction => "SIM_ACTION",
            Phase::SimExpect => "SIM_EXPECT",
            Phase::SimExecute => "SIM_EXECUTE",
            Phase::SimObserve => "SIM_OBSERVE",
            Phase::SimInsight => "SIM_INSIGHT",
            Phase::SimReflect => "SIM_REFLECT",
        }
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Phase::Unknown => "Unknown",
            Phase::Start => "Session Start",
            Phase::Apk => "Activate Prior Knowledge",
            Phase::Ci => "Concept Introduction",
            Phase::Ge => "Guided Exploration",
            Phase::Mh => "Misconception Handling",
            Phase::Ar => "Application & Retrieval",
            Phase::Tc => "Transfer & Critical Thinking",
            Phase::Rlc => "Real-Life Connection",
            Phase::End => "Session End",
            Phase::SimConcept => "Simulation: Concept Setup",
            Phase::SimVars => "Simulation: Variables",
            Phase::SimAction => "Simulation: Action",
            Phase::SimExpect => "Simulation: Expectation",
            Phase::SimExecute => "Simulation: Execute",
            Phase::SimObserve => "Simulation: Observe",
            Phase::SimInsight => "Simulation: Insight",
            Phase::SimReflect => "Simulation: Reflection",
        }
    }

    /// Whether this phase belongs to the simulation sub-flow.
    pub fn is_simulation(self) -> bool {
        matches!(
            self,
            Phase::SimConcept
                | Phase::SimVars
                | Phase::SimAction
                | Phase::SimExpect
                | Phase::SimExecute
                | Phase::SimObserve
                | Phase::SimInsight
                | Phase::SimReflect
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Phase::ALL
            .iter()
            .copied()
            .filter(|p| *p != Phase::Unknown)
            .find(|p| p.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<&str> = Phase::ALL
                    .iter()
                    .filter(|p| **p != Phase::Unknown)
                    .map(|p| p.code())
                    .collect();
                anyhow::anyhow!(
                    "Invalid phase '{}'. Valid values: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}
