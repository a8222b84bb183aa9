//! The `decide` tool and parsing of its input.

use crate::oracle::{ActionKind, Decision, OracleError};
use crate::phase::Phase;
use crate::roles::Role;
use claude::Tool;
use serde_json::{json, Value};

pub const DECIDE_TOOL: &str = "decide";

/// The single tool every oracle call is forced to use.
pub fn decide_tool() -> Tool {
    Tool {
        name: DECIDE_TOOL.to_string(),
        description: "Submit your decision for the current phase. Call this exactly once.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["speak", "reason", "vote", "abstain", "kill", "protect", "investigate"],
                    "description": "What you are doing this phase"
                },
                "target": {
                    "type": "string",
                    "description": "Exact name of the player you are voting for or using your ability on"
                },
                "utterance": {
                    "type": "string",
                    "description": "What you say aloud (speak) or think privately (reason)"
                },
                "rationale": {
                    "type": "string",
                    "description": "A short private explanation of your choice"
                }
            },
            "required": ["action", "rationale"]
        }),
    }
}

/// Turn the tool input into a [`Decision`], rejecting anything that does not
/// fit the phase.
pub fn parse_decision(input: &Value, phase: Phase, role: Role) -> Result<Decision, OracleError> {
    let action = input["action"]
        .as_str()
        .ok_or_else(|| OracleError::Malformed("missing action".to_string()))?;
    let kind = ActionKind::parse(action)
        .ok_or_else(|| OracleError::Malformed(format!("unknown action: {action}")))?;

    let expected = ActionKind::expected(phase, role)
        .ok_or_else(|| OracleError::Malformed(format!("nothing to decide during {phase}")))?;
    let abstaining = phase == Phase::DayVote && kind == ActionKind::Abstain;
    if kind != expected && !abstaining {
        return Err(OracleError::Malformed(format!(
            "expected {} during {phase}, got {}",
            expected.as_str(),
            kind.as_str()
        )));
    }

    let text = |key: &str| {
        input[key]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let target = text("target");
    let utterance = text("utterance");

    match kind {
        ActionKind::Speak | ActionKind::Reason if utterance.is_none() => {
            return Err(OracleError::Malformed(format!("{} without utterance", kind.as_str())));
        }
        ActionKind::Kill | ActionKind::Protect | ActionKind::Investigate if target.is_none() => {
            return Err(OracleError::Malformed(format!("{} without target", kind.as_str())));
        }
        _ => {}
    }

    Ok(Decision {
        kind,
        target,
        utterance,
        rationale: text("rationale").unwrap_or_default(),
    })
}
