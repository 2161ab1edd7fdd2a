//! Flow control between a prefix hook and the dispatcher.
//!
//! A prefix hook returns a result together with a [`FlowState`]. The state
//! decides whether the wrapped callable and the postfix hook still run:
//!
//! | state                    | original | postfix |
//! |--------------------------|----------|---------|
//! | `Continue`               | yes      | yes     |
//! | `ContinueWithoutPostfix` | yes      | no      |
//! | `Stop`                   | no       | no      |

use crate::runtime::CallArgs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Continue,
    ContinueWithoutPostfix,
    Stop,
}

impl FlowState {
    /// Whether the wrapped callable runs after the prefix.
    pub fn runs_original(self) -> bool {
        self != FlowState::Stop
    }

    /// Whether the postfix hook runs.
    pub fn runs_postfix(self) -> bool {
        self == FlowState::Continue
    }
}

/// What a prefix hook hands back to the dispatcher.
///
/// `result` becomes the working result; it is what the caller sees when the
/// state is [`FlowState::Stop`]. `args`, when set, replaces the arguments
/// passed to the wrapped callable. The postfix hook always receives the
/// caller's original arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrefixOutcome {
    pub result: Value,
    pub flow: FlowState,
    pub args: Option<CallArgs>,
}

impl PrefixOutcome {
    pub fn new(result: Value, flow: FlowState) -> Self {
        Self {
            result,
            flow,
            args: None,
        }
    }

    /// Let everything run.
    pub fn proceed() -> Self {
        Self::new(Value::Null, FlowState::Continue)
    }

    /// Short-circuit: return `result` without running the original or postfix.
    pub fn stop(result: Value) -> Self {
        Self::new(result, FlowState::Stop)
    }

    /// Run the original but not the postfix.
    pub fn skip_postfix() -> Self {
        Self::new(Value::Null, FlowState::ContinueWithoutPostfix)
    }

    /// Replace the arguments the wrapped callable receives.
    pub fn with_args(mut self, args: CallArgs) -> Self {
        self.args = Some(args);
        self
    }
}

impl From<(Value, FlowState)> for PrefixOutcome {
    fn from((result, flow): (Value, FlowState)) -> Self {
        Self::new(result, flow)
    }
}

impl From<FlowState> for PrefixOutcome {
    fn from(flow: FlowState) -> Self {
        Self::new(Value::Null, flow)
    }
}
