//! Engine double whose outcomes are chosen by the test.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::game::types::{EngineOutcome, MatchSetup, Operation, OperationStatus, SelectionView};
use crate::game::{EngineError, EngineFactory, MatchEngine};

#[derive(Default)]
pub struct Script {
    /// Returned by the next `submit` calls, in order. Empty means "resolve with no deltas".
    pub outcomes: VecDeque<EngineOutcome>,
    pub submitted: Vec<Operation>,
    pub setups: Vec<MatchSetup>,
    /// Make every `bootstrap` fail.
    pub fail_bootstrap: bool,
    /// Make every `submit` panic.
    pub panic_on_submit: bool,
}

#[derive(Clone, Default)]
pub struct ScriptedEngineFactory {
    pub script: Arc<Mutex<Script>>,
}

impl ScriptedEngineFactory {
    pub fn push_outcome(&self, outcome: EngineOutcome) {
        self.script.lock().unwrap().outcomes.push_back(outcome);
    }

    pub fn submitted(&self) -> Vec<Operation> {
        self.script.lock().unwrap().submitted.clone()
    }

    pub fn setups(&self) -> Vec<MatchSetup> {
        self.script.lock().unwrap().setups.clone()
    }

    pub fn fail_bootstrap(&self) {
        self.script.lock().unwrap().fail_bootstrap = true;
    }

    pub fn panic_on_submit(&self) {
        self.script.lock().unwrap().panic_on_submit = true;
    }
}

pub fn outcome(operation_id: &str, status: OperationStatus, deltas: usize, is_game_over: bool) -> EngineOutcome {
    EngineOutcome {
        operation_id: operation_id.to_string(),
        status,
        deltas: (0..deltas)
            .map(|i| crate::game::types::Delta::new("Scripted", i.to_string()))
            .collect(),
        is_game_over,
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn bootstrap(&self, setup: MatchSetup) -> Result<(Box<dyn MatchEngine>, EngineOutcome), EngineError> {
        let mut script = self.script.lock().unwrap();
        if script.fail_bootstrap {
            return Err(EngineError::Bootstrap {
                match_id: setup.match_id,
                reason: "scripted failure".to_string(),
            });
        }
        script.setups.push(setup);
        drop(script);
        let engine = ScriptedEngine {
            script: self.script.clone(),
        };
        Ok((Box::new(engine), outcome("bootstrap", OperationStatus::Resolved, 1, false)))
    }
}

struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

impl MatchEngine for ScriptedEngine {
    fn submit(&mut self, operation: Operation) -> EngineOutcome {
        let mut script = self.script.lock().unwrap();
        script.submitted.push(operation);
        if script.panic_on_submit {
            // Release the lock first so the script stays readable afterwards.
            drop(script);
            panic!("scripted engine panic");
        }
        script
            .outcomes
            .pop_front()
            .unwrap_or_else(|| outcome("scripted", OperationStatus::Resolved, 0, false))
    }

    fn selection_for(&self, perspective: &str) -> Option<SelectionView> {
        Some(SelectionView::Own {
            player_id: perspective.to_string(),
            detail: Vec::new(),
        })
    }
}
