use crate::{Effect, Msg, Observation, RunState, RunStatus};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match msg {
        Msg::Observed(observation) => {
            if state.status().is_terminal() {
                return (state, Vec::new());
            }
            apply_observation(&mut state, observation)
        }
        Msg::CancelRequested => {
            if state.status() == RunStatus::Running {
                state.set_status(RunStatus::Cancelled);
                vec![Effect::CancelSource]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn apply_observation(state: &mut RunState, observation: Observation) -> Vec<Effect> {
    let Observation {
        new_rows,
        error_count,
        source_finished,
        cancelled,
        elapsed,
    } = observation;

    state.mark_observed();
    state.append_rows(new_rows);
    state.set_error_count(error_count);
    state.set_elapsed(elapsed);

    // Completion wins over every other signal seen in the same tick.
    let next = if state.collected() >= state.target() {
        RunStatus::Complete
    } else if cancelled {
        RunStatus::Cancelled
    } else if source_finished {
        RunStatus::Exhausted
    } else if state
        .limits()
        .max_wait
        .is_some_and(|max_wait| elapsed >= max_wait)
    {
        RunStatus::TimedOut
    } else {
        RunStatus::Running
    };
    state.set_status(next);

    match next {
        RunStatus::Complete => vec![Effect::ExportReady],
        RunStatus::TimedOut => vec![Effect::CancelSource],
        RunStatus::Running | RunStatus::Exhausted | RunStatus::Cancelled => Vec::new(),
    }
}
