use std::sync::Once;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scout_core::{
    update, Effect, ExperienceLevel, Msg, Observation, ResultRow, RunLimits, RunRequest, RunState,
    RunStatus,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn new_run(target: usize, max_wait: Option<Duration>) -> RunState {
    let request = RunRequest::new("data analyst", "Chicago", ExperienceLevel::MidSenior, target);
    RunState::new(1, request, RunLimits { max_wait })
}

fn row(n: usize) -> ResultRow {
    ResultRow {
        search_keyword: "data analyst".to_string(),
        title: format!("Analyst {n}"),
        company: format!("Company {n}"),
        link: format!("https://jobs.example.com/{n}"),
        location: "Chicago".to_string(),
        description: String::new(),
        date: "2024-05-01".to_string(),
        experience_level: ExperienceLevel::MidSenior,
    }
}

fn observe(state: RunState, observation: Observation) -> (RunState, Vec<Effect>) {
    update(state, Msg::Observed(observation))
}

#[test]
fn first_observation_renders_even_when_empty() {
    init_logging();
    let (mut state, effects) = observe(new_run(3, None), Observation::default());

    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Running);
    assert!(state.consume_dirty());

    let (mut state, _) = observe(state, Observation::default());
    assert!(!state.consume_dirty());
}

#[test]
fn rows_accumulate_in_order_until_complete() {
    init_logging();
    let state = new_run(3, None);

    let (mut state, effects) = observe(
        state,
        Observation {
            new_rows: vec![row(1), row(2)],
            ..Observation::default()
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.collected(), 2);
    assert!((state.progress() - 2.0 / 3.0).abs() < f32::EPSILON);
    assert!(state.consume_dirty());

    let (state, effects) = observe(
        state,
        Observation {
            new_rows: vec![row(3)],
            ..Observation::default()
        },
    );
    assert_eq!(effects, vec![Effect::ExportReady]);
    assert_eq!(state.status(), RunStatus::Complete);
    assert_eq!(state.rows(), &[row(1), row(2), row(3)]);

    let view = state.view();
    assert!(view.export_ready);
    assert_eq!(view.progress, 1.0);
    assert_eq!(view.status_line(), "Web scraping complete");
}

#[test]
fn rows_beyond_target_are_dropped() {
    init_logging();
    let (state, _) = observe(
        new_run(2, None),
        Observation {
            new_rows: vec![row(1), row(2), row(3)],
            ..Observation::default()
        },
    );
    assert_eq!(state.rows(), &[row(1), row(2)]);
    assert_eq!(state.status(), RunStatus::Complete);
}

#[test]
fn finished_source_short_of_target_is_exhausted() {
    init_logging();
    let (state, effects) = observe(
        new_run(5, None),
        Observation {
            new_rows: vec![row(1)],
            source_finished: true,
            ..Observation::default()
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Exhausted);
    assert_eq!(
        state.view().status_line(),
        "Source ran out of listings: 1 of 5 collected"
    );
}

#[test]
fn completion_wins_over_finished_flag() {
    init_logging();
    let (state, effects) = observe(
        new_run(1, None),
        Observation {
            new_rows: vec![row(1)],
            source_finished: true,
            cancelled: true,
            ..Observation::default()
        },
    );
    assert_eq!(state.status(), RunStatus::Complete);
    assert_eq!(effects, vec![Effect::ExportReady]);
}

#[test]
fn max_wait_times_out_and_cancels_source() {
    init_logging();
    let state = new_run(4, Some(Duration::from_secs(10)));

    let (state, effects) = observe(
        state,
        Observation {
            new_rows: vec![row(1)],
            elapsed: Duration::from_secs(9),
            ..Observation::default()
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Running);

    let (state, effects) = observe(
        state,
        Observation {
            elapsed: Duration::from_secs(10),
            ..Observation::default()
        },
    );
    assert_eq!(effects, vec![Effect::CancelSource]);
    assert_eq!(state.status(), RunStatus::TimedOut);
    assert_eq!(state.collected(), 1);
}

#[test]
fn terminal_state_ignores_later_observations() {
    init_logging();
    let (state, _) = observe(
        new_run(2, None),
        Observation {
            source_finished: true,
            ..Observation::default()
        },
    );
    let (state, effects) = observe(
        state,
        Observation {
            new_rows: vec![row(1), row(2)],
            ..Observation::default()
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Exhausted);
    assert_eq!(state.collected(), 0);
}

#[test]
fn error_count_marks_dirty_without_adding_rows() {
    init_logging();
    let (mut state, _) = observe(new_run(2, None), Observation::default());
    assert!(state.consume_dirty());

    let (mut state, effects) = observe(
        state,
        Observation {
            error_count: 1,
            ..Observation::default()
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.collected(), 0);
    assert_eq!(state.error_count(), 1);
    assert!(state.consume_dirty());
}

#[test]
fn cancel_request_stops_running_run_only() {
    init_logging();
    let (state, effects) = update(new_run(2, None), Msg::CancelRequested);
    assert_eq!(effects, vec![Effect::CancelSource]);
    assert_eq!(state.status(), RunStatus::Cancelled);

    let (state, effects) = update(state, Msg::CancelRequested);
    assert!(effects.is_empty());
    assert_eq!(state.status(), RunStatus::Cancelled);
}
