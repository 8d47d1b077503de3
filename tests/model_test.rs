//! Tests for the mail item state machine.

use std::sync::Mutex;
use std::time::Duration;

use mailroom::config::PipelineConfig;
use mailroom::monitor::ProgressMonitor;
use mailroom::stage::Stages;
use mailroom::{Error, ItemId, MailItem, State, WorkerId};

/// Records every report in order.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ProgressMonitor for Recorder {
    fn register_worker(&self, worker: WorkerId) {
        self.push(format!("register {worker}"));
    }
    fn report_item_created(&self, state: State) {
        self.push(format!("created {state}"));
    }
    fn report_state_change(&self, old: State, new: State) {
        self.push(format!("change {old}->{new}"));
    }
    fn report_worker_busy(&self, worker: WorkerId, label: &str) {
        self.push(format!("busy {worker} {label}"));
    }
    fn report_worker_idle(&self, worker: WorkerId) {
        self.push(format!("idle {worker}"));
    }
}

fn instant_stages() -> Stages {
    Stages::from_config(&PipelineConfig::instant())
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[test]
fn states_follow_the_fixed_order() {
    let mut seen = vec![State::Start];
    let mut state = State::Start;
    while let Some(next) = state.next() {
        assert!(next > state);
        seen.push(next);
        state = next;
    }
    assert_eq!(seen, State::ALL.to_vec());
    assert!(state.is_terminal());
}

#[test]
fn only_single_forward_steps_are_allowed() {
    assert!(State::Start.can_transition_to(State::Folded));
    assert!(State::Stamped.can_transition_to(State::Mailed));

    assert!(!State::Start.can_transition_to(State::Stuffed), "skip");
    assert!(!State::Sealed.can_transition_to(State::Stuffed), "regress");
    assert!(!State::Sealed.can_transition_to(State::Sealed), "repeat");
    assert!(!State::Mailed.can_transition_to(State::Start));
}

#[test]
fn state_round_trips_through_its_name() {
    for state in State::ALL {
        assert_eq!(state.to_string().parse::<State>().unwrap(), state);
    }
    assert!("posted".parse::<State>().is_err());
}

#[test]
fn every_non_terminal_state_has_an_action() {
    assert_eq!(State::Start.action(), Some("folding"));
    assert_eq!(State::Sealed.action(), Some("addressing"));
    assert_eq!(State::Stamped.action(), Some("mailing"));
    assert_eq!(State::Mailed.action(), None);
}

// ---------------------------------------------------------------------------
// Mail item
// ---------------------------------------------------------------------------

#[test]
fn item_rejects_skipping_states() {
    let mut item = MailItem::new(ItemId(7));
    let err = item.advance_to(State::Sealed).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: State::Start,
            to: State::Sealed
        }
    ));
    assert_eq!(item.state(), State::Start);
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

#[test]
fn advance_walks_an_item_to_mailed() {
    let stages = instant_stages();
    let monitor = Recorder::default();
    let mut item = MailItem::new(ItemId(0));

    let mut steps = 0;
    while stages.advance(&mut item, WorkerId(1), &monitor).unwrap() {
        steps += 1;
    }
    assert_eq!(steps, 5);
    assert_eq!(item.state(), State::Mailed);
}

#[test]
fn advance_reports_busy_change_idle_in_order() {
    let stages = instant_stages();
    let monitor = Recorder::default();
    let mut item = MailItem::new(ItemId(3));

    let more = stages.advance(&mut item, WorkerId(2), &monitor).unwrap();

    assert!(more);
    assert_eq!(item.state(), State::Folded);
    assert_eq!(
        monitor.calls(),
        vec!["busy w2 folding", "change start->folded", "idle w2"]
    );
}

#[test]
fn advance_on_mailed_item_is_an_error_without_effect() {
    let stages = instant_stages();
    let monitor = Recorder::default();
    let mut item = MailItem::new(ItemId(9));
    while stages.advance(&mut item, WorkerId(0), &monitor).unwrap() {}
    let before = monitor.calls().len();

    let err = stages.advance(&mut item, WorkerId(0), &monitor).unwrap_err();
    assert!(matches!(err, Error::AlreadyTerminal(ItemId(9))));
    assert_eq!(item.state(), State::Mailed);
    assert_eq!(monitor.calls().len(), before);
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

#[test]
fn nominal_latencies_match_the_defaults() {
    let stages = Stages::default();
    let seconds = |state| stages.nominal(state).map(|d| d.as_secs_f64());
    let expected = [0.12, 0.10, 0.24, 0.50, 0.05, 0.70];
    for (state, want) in State::ALL.into_iter().zip(expected) {
        let got = seconds(state).unwrap();
        assert!((got - want).abs() < 1e-6, "{state}: {got} != {want}");
    }
    assert_eq!(seconds(State::Mailed), None);
}

#[test]
fn sampled_durations_are_non_negative_and_scaled() {
    let mut rng = rand::rng();
    let config = PipelineConfig {
        time_scale: 0.01,
        ..PipelineConfig::default()
    };
    let stages = Stages::from_config(&config);
    for _ in 0..200 {
        let sample = stages.sample(State::Stamped, &mut rng);
        // 35ms is ten standard deviations above the scaled 7ms mean.
        assert!(sample < Duration::from_millis(35), "{sample:?}");
    }
    assert_eq!(stages.sample(State::Mailed, &mut rng), Duration::ZERO);
    assert_eq!(instant_stages().sample(State::Start, &mut rng), Duration::ZERO);
}

#[test]
fn zero_jitter_samples_the_mean() {
    let mut rng = rand::rng();
    let config = PipelineConfig {
        jitter: 0.0,
        ..PipelineConfig::default()
    };
    let stages = Stages::from_config(&config);
    let sample = stages.sample(State::Addressed, &mut rng);
    assert!((sample.as_secs_f64() - 0.05).abs() < 1e-9);
}
