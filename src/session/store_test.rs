use super::*;
use crate::session::types::Record;
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    Record::from_value(value).unwrap()
}

fn alice() -> AuthenticatedSession {
    AuthenticatedSession {
        user: record(json!({ "username": "alice", "profile": "/p/1" })),
        profile: record(json!({ "picture": null })),
        token: "T1".into(),
    }
}

fn assert_invariant(state: &SessionState) {
    assert_eq!(state.logged_in(), state.token().is_some() && !state.current_user().is_empty());
}

// =============================================================================
// Transitions
// =============================================================================

#[test]
fn new_store_starts_from_given_state() {
    let store = SessionStore::default();
    assert_eq!(*store.state(), SessionState::default());
}

#[test]
fn log_in_replaces_all_fields() {
    let store = SessionStore::default();
    store.apply_log_in(alice());

    let state = store.state();
    assert!(state.logged_in());
    assert_eq!(state.token(), Some("T1"));
    assert_eq!(state.current_user(), &alice().user);
    assert_eq!(state.current_profile(), &alice().profile);
}

#[test]
fn log_out_resets_to_default() {
    let store = SessionStore::default();
    store.apply_log_in(alice());
    store.apply_log_out();
    assert_eq!(*store.state(), SessionState::default());
}

#[test]
fn log_out_when_logged_out_is_noop() {
    let store = SessionStore::default();
    let before = store.state();
    store.apply_log_out();
    store.apply_log_out();
    assert_eq!(*store.state(), *before);
}

#[test]
fn update_user_keeps_token_and_profile() {
    let store = SessionStore::default();
    store.apply_log_in(alice());
    store.apply_update_user(record(json!({ "username": "alice", "email": "a@x", "profile": "/p/1" })));

    let state = store.state();
    assert!(state.logged_in());
    assert_eq!(state.token(), Some("T1"));
    assert_eq!(state.current_user().get("email"), Some(&json!("a@x")));
    assert_eq!(state.current_profile(), &alice().profile);
}

#[test]
fn update_profile_keeps_token_and_user() {
    let store = SessionStore::default();
    store.apply_log_in(alice());
    store.apply_update_profile(record(json!({ "time_zone": "UTC" })));

    let state = store.state();
    assert!(state.logged_in());
    assert_eq!(state.token(), Some("T1"));
    assert_eq!(state.current_user(), &alice().user);
    assert_eq!(state.current_profile().get("time_zone"), Some(&json!("UTC")));
}

#[test]
fn update_profile_while_logged_out_stays_logged_out() {
    let store = SessionStore::default();
    store.apply_update_profile(record(json!({ "time_zone": "UTC" })));
    assert!(!store.state().logged_in());
    assert!(store.state().token().is_none());
}

#[test]
fn invariant_holds_across_transition_sequence() {
    let store = SessionStore::default();
    let steps: Vec<Box<dyn Fn(&SessionStore)>> = vec![
        Box::new(|s: &SessionStore| s.apply_update_user(record(json!({ "username": "ghost" })))),
        Box::new(|s: &SessionStore| s.apply_log_in(alice())),
        Box::new(|s: &SessionStore| s.apply_update_user(Record::default())),
        Box::new(|s: &SessionStore| s.apply_update_profile(Record::default())),
        Box::new(|s: &SessionStore| s.apply_log_in(alice())),
        Box::new(SessionStore::apply_log_out),
        Box::new(SessionStore::apply_log_out),
    ];
    for step in steps {
        step(&store);
        assert_invariant(&store.state());
    }
}

#[test]
fn earlier_snapshots_are_unaffected_by_later_transitions() {
    let store = SessionStore::default();
    store.apply_log_in(alice());
    let snapshot = store.state();
    store.apply_log_out();
    assert!(snapshot.logged_in());
    assert!(!store.state().logged_in());
}

// =============================================================================
// Observers
// =============================================================================

#[test]
fn observers_run_in_registration_order() {
    let store = SessionStore::default();
    let calls = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let calls = calls.clone();
        store.subscribe(move |_| calls.lock().unwrap().push(name));
    }

    store.apply_log_out();
    assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn observers_see_new_state_before_transition_returns() {
    let store = SessionStore::default();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    store.subscribe(move |state| *sink.lock().unwrap() = Some(state.token().map(str::to_owned)));

    store.apply_log_in(alice());
    assert_eq!(*seen.lock().unwrap(), Some(Some("T1".to_owned())));
}

#[test]
fn observer_may_read_state() {
    let store = Arc::new(SessionStore::default());
    let logged_in = Arc::new(Mutex::new(false));
    let (inner, sink) = (store.clone(), logged_in.clone());
    store.subscribe(move |_| *sink.lock().unwrap() = inner.state().logged_in());

    store.apply_log_in(alice());
    assert!(*logged_in.lock().unwrap());
}

#[test]
fn unsubscribed_observer_is_not_called() {
    let store = SessionStore::default();
    let count = Arc::new(AtomicU64::new(0));
    let counter = count.clone();
    let id = store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    store.apply_log_out();
    assert!(store.unsubscribe(id));
    store.apply_log_out();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(!store.unsubscribe(id));
}

#[test]
fn every_transition_notifies() {
    let store = SessionStore::default();
    let count = Arc::new(AtomicU64::new(0));
    let counter = count.clone();
    store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    store.apply_log_in(alice());
    store.apply_update_user(alice().user);
    store.apply_update_profile(alice().profile);
    store.apply_log_out();

    assert_eq!(count.load(Ordering::SeqCst), 4);
}
