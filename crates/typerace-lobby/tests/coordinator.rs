//! Integration tests for the coordinator, driven synchronously with a
//! recording gateway and a scripted text provider.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use typerace_lobby::{
    Broadcast, Coordinator, Departure, LobbyConfig, LobbyError, Rejection, TextProvider,
    TrackCatalog,
};
use typerace_protocol::{LobbyCode, ParticipantId, RaceState, ServerEvent, TelemetryPatch};

// =========================================================================
// Test doubles
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    Subscribe(LobbyCode, ParticipantId),
    Unsubscribe(LobbyCode, ParticipantId),
    Publish(LobbyCode, ServerEvent),
    Close(LobbyCode),
}

/// Records every gateway call so tests can assert on exactly what was
/// broadcast.
#[derive(Clone, Default)]
struct RecordingGateway {
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingGateway {
    fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }

    fn published(&self) -> Vec<ServerEvent> {
        self.take()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Publish(_, event) => Some(event),
                _ => None,
            })
            .collect()
    }
}

impl Broadcast for RecordingGateway {
    fn subscribe(&mut self, code: &LobbyCode, id: &ParticipantId) {
        self.log
            .lock()
            .unwrap()
            .push(Recorded::Subscribe(code.clone(), id.clone()));
    }

    fn unsubscribe(&mut self, code: &LobbyCode, id: &ParticipantId) {
        self.log
            .lock()
            .unwrap()
            .push(Recorded::Unsubscribe(code.clone(), id.clone()));
    }

    fn publish(&mut self, code: &LobbyCode, event: ServerEvent) {
        self.log
            .lock()
            .unwrap()
            .push(Recorded::Publish(code.clone(), event));
    }

    fn close(&mut self, code: &LobbyCode) {
        self.log.lock().unwrap().push(Recorded::Close(code.clone()));
    }
}

/// Hands out texts from a fixed script, skipping excluded ones while it
/// can, and remembers what it was asked to exclude.
struct ScriptedTexts {
    script: VecDeque<String>,
    exclusions: Arc<Mutex<Vec<HashSet<String>>>>,
}

impl ScriptedTexts {
    fn new(texts: &[&str]) -> Self {
        Self {
            script: texts.iter().map(|t| t.to_string()).collect(),
            exclusions: Arc::default(),
        }
    }
}

impl TextProvider for ScriptedTexts {
    fn next_sample(&mut self, excluding: &HashSet<String>) -> String {
        self.exclusions.lock().unwrap().push(excluding.clone());
        let pos = self
            .script
            .iter()
            .position(|t| !excluding.contains(t))
            .unwrap_or(0);
        let text = self.script.remove(pos).unwrap_or_default();
        self.script.push_back(text.clone());
        text
    }
}

const HOST_TEXT: &str = "Host practice text that nobody races against.";
const TEXT_A: &str = "The old observatory on the hill has not pointed its telescope at the sky.";
const TEXT_B: &str = "A good map tells you where the roads go and where people actually walk.";

fn coordinator() -> (Coordinator<ScriptedTexts, RecordingGateway>, RecordingGateway) {
    let gateway = RecordingGateway::default();
    let coordinator = Coordinator::new(
        LobbyConfig::default(),
        TrackCatalog::default(),
        ScriptedTexts::new(&[HOST_TEXT, TEXT_A, TEXT_B]),
        gateway.clone(),
    )
    .with_seed(11);
    (coordinator, gateway)
}

fn id(s: &str) -> ParticipantId {
    ParticipantId::from(s)
}

fn progress(p: f64) -> TelemetryPatch {
    TelemetryPatch {
        progress: Some(p),
        ..TelemetryPatch::default()
    }
}

// =========================================================================
// Create / join
// =========================================================================

#[test]
fn test_create_lobby_initial_state() {
    let (mut c, gateway) = coordinator();

    let (code, lobby) = c.create_lobby(id("alice"), "Alice".into()).unwrap();

    assert!(code.as_str().starts_with("ACM"));
    assert_eq!(code.as_str().len(), 6);
    assert_eq!(lobby.code, code);
    assert_eq!(lobby.host.name, "Alice");
    assert_eq!(lobby.host.assigned_text, HOST_TEXT);
    assert!(lobby.racers.is_empty());
    assert_eq!(lobby.track_id.as_str(), "track1");
    assert_eq!(lobby.state, RaceState::Waiting);
    assert!(lobby.started_at.is_none());
    assert!(lobby.winner.is_none());

    assert_eq!(gateway.take(), vec![Recorded::Subscribe(code, id("alice"))]);
}

#[test]
fn test_create_lobby_codes_are_unique() {
    let (mut c, _) = coordinator();
    let mut codes = HashSet::new();
    for n in 0..200 {
        let (code, _) = c.create_lobby(id(&format!("h{n}")), "Host".into()).unwrap();
        assert!(codes.insert(code), "duplicate lobby code");
    }
    assert_eq!(c.registry().len(), 200);
}

#[test]
fn test_create_lobby_twice_fails() {
    let (mut c, _) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();

    let err = c.create_lobby(id("alice"), "Alice".into()).unwrap_err();
    assert_eq!(err, LobbyError::AlreadyInLobby(id("alice"), code));
    assert_eq!(c.registry().len(), 1);
}

#[test]
fn test_join_unknown_lobby_fails() {
    let (mut c, gateway) = coordinator();
    let err = c
        .join_lobby(&"ACMZZZ".into(), id("bob"), "Bob".into())
        .unwrap_err();
    assert_eq!(err.to_string(), "Lobby not found.");
    assert!(gateway.take().is_empty());
}

#[test]
fn test_join_broadcasts_and_assigns_distinct_texts() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    let after_bob = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    let after_carol = c.join_lobby(&code, id("carol"), "Carol".into()).unwrap();

    let names: Vec<&str> = after_carol.racers.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Bob", "Carol"]);
    assert_eq!(after_bob.racers[0].assigned_text, after_carol.racers[0].assigned_text);
    assert_ne!(after_carol.racers[0].assigned_text, after_carol.racers[1].assigned_text);

    let log = gateway.take();
    assert_eq!(log[0], Recorded::Subscribe(code.clone(), id("bob")));
    assert_eq!(
        log[1],
        Recorded::Publish(code.clone(), ServerEvent::LobbyUpdated { lobby: after_bob })
    );
    assert_eq!(log.len(), 4);
}

#[test]
fn test_join_code_is_case_insensitive() {
    let (mut c, _) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();

    let typed = LobbyCode(format!(" {} ", code.as_str().to_lowercase()));
    let lobby = c.join_lobby(&typed, id("bob"), "Bob".into()).unwrap();
    assert_eq!(lobby.code, code);
}

#[test]
fn test_rejoin_is_idempotent() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let first = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    gateway.take();

    let again = c.join_lobby(&code, id("bob"), "Bobby".into()).unwrap();
    let host = c.join_lobby(&code, id("alice"), "Alice".into()).unwrap();

    assert_eq!(again, first);
    assert_eq!(host, first);
    assert!(gateway.take().is_empty());
}

#[test]
fn test_join_second_lobby_fails() {
    let (mut c, _) = coordinator();
    let (one, _) = c.create_lobby(id("h1"), "H1".into()).unwrap();
    let (two, _) = c.create_lobby(id("h2"), "H2".into()).unwrap();
    c.join_lobby(&one, id("bob"), "Bob".into()).unwrap();

    let err = c.join_lobby(&two, id("bob"), "Bob".into()).unwrap_err();
    assert_eq!(err, LobbyError::AlreadyInLobby(id("bob"), one));
    assert!(c.snapshot(&two).unwrap().racers.is_empty());
}

#[test]
fn test_join_after_start_fails() {
    let (mut c, _) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();

    let err = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap_err();
    assert_eq!(err.to_string(), "Race has already started.");
}

#[test]
fn test_join_excludes_texts_of_present_racers() {
    let gateway = RecordingGateway::default();
    let texts = ScriptedTexts::new(&[HOST_TEXT, TEXT_A, TEXT_B]);
    let exclusions = Arc::clone(&texts.exclusions);
    let mut c = Coordinator::new(LobbyConfig::default(), TrackCatalog::default(), texts, gateway);

    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let lobby = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.join_lobby(&code, id("carol"), "Carol".into()).unwrap();

    let seen = exclusions.lock().unwrap();
    assert!(seen[0].is_empty(), "host text draws with no exclusions");
    assert!(seen[1].is_empty(), "no racers yet");
    assert_eq!(
        seen[2],
        HashSet::from([lobby.racers[0].assigned_text.clone()])
    );
}

// =========================================================================
// Track selection
// =========================================================================

#[test]
fn test_non_host_select_track_changes_nothing() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    let before = c.snapshot(&code).unwrap();
    gateway.take();

    let err = c
        .select_track(&code, &id("bob"), "track2".into())
        .unwrap_err();

    assert_eq!(err, LobbyError::Rejected(Rejection::NotHost(id("bob"))));
    assert_eq!(c.snapshot(&code).unwrap(), before);
    assert!(gateway.take().is_empty());
}

#[test]
fn test_host_selects_track() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    let lobby = c.select_track(&code, &id("alice"), "track3".into()).unwrap();
    assert_eq!(lobby.track_id.as_str(), "track3");
    assert_eq!(
        gateway.published(),
        vec![ServerEvent::LobbyUpdated { lobby }]
    );
}

#[test]
fn test_unknown_track_is_rejected() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    let err = c
        .select_track(&code, &id("alice"), "track9".into())
        .unwrap_err();
    assert_eq!(err, LobbyError::Rejected(Rejection::UnknownTrack("track9".into())));
    assert_eq!(c.snapshot(&code).unwrap().track_id.as_str(), "track1");
    assert!(gateway.take().is_empty());
}

// =========================================================================
// Race
// =========================================================================

#[test]
fn test_start_game_broadcasts_game_started() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    let lobby = c.start_game(&code, &id("alice")).unwrap();
    assert_eq!(lobby.state, RaceState::InProgress);
    assert!(lobby.started_at.is_some());
    assert_eq!(gateway.published(), vec![ServerEvent::GameStarted { lobby }]);
}

#[test]
fn test_start_game_rejections() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();

    assert_eq!(
        c.start_game(&code, &id("bob")).unwrap_err(),
        LobbyError::Rejected(Rejection::NotHost(id("bob")))
    );
    c.start_game(&code, &id("alice")).unwrap();
    gateway.take();

    assert_eq!(
        c.start_game(&code, &id("alice")).unwrap_err(),
        LobbyError::Rejected(Rejection::InvalidState(RaceState::InProgress))
    );
    assert!(gateway.take().is_empty());
}

#[test]
fn test_every_accepted_update_is_broadcast() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.join_lobby(&code, id("carol"), "Carol".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();
    gateway.take();

    c.apply_progress_update(&code, &id("bob"), progress(30.0)).unwrap();
    c.apply_progress_update(&code, &id("bob"), progress(100.0)).unwrap();
    let lobby = c
        .apply_progress_update(&code, &id("carol"), progress(100.0))
        .unwrap();

    assert_eq!(lobby.state, RaceState::Finished);
    assert_eq!(gateway.published().len(), 3);

    // Finished never reverts.
    let lobby = c
        .apply_progress_update(&code, &id("carol"), progress(10.0))
        .unwrap();
    assert_eq!(lobby.state, RaceState::Finished);
}

#[test]
fn test_update_rejections_do_not_broadcast() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    assert_eq!(
        c.apply_progress_update(&"ACM000".into(), &id("alice"), progress(5.0))
            .unwrap_err(),
        LobbyError::NotFound("ACM000".into())
    );
    assert_eq!(
        c.apply_progress_update(&code, &id("alice"), progress(5.0))
            .unwrap_err(),
        LobbyError::Rejected(Rejection::NotARacer(id("alice")))
    );
    assert!(gateway.take().is_empty());
}

#[test]
fn test_identical_final_text_wins_and_winner_is_frozen() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    let lobby = c.join_lobby(&code, id("carol"), "Carol".into()).unwrap();
    let bob_text = lobby.racers[0].assigned_text.clone();
    let carol_text = lobby.racers[1].assigned_text.clone();
    c.start_game(&code, &id("alice")).unwrap();
    c.apply_progress_update(&code, &id("bob"), progress(64.0)).unwrap();
    gateway.take();

    let won = c.submit_final_text(&code, &id("bob"), &bob_text).unwrap();
    let winner = won.winner.clone().unwrap();
    assert_eq!(winner.id, id("bob"));
    assert_eq!(winner.progress, 64.0, "winner keeps its telemetry");
    assert_eq!(gateway.published(), vec![ServerEvent::LobbyUpdated { lobby: won }]);

    let err = c
        .submit_final_text(&code, &id("carol"), &carol_text)
        .unwrap_err();
    assert_eq!(err, LobbyError::Rejected(Rejection::WinnerAlreadySet));

    // Later telemetry from the winner does not rewrite the frozen copy.
    c.apply_progress_update(&code, &id("bob"), progress(100.0)).unwrap();
    assert_eq!(c.snapshot(&code).unwrap().winner, Some(winner));
}

#[test]
fn test_completely_wrong_final_text_never_wins() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let lobby = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();
    gateway.take();

    let garbage: String = lobby.racers[0]
        .assigned_text
        .chars()
        .map(|ch| if ch == '#' { '@' } else { '#' })
        .collect();
    let err = c.submit_final_text(&code, &id("bob"), &garbage).unwrap_err();

    assert_eq!(
        err,
        LobbyError::Rejected(Rejection::BelowAccuracy {
            accuracy: 0.0,
            threshold: 70.0
        })
    );
    assert!(c.snapshot(&code).unwrap().winner.is_none());
    assert!(gateway.take().is_empty());
}

#[test]
fn test_submission_from_host_is_rejected() {
    let (mut c, _) = coordinator();
    let (code, lobby) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();

    let err = c
        .submit_final_text(&code, &id("alice"), &lobby.host.assigned_text)
        .unwrap_err();
    assert_eq!(err, LobbyError::Rejected(Rejection::NotARacer(id("alice"))));
}

#[test]
fn test_exact_final_text_before_start_wins_and_keeps_waiting() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let lobby = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    gateway.take();

    let won = c
        .submit_final_text(&code, &id("bob"), &lobby.racers[0].assigned_text)
        .unwrap();
    assert_eq!(won.winner.as_ref().map(|w| w.id.clone()), Some(id("bob")));
    assert_eq!(won.state, RaceState::Waiting);
    assert_eq!(won.started_at, None);
    assert_eq!(gateway.published(), vec![ServerEvent::LobbyUpdated { lobby: won }]);

    // The host can still start; the winner carries over.
    let started = c.start_game(&code, &id("alice")).unwrap();
    assert_eq!(started.state, RaceState::InProgress);
    assert_eq!(started.winner.map(|w| w.id), Some(id("bob")));
}

#[test]
fn test_winner_before_finish_and_finish_without_winner_are_independent() {
    let (mut c, _) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let lobby = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();

    let won = c
        .submit_final_text(&code, &id("bob"), &lobby.racers[0].assigned_text)
        .unwrap();
    assert_eq!(won.state, RaceState::InProgress);
    assert!(won.winner.is_some());

    let (other, _) = c.create_lobby(id("dave"), "Dave".into()).unwrap();
    c.join_lobby(&other, id("erin"), "Erin".into()).unwrap();
    c.start_game(&other, &id("dave")).unwrap();
    let done = c
        .apply_progress_update(&other, &id("erin"), progress(100.0))
        .unwrap();
    assert_eq!(done.state, RaceState::Finished);
    assert!(done.winner.is_none());
}

#[test]
fn test_alice_and_bob_race() {
    let (mut c, gateway) = coordinator();

    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    let joined = c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    assert_eq!(joined.racers.len(), 1);
    let bob_text = joined.racers[0].assigned_text.clone();

    let started = c.start_game(&code, &id("alice")).unwrap();
    assert_eq!(started.state, RaceState::InProgress);

    let finished = c
        .apply_progress_update(
            &code,
            &id("bob"),
            TelemetryPatch {
                progress: Some(100.0),
                wpm: Some(72.0),
                accuracy: Some(98.0),
            },
        )
        .unwrap();
    assert_eq!(finished.state, RaceState::Finished);

    let won = c.submit_final_text(&code, &id("bob"), &bob_text).unwrap();
    let winner = won.winner.unwrap();
    assert_eq!(winner.name, "Bob");
    assert_eq!(winner.wpm, 72.0);

    let events = gateway.published();
    assert!(matches!(events.last(), Some(ServerEvent::LobbyUpdated { .. })));
    assert!(events.iter().any(|e| matches!(e, ServerEvent::GameStarted { .. })));
}

// =========================================================================
// Disconnect
// =========================================================================

#[test]
fn test_host_disconnect_closes_lobby() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.join_lobby(&code, id("carol"), "Carol".into()).unwrap();
    gateway.take();

    let departure = c.disconnect(&id("alice"));

    assert_eq!(
        departure,
        Some(Departure::LobbyClosed {
            code: code.clone(),
            racers: 2
        })
    );
    assert_eq!(
        gateway.take(),
        vec![
            Recorded::Publish(code.clone(), ServerEvent::LobbyClosed),
            Recorded::Close(code.clone()),
        ]
    );
    assert!(c.registry().is_empty());
    assert_eq!(
        c.join_lobby(&code, id("dave"), "Dave".into()).unwrap_err(),
        LobbyError::NotFound(code)
    );

    // Former racers are free to host their own lobby.
    assert!(c.create_lobby(id("bob"), "Bob".into()).is_ok());
}

#[test]
fn test_racer_disconnect_keeps_order_and_host() {
    let (mut c, gateway) = coordinator();
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    for name in ["bob", "carol", "dave"] {
        c.join_lobby(&code, id(name), name.into()).unwrap();
    }
    gateway.take();

    let lobby = match c.disconnect(&id("carol")) {
        Some(Departure::LeftLobby { lobby, .. }) => lobby,
        other => panic!("expected LeftLobby, got {other:?}"),
    };

    let ids: Vec<&str> = lobby.racers.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["bob", "dave"]);
    assert_eq!(lobby.host.id, id("alice"));
    assert_eq!(
        gateway.take(),
        vec![
            Recorded::Unsubscribe(code.clone(), id("carol")),
            Recorded::Publish(code, ServerEvent::LobbyUpdated { lobby }),
        ]
    );
}

#[test]
fn test_disconnect_unknown_participant_is_noop() {
    let (mut c, gateway) = coordinator();
    c.create_lobby(id("alice"), "Alice".into()).unwrap();
    gateway.take();

    assert_eq!(c.disconnect(&id("ghost")), None);
    assert!(gateway.take().is_empty());
    assert_eq!(c.registry().len(), 1);
}

#[test]
fn test_win_threshold_is_configurable() {
    let config = LobbyConfig {
        win_accuracy_threshold: 100.0,
        ..LobbyConfig::default()
    };
    let mut c = Coordinator::new(
        config,
        TrackCatalog::default(),
        ScriptedTexts::new(&[HOST_TEXT, TEXT_A]),
        RecordingGateway::default(),
    );
    let (code, _) = c.create_lobby(id("alice"), "Alice".into()).unwrap();
    c.join_lobby(&code, id("bob"), "Bob".into()).unwrap();
    c.start_game(&code, &id("alice")).unwrap();

    // One wrong character out of many is not good enough at 100%.
    let mut almost = TEXT_A.to_string();
    almost.pop();
    almost.push('!');
    let err = c.submit_final_text(&code, &id("bob"), &almost).unwrap_err();
    assert!(matches!(
        err,
        LobbyError::Rejected(Rejection::BelowAccuracy { threshold, .. }) if threshold == 100.0
    ));
}
