use std::time::Duration;

use playdeck::controller::{Ignored, Outcome, PendingOp, PlaybackController};
use playdeck::domain::state::PlaybackPhase;
use playdeck::integrations::media_resource::{MediaResource, ResourceEvent};
use playdeck::integrations::simulated::{SimulatedMedia, SimulatedResource};

fn controller_for(media: SimulatedMedia) -> PlaybackController<SimulatedResource> {
    let mut controller = PlaybackController::new();
    controller.attach(SimulatedResource::new(media));
    controller
}

fn tick(controller: &mut PlaybackController<SimulatedResource>, millis: u64) {
    controller
        .resource_mut()
        .expect("resource attached")
        .tick(Duration::from_millis(millis));
    controller.pump_events();
}

#[test]
fn blocked_autoplay_corrects_optimistic_playing_state() {
    let mut controller = controller_for(SimulatedMedia {
        block_autoplay: true,
        ..SimulatedMedia::default()
    });

    assert_eq!(controller.play(), Outcome::Applied);
    assert!(controller.state().expect("attached").is_playing());

    tick(&mut controller, 100);

    let state = controller.state().expect("attached");
    assert!(!state.is_playing());
    assert_eq!(state.phase, PlaybackPhase::Idle);

    let diagnostics = controller.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].operation, PendingOp::Play);
    assert!(diagnostics[0].message.contains("autoplay"));
    assert!(controller.take_diagnostics().is_empty());
}

#[test]
fn denied_fullscreen_is_reconciled_from_resource() {
    let mut controller = controller_for(SimulatedMedia {
        deny_fullscreen: true,
        ..SimulatedMedia::default()
    });

    controller.toggle_fullscreen();
    assert!(controller.state().expect("attached").is_fullscreen);

    tick(&mut controller, 10);

    assert!(!controller.state().expect("attached").is_fullscreen);
    let diagnostics = controller.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].operation, PendingOp::EnterFullscreen);
}

#[test]
fn granted_fullscreen_round_trips_through_events() {
    let mut controller = controller_for(SimulatedMedia::default());

    controller.toggle_fullscreen();
    tick(&mut controller, 10);
    assert!(controller.state().expect("attached").is_fullscreen);
    assert!(controller.resource().expect("attached").is_fullscreen());

    controller.toggle_fullscreen();
    tick(&mut controller, 10);
    assert!(!controller.state().expect("attached").is_fullscreen);
    assert!(controller.take_diagnostics().is_empty());
}

#[test]
fn rapid_double_toggle_ends_paused() {
    let mut controller = controller_for(SimulatedMedia::default());

    controller.toggle_play_pause();
    controller.toggle_play_pause();
    tick(&mut controller, 100);

    let state = controller.state().expect("attached");
    assert_eq!(state.phase, PlaybackPhase::Paused);
    assert!(controller.resource().expect("attached").paused());
    assert_eq!(state.current_time, 0.0);

    // The interrupted play is surfaced but does not flip the state back.
    let diagnostics = controller.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("interrupted"));
}

#[test]
fn external_pause_event_overrides_local_state() {
    let mut controller = controller_for(SimulatedMedia::default());
    controller.play();
    tick(&mut controller, 100);
    assert!(controller.state().expect("attached").is_playing());

    controller
        .resource_mut()
        .expect("attached")
        .emit(ResourceEvent::Paused);
    controller.pump_events();

    assert_eq!(
        controller.state().expect("attached").phase,
        PlaybackPhase::Paused
    );
}

#[test]
fn events_after_detach_never_reach_state() {
    let mut controller = controller_for(SimulatedMedia::default());
    let mut resource = controller.detach().expect("was attached");

    assert!(!resource.is_subscribed());
    resource.set_current_time(42.0);
    resource.emit(ResourceEvent::Ended);
    controller.handle_event(ResourceEvent::TimeUpdate);

    assert_eq!(controller.pump_events(), 0);
    assert!(controller.state().is_none());
}

#[test]
fn reattaching_replaces_the_previous_resource() {
    let mut controller = controller_for(SimulatedMedia::default());
    let previous = controller
        .attach(SimulatedResource::with_duration(30.0))
        .expect("first resource handed back");

    assert!(!previous.is_subscribed());
    assert_eq!(
        controller.state().expect("attached").duration,
        Some(30.0)
    );
}

#[test]
fn commands_while_unattached_are_ignored() {
    let mut controller: PlaybackController<SimulatedResource> = PlaybackController::new();
    let unattached = Outcome::Ignored(Ignored::Unattached);

    assert_eq!(controller.play(), unattached);
    assert_eq!(controller.pause(), unattached);
    assert_eq!(controller.toggle_play_pause(), unattached);
    assert_eq!(controller.set_volume(0.4), unattached);
    assert_eq!(controller.toggle_mute(), unattached);
    assert_eq!(controller.seek(10.0), unattached);
    assert_eq!(controller.skip(5.0), unattached);
    assert_eq!(controller.set_playback_rate(1.5), unattached);
    assert_eq!(controller.restart(), unattached);
    assert_eq!(controller.toggle_fullscreen(), unattached);
    assert_eq!(controller.pump_events(), 0);
    assert!(controller.state().is_none());
}

#[test]
fn attaching_a_running_resource_starts_in_playing_phase() {
    let mut resource = SimulatedResource::with_duration(60.0);
    let _pending = resource.play();

    let mut controller = PlaybackController::new();
    controller.attach(resource);

    assert!(controller.state().expect("attached").is_playing());
}

#[test]
fn diagnostics_keep_only_the_most_recent_failures() {
    let mut controller = controller_for(SimulatedMedia {
        block_autoplay: true,
        ..SimulatedMedia::default()
    });

    for _ in 0..40 {
        controller.play();
        tick(&mut controller, 10);
    }

    let diagnostics = controller.take_diagnostics();
    assert_eq!(diagnostics.len(), 32);
    assert!(diagnostics
        .iter()
        .all(|diagnostic| diagnostic.operation == PendingOp::Play));
    assert!(controller.take_diagnostics().is_empty());
}
