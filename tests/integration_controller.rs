use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use playdeck::controller::{Ignored, Outcome, PlaybackController};
use playdeck::domain::state::PlaybackPhase;
use playdeck::integrations::media_resource::{MediaResource, ResourceEvent};
use playdeck::integrations::simulated::{SimulatedMedia, SimulatedResource};

fn attached(duration_secs: f64) -> PlaybackController<SimulatedResource> {
    let mut controller = PlaybackController::new();
    controller.attach(SimulatedResource::with_duration(duration_secs));
    controller
}

/// Moves the playhead on the resource side and delivers the time update.
fn report_time(controller: &mut PlaybackController<SimulatedResource>, seconds: f64) {
    controller
        .resource_mut()
        .expect("resource attached")
        .set_current_time(seconds);
    controller.pump_events();
}

#[test]
fn progress_stays_in_range_for_degenerate_durations() {
    for duration in [f64::NAN, 0.0, 0.0001, 120.0] {
        let mut controller = attached(duration);
        for time in [0.0, 0.00005, 0.0001, 60.0, 120.0] {
            report_time(&mut controller, time);
            let state = controller.state().expect("attached");
            let progress = state.progress_percent();
            let buffered = state.buffered_percent();
            assert!(
                (0.0..=100.0).contains(&progress),
                "progress {progress} out of range for duration {duration}"
            );
            assert!((0.0..=100.0).contains(&buffered));
            if duration.is_nan() || duration == 0.0 {
                assert_eq!(progress, 0.0);
                assert_eq!(buffered, 0.0);
            }
        }
    }
}

#[test]
fn seek_then_time_update_matches_requested_percent() {
    for percent in [0.0, 50.0, 100.0] {
        let mut controller = attached(120.0);
        assert_eq!(controller.seek(percent), Outcome::Applied);
        controller.pump_events();

        let state = controller.state().expect("attached");
        assert_abs_diff_eq!(state.progress_percent(), percent, epsilon = 1e-9);
    }
}

#[test]
fn seek_without_duration_is_ignored() {
    let mut controller = PlaybackController::new();
    controller.attach(SimulatedResource::new(SimulatedMedia {
        metadata_delay: Duration::from_secs(5),
        ..SimulatedMedia::default()
    }));

    assert_eq!(
        controller.seek(50.0),
        Outcome::Ignored(Ignored::DurationUnknown)
    );
    assert_eq!(controller.state().expect("attached").current_time, 0.0);
}

#[test]
fn seek_rejects_nan_and_clamps_out_of_range_percent() {
    let mut controller = attached(200.0);
    assert!(matches!(
        controller.seek(f64::NAN),
        Outcome::Ignored(Ignored::InvalidArgument(_))
    ));

    controller.seek(150.0);
    assert_eq!(controller.state().expect("attached").current_time, 200.0);
    controller.seek(-20.0);
    assert_eq!(controller.state().expect("attached").current_time, 0.0);
}

#[test]
fn zero_volume_mutes_and_nonzero_volume_unmutes() {
    let mut controller = attached(60.0);

    controller.set_volume(0.0);
    let state = controller.state().expect("attached");
    assert!(state.is_muted);
    assert!(controller.resource().expect("attached").muted());

    controller.toggle_mute();
    controller.toggle_mute();
    controller.set_volume(0.5);
    let state = controller.state().expect("attached");
    assert!(!state.is_muted);
    assert_eq!(state.volume, 0.5);
    assert!(!controller.resource().expect("attached").muted());
    assert_eq!(controller.resource().expect("attached").volume(), 0.5);
}

#[test]
fn volume_is_clamped_and_nan_is_rejected() {
    let mut controller = attached(60.0);

    controller.set_volume(3.0);
    assert_eq!(controller.state().expect("attached").volume, 1.0);
    assert_eq!(controller.resource().expect("attached").volume(), 1.0);

    controller.set_volume(-1.0);
    assert_eq!(controller.state().expect("attached").volume, 0.0);
    assert!(controller.state().expect("attached").is_muted);

    assert!(matches!(
        controller.set_volume(f64::NAN),
        Outcome::Ignored(Ignored::InvalidArgument(_))
    ));
    assert_eq!(controller.resource().expect("attached").volume(), 0.0);
}

#[test]
fn double_mute_toggle_is_identity_and_keeps_volume() {
    let mut controller = attached(60.0);
    controller.set_volume(0.7);
    let before = controller.state().expect("attached");

    controller.toggle_mute();
    let muted = controller.state().expect("attached");
    assert!(muted.is_muted);
    assert_eq!(muted.volume, 0.7);

    controller.toggle_mute();
    let after = controller.state().expect("attached");
    assert_eq!(after.is_muted, before.is_muted);
    assert_eq!(after.volume, 0.7);
    assert_eq!(controller.resource().expect("attached").volume(), 0.7);
}

#[test]
fn skip_clamps_at_start() {
    let mut controller = attached(120.0);
    report_time(&mut controller, 5.0);

    controller.skip(-10.0);
    assert_eq!(controller.state().expect("attached").current_time, 0.0);
}

#[test]
fn skip_clamps_at_duration() {
    let mut controller = attached(120.0);
    report_time(&mut controller, 115.0);

    controller.skip(10.0);
    assert_eq!(controller.state().expect("attached").current_time, 120.0);
}

#[test]
fn skip_without_duration_only_clamps_lower_bound() {
    let mut controller = attached(f64::NAN);
    controller.skip(30.0);
    assert_eq!(controller.state().expect("attached").current_time, 30.0);
    controller.skip(-45.0);
    assert_eq!(controller.state().expect("attached").current_time, 0.0);
    assert!(matches!(
        controller.skip(f64::INFINITY),
        Outcome::Ignored(Ignored::InvalidArgument(_))
    ));
}

#[test]
fn restart_zeroes_position_while_playing_or_paused() {
    for start_playing in [true, false] {
        let mut controller = attached(120.0);
        if start_playing {
            controller.play();
            controller.resource_mut().expect("attached").tick(Duration::from_secs(1));
            controller.pump_events();
        }
        report_time(&mut controller, 80.0);

        assert_eq!(controller.restart(), Outcome::Applied);
        let state = controller.state().expect("attached");
        assert_eq!(state.current_time, 0.0);
        assert_eq!(state.progress_percent(), 0.0);
        assert_eq!(state.is_playing(), start_playing);
    }
}

#[test]
fn rate_must_be_positive_and_finite() {
    let mut controller = attached(60.0);
    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            controller.set_playback_rate(bad),
            Outcome::Ignored(Ignored::InvalidArgument(_))
        ));
    }
    assert_eq!(controller.resource().expect("attached").playback_rate(), 1.0);

    controller.set_playback_rate(3.25);
    assert_eq!(controller.state().expect("attached").playback_rate, 3.25);
    assert_eq!(controller.resource().expect("attached").playback_rate(), 3.25);
}

#[test]
fn rate_steps_through_presets() {
    let mut controller = attached(60.0);
    controller.step_rate(true);
    assert_eq!(controller.state().expect("attached").playback_rate, 1.5);
    controller.step_rate(true);
    controller.step_rate(true);
    assert_eq!(controller.state().expect("attached").playback_rate, 2.0);

    controller.set_playback_rate(0.75);
    controller.step_rate(false);
    assert_eq!(controller.state().expect("attached").playback_rate, 0.5);
    assert!(!controller.step_rate(false).is_applied());
}

#[test]
fn time_update_notifies_listener_with_raw_time() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut controller = attached(60.0);
    controller.set_time_update_listener(move |time| sink.borrow_mut().push(time));

    report_time(&mut controller, 12.5);
    report_time(&mut controller, 13.0);

    assert_eq!(*seen.borrow(), vec![12.5, 13.0]);
}

#[test]
fn metadata_arrival_fills_in_duration() {
    let mut controller = PlaybackController::new();
    controller.attach(SimulatedResource::new(SimulatedMedia {
        duration_secs: 90.0,
        metadata_delay: Duration::from_millis(300),
        ..SimulatedMedia::default()
    }));
    assert!(!controller.state().expect("attached").has_metadata());

    controller
        .resource_mut()
        .expect("attached")
        .tick(Duration::from_millis(300));
    controller.pump_events();

    let state = controller.state().expect("attached");
    assert_eq!(state.duration, Some(90.0));
    assert!(state.buffered_edge > 0.0);
}

#[test]
fn playback_runs_to_end_and_replays_from_start() {
    let mut controller = attached(2.0);
    controller.play();
    controller
        .resource_mut()
        .expect("attached")
        .tick(Duration::from_secs(3));
    controller.pump_events();

    let ended = controller.state().expect("attached");
    assert_eq!(ended.phase, PlaybackPhase::Ended);
    assert!(!ended.is_playing());
    assert_eq!(ended.progress_percent(), 100.0);

    controller.toggle_play_pause();
    let replay = controller.state().expect("attached");
    assert!(replay.is_playing());
    assert_eq!(replay.current_time, 0.0);
}

#[test]
fn events_are_applied_in_emission_order() {
    let mut controller = attached(60.0);
    let resource = controller.resource_mut().expect("attached");
    resource.emit(ResourceEvent::PlayStarted);
    resource.emit(ResourceEvent::Paused);
    resource.emit(ResourceEvent::FullscreenChanged(true));
    resource.emit(ResourceEvent::FullscreenChanged(false));

    assert_eq!(controller.pump_events(), 4);
    let state = controller.state().expect("attached");
    assert_eq!(state.phase, PlaybackPhase::Paused);
    assert!(!state.is_fullscreen);
}
