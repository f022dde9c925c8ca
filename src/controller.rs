use std::collections::VecDeque;
use std::mem;

use tracing::{debug, info, warn};

use crate::domain::state::{known_duration, sanitize_time, PlaybackPhase, PlaybackState};
use crate::integrations::media_resource::{
    event_channel, EventReceiver, MediaResource, Pending, ResourceEvent,
};

/// Rates offered by `step_rate`. `set_playback_rate` accepts any positive rate.
pub const RATE_PRESETS: [f64; 4] = [0.5, 1.0, 1.5, 2.0];

const MAX_DIAGNOSTICS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    Unattached,
    DurationUnknown,
    InvalidArgument(&'static str),
}

impl Ignored {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unattached => "no media attached",
            Self::DurationUnknown => "duration not known yet",
            Self::InvalidArgument(reason) => reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(Ignored),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Play,
    EnterFullscreen,
    ExitFullscreen,
}

impl PendingOp {
    pub fn label(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::EnterFullscreen => "enter fullscreen",
            Self::ExitFullscreen => "exit fullscreen",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub operation: PendingOp,
    pub message: String,
}

struct InFlight {
    op: PendingOp,
    phase_before: PlaybackPhase,
    pending: Pending,
}

struct Attachment<R> {
    resource: R,
    events: EventReceiver,
    state: PlaybackState,
    in_flight: Vec<InFlight>,
}

impl<R: MediaResource> Attachment<R> {
    fn read_timeline(&self) -> PlaybackState {
        PlaybackState {
            current_time: sanitize_time(self.resource.current_time()),
            duration: known_duration(self.resource.duration()),
            buffered_edge: sanitize_time(self.resource.buffered_edge()),
            ..self.state
        }
    }

    fn refresh_timeline(&mut self) {
        self.state = self.read_timeline();
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        self.state = PlaybackState {
            phase,
            ..self.state
        };
    }

    fn track(&mut self, op: PendingOp, pending: Pending) {
        self.in_flight.push(InFlight {
            op,
            phase_before: self.state.phase,
            pending,
        });
    }

    fn reconcile_rejection(&mut self, op: PendingOp, phase_before: PlaybackPhase) {
        match op {
            PendingOp::Play => {
                // A later pause or end already moved the phase on; keep it.
                let phase = if !self.resource.paused() {
                    PlaybackPhase::Playing
                } else if self.state.phase != PlaybackPhase::Playing {
                    self.state.phase
                } else if phase_before == PlaybackPhase::Playing {
                    PlaybackPhase::Paused
                } else {
                    phase_before
                };
                self.state = PlaybackState {
                    phase,
                    ..self.read_timeline()
                };
            }
            PendingOp::EnterFullscreen | PendingOp::ExitFullscreen => {
                self.state = PlaybackState {
                    is_fullscreen: self.resource.is_fullscreen(),
                    ..self.state
                };
            }
        }
    }
}

/// Drives a [`MediaResource`] and mirrors its state in a [`PlaybackState`].
///
/// Commands mutate the resource and update the snapshot optimistically.
/// Events from the resource and the results of pending operations, both
/// consumed by [`pump_events`](Self::pump_events), correct the snapshot
/// whenever the resource disagrees.
pub struct PlaybackController<R: MediaResource> {
    attachment: Option<Attachment<R>>,
    time_listener: Option<Box<dyn FnMut(f64)>>,
    diagnostics: VecDeque<Diagnostic>,
}

impl<R: MediaResource> Default for PlaybackController<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MediaResource> PlaybackController<R> {
    pub fn new() -> Self {
        Self {
            attachment: None,
            time_listener: None,
            diagnostics: VecDeque::new(),
        }
    }

    /// A previously attached resource is detached first and handed back.
    pub fn attach(&mut self, mut resource: R) -> Option<R> {
        let previous = self.detach();

        let (sender, events) = event_channel();
        resource.subscribe(sender);

        let mut attachment = Attachment {
            resource,
            events,
            state: PlaybackState::default(),
            in_flight: Vec::new(),
        };
        attachment.refresh_timeline();
        if !attachment.resource.paused() {
            attachment.set_phase(PlaybackPhase::Playing);
        }
        info!(
            duration = ?attachment.state.duration,
            playing = attachment.state.is_playing(),
            "media resource attached"
        );
        self.attachment = Some(attachment);

        previous
    }

    /// Unsubscribes from the resource and returns it. Events the resource
    /// emits afterwards are never seen by this controller.
    pub fn detach(&mut self) -> Option<R> {
        let mut attachment = self.attachment.take()?;
        attachment.resource.unsubscribe();
        if !attachment.in_flight.is_empty() {
            debug!(
                abandoned = attachment.in_flight.len(),
                "dropping unsettled resource operations on detach"
            );
        }
        info!("media resource detached");
        Some(attachment.resource)
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    pub fn state(&self) -> Option<PlaybackState> {
        self.attachment.as_ref().map(|attachment| attachment.state)
    }

    pub fn resource(&self) -> Option<&R> {
        self.attachment.as_ref().map(|attachment| &attachment.resource)
    }

    pub fn resource_mut(&mut self) -> Option<&mut R> {
        self.attachment
            .as_mut()
            .map(|attachment| &mut attachment.resource)
    }

    pub fn set_time_update_listener(&mut self, listener: impl FnMut(f64) + 'static) {
        self.time_listener = Some(Box::new(listener));
    }

    pub fn clear_time_update_listener(&mut self) {
        self.time_listener = None;
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        mem::take(&mut self.diagnostics).into()
    }

    pub fn toggle_play_pause(&mut self) -> Outcome {
        let playing = match self.attachment.as_ref() {
            Some(attachment) => attachment.state.is_playing(),
            None => return Outcome::Ignored(Ignored::Unattached),
        };
        if playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn play(&mut self) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };

        if attachment.state.phase == PlaybackPhase::Ended {
            debug!("restarting ended media before play");
            attachment.resource.set_current_time(0.0);
        }
        let pending = attachment.resource.play();
        attachment.track(PendingOp::Play, pending);
        attachment.state = PlaybackState {
            phase: PlaybackPhase::Playing,
            ..attachment.read_timeline()
        };
        debug!("play issued");
        Outcome::Applied
    }

    pub fn pause(&mut self) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };

        attachment.resource.pause();
        let phase = match attachment.state.phase {
            PlaybackPhase::Ended => PlaybackPhase::Ended,
            _ => PlaybackPhase::Paused,
        };
        attachment.set_phase(phase);
        debug!("pause issued");
        Outcome::Applied
    }

    /// Sets the volume, clamped to `[0, 1]`. Zero mutes, anything else unmutes.
    pub fn set_volume(&mut self, volume: f64) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        if volume.is_nan() {
            return Outcome::Ignored(Ignored::InvalidArgument("volume must be a number"));
        }

        let volume = volume.clamp(0.0, 1.0);
        let muted = volume == 0.0;
        attachment.resource.set_volume(volume);
        attachment.resource.set_muted(muted);
        attachment.state = PlaybackState {
            volume,
            is_muted: muted,
            ..attachment.state
        };
        debug!(volume, muted, "volume set");
        Outcome::Applied
    }

    pub fn step_volume(&mut self, delta: f64) -> Outcome {
        let Some(current) = self.state().map(|state| state.volume) else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        self.set_volume(current + delta)
    }

    pub fn toggle_mute(&mut self) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };

        let muted = !attachment.state.is_muted;
        attachment.resource.set_muted(muted);
        attachment.state = PlaybackState {
            is_muted: muted,
            ..attachment.state
        };
        debug!(muted, "mute toggled");
        Outcome::Applied
    }

    pub fn seek(&mut self, percent: f64) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        if percent.is_nan() {
            return Outcome::Ignored(Ignored::InvalidArgument("seek position must be a number"));
        }
        let Some(duration) = attachment.state.duration else {
            return Outcome::Ignored(Ignored::DurationUnknown);
        };

        let target = percent.clamp(0.0, 100.0) / 100.0 * duration;
        attachment.resource.set_current_time(target);
        attachment.refresh_timeline();
        if attachment.state.phase == PlaybackPhase::Ended && attachment.state.current_time < duration
        {
            attachment.set_phase(PlaybackPhase::Paused);
        }
        debug!(percent, target, "seek issued");
        Outcome::Applied
    }

    /// Moves the playhead by `delta_seconds`, never before the start or past
    /// a known end.
    pub fn skip(&mut self, delta_seconds: f64) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        if !delta_seconds.is_finite() {
            return Outcome::Ignored(Ignored::InvalidArgument("skip amount must be finite"));
        }

        let mut target = (attachment.state.current_time + delta_seconds).max(0.0);
        if let Some(duration) = attachment.state.duration {
            target = target.min(duration);
        }
        attachment.resource.set_current_time(target);
        attachment.refresh_timeline();
        if attachment.state.phase == PlaybackPhase::Ended && delta_seconds < 0.0 {
            attachment.set_phase(PlaybackPhase::Paused);
        }
        debug!(delta_seconds, target, "skip issued");
        Outcome::Applied
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        if !rate.is_finite() || rate <= 0.0 {
            return Outcome::Ignored(Ignored::InvalidArgument(
                "playback rate must be a positive number",
            ));
        }

        attachment.resource.set_playback_rate(rate);
        attachment.state = PlaybackState {
            playback_rate: rate,
            ..attachment.state
        };
        debug!(rate, "playback rate set");
        Outcome::Applied
    }

    pub fn step_rate(&mut self, faster: bool) -> Outcome {
        let Some(current) = self.state().map(|state| state.playback_rate) else {
            return Outcome::Ignored(Ignored::Unattached);
        };
        let next = if faster {
            RATE_PRESETS.iter().find(|&&rate| rate > current + 0.001)
        } else {
            RATE_PRESETS.iter().rev().find(|&&rate| rate < current - 0.001)
        };
        match next {
            Some(&rate) => self.set_playback_rate(rate),
            None => Outcome::Ignored(Ignored::InvalidArgument("no further rate preset")),
        }
    }

    /// Jumps back to the start. Playback keeps running if it was running.
    pub fn restart(&mut self) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };

        attachment.resource.set_current_time(0.0);
        let phase = match attachment.state.phase {
            PlaybackPhase::Ended => PlaybackPhase::Paused,
            phase => phase,
        };
        attachment.state = PlaybackState {
            phase,
            current_time: 0.0,
            ..attachment.state
        };
        debug!("restart issued");
        Outcome::Applied
    }

    pub fn toggle_fullscreen(&mut self) -> Outcome {
        let Some(attachment) = self.attachment.as_mut() else {
            return Outcome::Ignored(Ignored::Unattached);
        };

        let entering = !attachment.state.is_fullscreen;
        let (op, pending) = if entering {
            (PendingOp::EnterFullscreen, attachment.resource.request_fullscreen())
        } else {
            (PendingOp::ExitFullscreen, attachment.resource.exit_fullscreen())
        };
        attachment.track(op, pending);
        attachment.state = PlaybackState {
            is_fullscreen: entering,
            ..attachment.state
        };
        debug!(entering, "fullscreen change requested");
        Outcome::Applied
    }

    /// Processes queued resource events in emission order, then settles any
    /// pending operations that finished. Returns the number of events handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let Some(attachment) = self.attachment.as_ref() else {
                break;
            };
            let Ok(event) = attachment.events.try_recv() else {
                break;
            };
            self.handle_event(event);
            handled += 1;
        }
        self.settle_pending();
        handled
    }

    pub fn handle_event(&mut self, event: ResourceEvent) {
        let Some(attachment) = self.attachment.as_mut() else {
            debug!(?event, "ignoring resource event while unattached");
            return;
        };

        match event {
            ResourceEvent::TimeUpdate => {
                attachment.refresh_timeline();
                let current_time = attachment.state.current_time;
                if let Some(listener) = self.time_listener.as_mut() {
                    listener(current_time);
                }
            }
            ResourceEvent::MetadataLoaded | ResourceEvent::Progress => {
                attachment.refresh_timeline();
            }
            ResourceEvent::PlayStarted => {
                attachment.state = PlaybackState {
                    phase: PlaybackPhase::Playing,
                    ..attachment.read_timeline()
                };
            }
            ResourceEvent::Paused => {
                if attachment.state.phase != PlaybackPhase::Ended {
                    attachment.state = PlaybackState {
                        phase: PlaybackPhase::Paused,
                        ..attachment.read_timeline()
                    };
                }
            }
            ResourceEvent::Ended => {
                attachment.state = PlaybackState {
                    phase: PlaybackPhase::Ended,
                    ..attachment.read_timeline()
                };
            }
            ResourceEvent::FullscreenChanged(active) => {
                attachment.state = PlaybackState {
                    is_fullscreen: active,
                    ..attachment.state
                };
            }
        }
    }

    fn settle_pending(&mut self) {
        let Some(attachment) = self.attachment.as_mut() else {
            return;
        };

        let flights = mem::take(&mut attachment.in_flight);
        for mut flight in flights {
            match flight.pending.try_take() {
                None => attachment.in_flight.push(flight),
                Some(Ok(())) => debug!(operation = flight.op.label(), "resource operation settled"),
                Some(Err(err)) => {
                    warn!(
                        operation = flight.op.label(),
                        error = %err,
                        "resource rejected operation"
                    );
                    attachment.reconcile_rejection(flight.op, flight.phase_before);
                    if self.diagnostics.len() == MAX_DIAGNOSTICS {
                        self.diagnostics.pop_front();
                    }
                    self.diagnostics.push_back(Diagnostic {
                        operation: flight.op,
                        message: format!("{err:#}"),
                    });
                }
            }
        }
    }
}

impl<R: MediaResource> Drop for PlaybackController<R> {
    fn drop(&mut self) {
        let _ = self.detach();
    }
}
