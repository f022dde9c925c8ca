use std::time::Duration;

use anyhow::anyhow;
use tracing::debug;

use super::media_resource::{EventSender, MediaResource, Pending, PendingResolver, ResourceEvent};
use crate::domain::state::known_duration;

/// Seconds of media buffered per second of wall time.
const BUFFER_FILL_RATE: f64 = 8.0;

/// Shape of the media a [`SimulatedResource`] pretends to play.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMedia {
    /// NaN models media that never reports a duration.
    pub duration_secs: f64,
    /// Metadata is known immediately when zero.
    pub metadata_delay: Duration,
    pub buffer_ahead_secs: f64,
    /// Rejects every play request the way a browser autoplay policy does.
    pub block_autoplay: bool,
    pub deny_fullscreen: bool,
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self {
            duration_secs: 120.0,
            metadata_delay: Duration::ZERO,
            buffer_ahead_secs: 30.0,
            block_autoplay: false,
            deny_fullscreen: false,
        }
    }
}

/// In-process media resource that advances only when [`tick`] is called.
///
/// It follows media-element rules: `play` flips `paused` immediately and
/// settles on the next tick, `pause` interrupts a pending play, seeks are
/// clamped into the media, and reaching the end pauses and emits `Ended`.
///
/// [`tick`]: MediaResource::tick
pub struct SimulatedResource {
    media: SimulatedMedia,
    clock: Duration,
    metadata_ready: bool,
    position: f64,
    buffered: f64,
    paused: bool,
    playing: bool,
    volume: f64,
    muted: bool,
    rate: f64,
    fullscreen: bool,
    pending_plays: Vec<PendingResolver>,
    pending_fullscreen: Vec<(bool, PendingResolver)>,
    subscriber: Option<EventSender>,
}

impl SimulatedResource {
    pub fn new(media: SimulatedMedia) -> Self {
        let metadata_ready = media.metadata_delay.is_zero();
        Self {
            media,
            clock: Duration::ZERO,
            metadata_ready,
            position: 0.0,
            buffered: 0.0,
            paused: true,
            playing: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            fullscreen: false,
            pending_plays: Vec::new(),
            pending_fullscreen: Vec::new(),
            subscriber: None,
        }
    }

    pub fn with_duration(duration_secs: f64) -> Self {
        Self::new(SimulatedMedia {
            duration_secs,
            ..SimulatedMedia::default()
        })
    }

    pub fn emit(&mut self, event: ResourceEvent) {
        if let Some(sender) = self.subscriber.as_ref() {
            if sender.send(event).is_err() {
                debug!("subscriber hung up; dropping it");
                self.subscriber = None;
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriber.is_some()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate
    }

    pub fn media_mut(&mut self) -> &mut SimulatedMedia {
        &mut self.media
    }

    fn known_duration(&self) -> Option<f64> {
        if self.metadata_ready {
            known_duration(self.media.duration_secs)
        } else {
            None
        }
    }

    fn at_end(&self) -> bool {
        self.known_duration()
            .is_some_and(|duration| self.position >= duration)
    }

    fn settle_plays(&mut self) {
        if self.pending_plays.is_empty() {
            return;
        }
        let resolvers = std::mem::take(&mut self.pending_plays);
        if self.media.block_autoplay {
            self.paused = true;
            for resolver in resolvers {
                resolver.resolve(Err(anyhow!(
                    "play() was blocked by the autoplay policy"
                )));
            }
            return;
        }
        for resolver in resolvers {
            resolver.resolve(Ok(()));
        }
        if !self.playing {
            self.playing = true;
            self.emit(ResourceEvent::PlayStarted);
        }
    }

    fn settle_fullscreen(&mut self) {
        let requests = std::mem::take(&mut self.pending_fullscreen);
        for (enter, resolver) in requests {
            if self.media.deny_fullscreen && enter {
                resolver.resolve(Err(anyhow!("fullscreen request denied by host policy")));
                continue;
            }
            resolver.resolve(Ok(()));
            if self.fullscreen != enter {
                self.fullscreen = enter;
                self.emit(ResourceEvent::FullscreenChanged(enter));
            }
        }
    }

    fn advance_playhead(&mut self, elapsed: f64) {
        if !self.playing {
            return;
        }
        let Some(duration) = self.known_duration() else {
            return;
        };
        self.position = (self.position + elapsed * self.rate).min(duration);
        self.emit(ResourceEvent::TimeUpdate);
        if self.position >= duration {
            self.playing = false;
            self.paused = true;
            self.emit(ResourceEvent::Paused);
            self.emit(ResourceEvent::Ended);
        }
    }

    fn fill_buffer(&mut self, elapsed: f64) {
        let Some(duration) = self.known_duration() else {
            return;
        };
        let target = (self.position + self.media.buffer_ahead_secs).min(duration);
        let start = self.buffered.max(self.position);
        let next = (start + elapsed * BUFFER_FILL_RATE).min(target);
        if next > self.buffered {
            self.buffered = next;
            self.emit(ResourceEvent::Progress);
        }
    }
}

impl MediaResource for SimulatedResource {
    fn play(&mut self) -> Pending {
        if self.at_end() {
            self.position = 0.0;
        }
        self.paused = false;
        let (resolver, pending) = Pending::channel();
        self.pending_plays.push(resolver);
        pending
    }

    fn pause(&mut self) {
        for resolver in self.pending_plays.drain(..) {
            resolver.resolve(Err(anyhow!(
                "play() request was interrupted by a call to pause()"
            )));
        }
        let was_paused = self.paused;
        self.paused = true;
        self.playing = false;
        if !was_paused {
            self.emit(ResourceEvent::Paused);
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut target = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if let Some(duration) = self.known_duration() {
            target = target.min(duration);
        }
        self.position = target;
        self.emit(ResourceEvent::TimeUpdate);
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
    }

    fn request_fullscreen(&mut self) -> Pending {
        let (resolver, pending) = Pending::channel();
        self.pending_fullscreen.push((true, resolver));
        pending
    }

    fn exit_fullscreen(&mut self) -> Pending {
        let (resolver, pending) = Pending::channel();
        self.pending_fullscreen.push((false, resolver));
        pending
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.known_duration().unwrap_or(f64::NAN)
    }

    fn buffered_edge(&self) -> f64 {
        self.buffered
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn subscribe(&mut self, events: EventSender) {
        self.subscriber = Some(events);
    }

    fn unsubscribe(&mut self) {
        self.subscriber = None;
    }

    fn tick(&mut self, elapsed: Duration) {
        self.clock += elapsed;
        if !self.metadata_ready && self.clock >= self.media.metadata_delay {
            self.metadata_ready = true;
            self.emit(ResourceEvent::MetadataLoaded);
        }

        self.settle_plays();
        self.settle_fullscreen();

        let seconds = elapsed.as_secs_f64();
        self.advance_playhead(seconds);
        self.fill_buffer(seconds);
    }
}
