use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use anyhow::{anyhow, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceEvent {
    TimeUpdate,
    MetadataLoaded,
    /// More media became buffered.
    Progress,
    PlayStarted,
    Paused,
    Ended,
    FullscreenChanged(bool),
}

pub type EventSender = Sender<ResourceEvent>;
pub type EventReceiver = Receiver<ResourceEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel()
}

/// Outcome of a resource operation that settles after the call returns.
pub struct Pending {
    rx: Receiver<Result<()>>,
}

/// Settles the matching [`Pending`]. Dropping it unsettled rejects the operation.
pub struct PendingResolver {
    tx: Sender<Result<()>>,
}

impl Pending {
    pub fn channel() -> (PendingResolver, Pending) {
        let (tx, rx) = mpsc::channel();
        (PendingResolver { tx }, Pending { rx })
    }

    pub fn resolved(result: Result<()>) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(result);
        pending
    }

    pub fn try_take(&mut self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(anyhow!("operation was abandoned before it settled")))
            }
        }
    }
}

impl PendingResolver {
    pub fn resolve(self, result: Result<()>) {
        // The caller may have detached and dropped the pending side already.
        let _ = self.tx.send(result);
    }
}

/// The audio/video object a playback controller drives and observes.
///
/// Readers report the resource's own view of the world. `duration` is NaN
/// until metadata is available; `buffered_edge` is 0 when nothing is buffered.
pub trait MediaResource {
    fn play(&mut self) -> Pending;
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
    fn request_fullscreen(&mut self) -> Pending;
    fn exit_fullscreen(&mut self) -> Pending;

    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn buffered_edge(&self) -> f64;
    fn paused(&self) -> bool;
    fn is_fullscreen(&self) -> bool;

    /// Installs the single event subscriber, replacing any previous one.
    fn subscribe(&mut self, events: EventSender);
    /// Drops the subscriber; nothing is emitted until the next `subscribe`.
    fn unsubscribe(&mut self);

    fn tick(&mut self, _elapsed: Duration) {}
}

impl<R: MediaResource + ?Sized> MediaResource for Box<R> {
    fn play(&mut self) -> Pending {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn set_current_time(&mut self, seconds: f64) {
        (**self).set_current_time(seconds)
    }

    fn set_volume(&mut self, volume: f64) {
        (**self).set_volume(volume)
    }

    fn set_muted(&mut self, muted: bool) {
        (**self).set_muted(muted)
    }

    fn set_playback_rate(&mut self, rate: f64) {
        (**self).set_playback_rate(rate)
    }

    fn request_fullscreen(&mut self) -> Pending {
        (**self).request_fullscreen()
    }

    fn exit_fullscreen(&mut self) -> Pending {
        (**self).exit_fullscreen()
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn buffered_edge(&self) -> f64 {
        (**self).buffered_edge()
    }

    fn paused(&self) -> bool {
        (**self).paused()
    }

    fn is_fullscreen(&self) -> bool {
        (**self).is_fullscreen()
    }

    fn subscribe(&mut self, events: EventSender) {
        (**self).subscribe(events)
    }

    fn unsubscribe(&mut self) {
        (**self).unsubscribe()
    }

    fn tick(&mut self, elapsed: Duration) {
        (**self).tick(elapsed)
    }
}

/// Maps a 0.0-1.0 volume onto VLC's 0-512 scale, where 256 is nominal 100%.
pub fn volume_to_vlc_scale(volume: f64) -> u16 {
    let clamped = if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    };
    (clamped * 256.0).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_stays_open_until_resolved() {
        let (resolver, mut pending) = Pending::channel();
        assert!(pending.try_take().is_none());
        resolver.resolve(Ok(()));
        assert!(matches!(pending.try_take(), Some(Ok(()))));
    }

    #[test]
    fn dropped_resolver_rejects_pending() {
        let (resolver, mut pending) = Pending::channel();
        drop(resolver);
        let err = pending
            .try_take()
            .expect("abandoned operation settles")
            .expect_err("abandoned operation is a failure");
        assert!(err.to_string().contains("abandoned"));
    }

    #[test]
    fn vlc_volume_scale_maps_unit_range() {
        assert_eq!(volume_to_vlc_scale(0.0), 0);
        assert_eq!(volume_to_vlc_scale(0.5), 128);
        assert_eq!(volume_to_vlc_scale(1.0), 256);
        assert_eq!(volume_to_vlc_scale(4.0), 256);
        assert_eq!(volume_to_vlc_scale(f64::NAN), 0);
    }
}
