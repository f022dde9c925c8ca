use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use super::media_resource::{
    volume_to_vlc_scale, EventSender, MediaResource, Pending, PendingResolver, ResourceEvent,
};

/// Subset of VLC's `/requests/status.json` the resource mirrors.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VlcStatus {
    #[serde(default)]
    pub time: f64,
    /// Zero or negative until VLC knows the length.
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "flag")]
    pub fullscreen: bool,
}

impl VlcStatus {
    pub fn is_playing(&self) -> bool {
        self.state == "playing"
    }

    fn has_length(&self) -> bool {
        self.length > 0.0
    }
}

// VLC 2.x reports fullscreen as 0/1, VLC 3.x as a boolean.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(value) => value,
        serde_json::Value::Number(value) => value.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

pub fn status_events(previous: Option<&VlcStatus>, next: &VlcStatus) -> Vec<ResourceEvent> {
    let mut events = Vec::new();
    let Some(previous) = previous else {
        if next.has_length() {
            events.push(ResourceEvent::MetadataLoaded);
        }
        if next.is_playing() {
            events.push(ResourceEvent::PlayStarted);
        }
        if next.fullscreen {
            events.push(ResourceEvent::FullscreenChanged(true));
        }
        events.push(ResourceEvent::TimeUpdate);
        return events;
    };

    if !previous.has_length() && next.has_length() {
        events.push(ResourceEvent::MetadataLoaded);
    }
    if previous.time != next.time {
        events.push(ResourceEvent::TimeUpdate);
    }
    if previous.state != next.state {
        match next.state.as_str() {
            "playing" => events.push(ResourceEvent::PlayStarted),
            "paused" => events.push(ResourceEvent::Paused),
            "stopped" if previous.is_playing() || previous.state == "paused" => {
                events.push(ResourceEvent::Ended)
            }
            _ => {}
        }
    }
    if previous.fullscreen != next.fullscreen {
        events.push(ResourceEvent::FullscreenChanged(next.fullscreen));
    }
    events
}

/// Events that move readers from the status a command promised to the one
/// VLC reported back. Unlike [`status_events`], a stop here means the command
/// did not take, not that the media ended.
pub fn correction_events(expected: &VlcStatus, reported: &VlcStatus) -> Vec<ResourceEvent> {
    let mut events = Vec::new();
    if !expected.has_length() && reported.has_length() {
        events.push(ResourceEvent::MetadataLoaded);
    }
    if expected.time != reported.time {
        events.push(ResourceEvent::TimeUpdate);
    }
    if expected.is_playing() != reported.is_playing() {
        events.push(if reported.is_playing() {
            ResourceEvent::PlayStarted
        } else {
            ResourceEvent::Paused
        });
    }
    if expected.fullscreen != reported.fullscreen {
        events.push(ResourceEvent::FullscreenChanged(reported.fullscreen));
    }
    events
}

pub struct VlcHttpClient {
    client: Client,
    base_url: String,
    password: String,
}

impl VlcHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building VLC HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            password: password.into(),
        })
    }

    pub fn status(&self) -> Result<VlcStatus> {
        self.request(None, None)
    }

    pub fn send_command(&self, command: &str, value: Option<&str>) -> Result<VlcStatus> {
        self.request(Some(command), value)
    }

    fn request(&self, command: Option<&str>, value: Option<&str>) -> Result<VlcStatus> {
        let mut request = self
            .client
            .get(format!("{}/requests/status.json", self.base_url))
            .basic_auth("", Some(self.password.clone()));

        if let Some(command) = command {
            request = request.query(&[("command", command)]);
        }
        if let Some(value) = value {
            request = request.query(&[("val", value)]);
        }

        let label = command.unwrap_or("status");
        let response = request.send().with_context(|| {
            format!(
                "failed sending VLC HTTP request '{label}' to {}; enable VLC web interface and verify host/port",
                self.base_url
            )
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(anyhow!(
                "VLC HTTP authentication failed (401); check PLAYDECK_VLC_HTTP_PASSWORD"
            ));
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("VLC HTTP request '{label}' returned HTTP {status}"))?;

        response
            .json::<VlcStatus>()
            .with_context(|| format!("VLC HTTP request '{label}' returned unreadable status"))
    }
}

struct Job {
    command: &'static str,
    value: Option<String>,
    done: Option<PendingResolver>,
}

#[derive(Default)]
struct Shared {
    /// What readers see: VLC's last report plus optimistic patches.
    status: Mutex<VlcStatus>,
    subscriber: Mutex<Option<EventSender>>,
    /// Commands queued or running on the worker.
    queued: AtomicUsize,
    resync: AtomicBool,
    stop: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn emit(&self, events: &[ResourceEvent]) {
        if events.is_empty() {
            return;
        }
        let mut subscriber = lock(&self.subscriber);
        let Some(sender) = subscriber.as_ref() else {
            return;
        };
        for event in events {
            if sender.send(*event).is_err() {
                *subscriber = None;
                return;
            }
        }
    }
}

/// Media resource backed by a running VLC instance.
///
/// Commands are queued to a worker thread so callers never wait on HTTP.
/// Readers answer from the last known status, patched optimistically when a
/// command is issued. Every status VLC reports, whether from a command or
/// from the poller, is diffed against that patched view and the differences
/// are emitted, so a command VLC did not carry out is undone by events.
pub struct VlcHttpResource {
    shared: Arc<Shared>,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
    volume: f64,
    muted: bool,
}

impl VlcHttpResource {
    pub fn connect(client: VlcHttpClient, poll_interval: Duration) -> Result<Self> {
        let client = Arc::new(client);
        let shared = Arc::new(Shared::default());

        let (jobs, queue) = mpsc::channel::<Job>();
        let worker = {
            let client = Arc::clone(&client);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("vlc-http-commands".to_string())
                .spawn(move || {
                    for job in queue {
                        run_job(&client, &shared, job);
                    }
                })
                .context("failed to start VLC command worker")?
        };

        let poller = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("vlc-http-poller".to_string())
                .spawn(move || poll_status(&client, &shared, poll_interval))
                .context("failed to start VLC status poller")?
        };

        Ok(Self {
            shared,
            jobs: Some(jobs),
            worker: Some(worker),
            poller: Some(poller),
            volume: 1.0,
            muted: false,
        })
    }

    fn dispatch(
        &self,
        command: &'static str,
        value: Option<String>,
        done: Option<PendingResolver>,
        patch: impl FnOnce(&mut VlcStatus),
    ) {
        let Some(jobs) = self.jobs.as_ref() else {
            return;
        };
        // Counted before patching so no report taken before the command can
        // overwrite the patch.
        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        patch(&mut lock(&self.shared.status));

        let job = Job {
            command,
            value,
            done,
        };
        if let Err(mpsc::SendError(job)) = jobs.send(job) {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            warn!(command = job.command, "VLC command worker is gone");
            if let Some(done) = job.done {
                done.resolve(Err(anyhow!("VLC command worker stopped")));
            }
        }
    }

    fn send(&self, command: &'static str, value: String) {
        self.dispatch(command, Some(value), None, |_| {});
    }

    fn pending_command(
        &self,
        command: &'static str,
        patch: impl FnOnce(&mut VlcStatus),
    ) -> Pending {
        let (resolver, pending) = Pending::channel();
        self.dispatch(command, None, Some(resolver), patch);
        pending
    }

    fn status(&self) -> VlcStatus {
        lock(&self.shared.status).clone()
    }
}

fn run_job(client: &VlcHttpClient, shared: &Shared, job: Job) {
    let result = client.send_command(job.command, job.value.as_deref());
    let reported = match &result {
        Ok(status) => Some(status.clone()),
        Err(err) => {
            warn!(command = job.command, error = %err, "VLC HTTP command failed");
            client.status().ok()
        }
    };

    if let Some(reported) = reported {
        let events = {
            let mut status = lock(&shared.status);
            // A later queued command has patched the status again; its own
            // report settles it.
            if shared.queued.load(Ordering::SeqCst) == 1 {
                let events = correction_events(&status, &reported);
                *status = reported;
                events
            } else {
                Vec::new()
            }
        };
        if !events.is_empty() {
            debug!(command = job.command, ?events, "VLC state differs from command");
        }
        shared.emit(&events);
    }
    shared.queued.fetch_sub(1, Ordering::SeqCst);

    if let Some(done) = job.done {
        done.resolve(result.map(|_| ()));
    }
}

fn poll_status(client: &VlcHttpClient, shared: &Shared, interval: Duration) {
    let mut failing = false;
    while !shared.stop.load(Ordering::Relaxed) {
        match client.status() {
            Ok(reported) => {
                if failing {
                    debug!("VLC status polling recovered");
                    failing = false;
                }
                let events = {
                    let mut status = lock(&shared.status);
                    if shared.queued.load(Ordering::SeqCst) > 0 {
                        None
                    } else {
                        let previous = if shared.resync.swap(false, Ordering::SeqCst) {
                            None
                        } else {
                            Some(status.clone())
                        };
                        let events = status_events(previous.as_ref(), &reported);
                        *status = reported;
                        Some(events)
                    }
                };
                if let Some(events) = events {
                    shared.emit(&events);
                }
            }
            Err(err) => {
                if !failing {
                    warn!(error = %err, "VLC status polling failed");
                    failing = true;
                }
            }
        }
        thread::sleep(interval);
    }
}

impl MediaResource for VlcHttpResource {
    fn play(&mut self) -> Pending {
        self.pending_command("pl_forceresume", |status| {
            status.state = "playing".to_string()
        })
    }

    fn pause(&mut self) {
        self.dispatch("pl_forcepause", None, None, |status| {
            status.state = "paused".to_string()
        });
    }

    fn set_current_time(&mut self, seconds: f64) {
        let target = seconds.max(0.0).round();
        self.dispatch(
            "seek",
            Some(format!("{}", target as u64)),
            None,
            |status| status.time = target,
        );
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
        if !self.muted {
            self.send("volume", volume_to_vlc_scale(volume).to_string());
        }
    }

    // VLC has no mute flag of its own; muting parks the volume at zero.
    fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        let level = if muted { 0.0 } else { self.volume };
        self.send("volume", volume_to_vlc_scale(level).to_string());
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.send("rate", rate.to_string());
    }

    // VLC only offers a toggle, so the patched flag decides whether to send it.
    fn request_fullscreen(&mut self) -> Pending {
        if self.status().fullscreen {
            return Pending::resolved(Ok(()));
        }
        self.pending_command("fullscreen", |status| status.fullscreen = true)
    }

    fn exit_fullscreen(&mut self) -> Pending {
        if !self.status().fullscreen {
            return Pending::resolved(Ok(()));
        }
        self.pending_command("fullscreen", |status| status.fullscreen = false)
    }

    fn current_time(&self) -> f64 {
        self.status().time
    }

    fn duration(&self) -> f64 {
        let status = self.status();
        if status.has_length() {
            status.length
        } else {
            f64::NAN
        }
    }

    // VLC plays local files, which are fully available once opened.
    fn buffered_edge(&self) -> f64 {
        let status = self.status();
        if status.has_length() {
            status.length
        } else {
            0.0
        }
    }

    fn paused(&self) -> bool {
        !self.status().is_playing()
    }

    fn is_fullscreen(&self) -> bool {
        self.status().fullscreen
    }

    fn subscribe(&mut self, events: EventSender) {
        *lock(&self.shared.subscriber) = Some(events);
        self.shared.resync.store(true, Ordering::SeqCst);
    }

    fn unsubscribe(&mut self) {
        *lock(&self.shared.subscriber) = None;
    }
}

impl Drop for VlcHttpResource {
    fn drop(&mut self) {
        *lock(&self.shared.subscriber) = None;
        self.shared.stop.store(true, Ordering::Relaxed);
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        if let Some(poller) = self.poller.take() {
            let _ = poller.join();
        }
    }
}
