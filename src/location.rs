//! Device location: permission, a throttled watch subscription, and its release.

use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::error::LocationError;
use crate::geo::{distance_m, LatLng};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Where raw fixes come from
pub trait LocationSource: Send + 'static {
    /// Ask for foreground access. Called once, before the watch starts.
    fn request_permission(&mut self) -> Permission;

    /// Latest raw fix, if the source has one right now
    fn next_fix(&mut self) -> Option<LatLng>;
}

impl<S: LocationSource + ?Sized> LocationSource for Box<S> {
    fn request_permission(&mut self) -> Permission {
        (**self).request_permission()
    }

    fn next_fix(&mut self) -> Option<LatLng> {
        (**self).next_fix()
    }
}

/// No provider configured: access is always denied
pub struct NoLocation;

impl LocationSource for NoLocation {
    fn request_permission(&mut self) -> Permission {
        Permission::Denied
    }

    fn next_fix(&mut self) -> Option<LatLng> {
        None
    }
}

/// Reports the same coordinate on every poll
pub struct FixedLocation {
    position: LatLng,
}

impl FixedLocation {
    pub fn new(position: LatLng) -> Self {
        Self { position }
    }
}

impl LocationSource for FixedLocation {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn next_fix(&mut self) -> Option<LatLng> {
        Some(self.position)
    }
}

/// Plays back a recorded track, one fix per poll, then goes quiet
pub struct ReplayLocation {
    fixes: Vec<LatLng>,
    next: usize,
}

impl ReplayLocation {
    pub fn new(fixes: Vec<LatLng>) -> Self {
        Self { fixes, next: 0 }
    }

    pub fn from_file(path: &Path) -> Result<Self, LocationError> {
        let text = fs::read_to_string(path).map_err(|source| LocationError::ReplayRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(parse_track(&text)?))
    }
}

impl LocationSource for ReplayLocation {
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn next_fix(&mut self) -> Option<LatLng> {
        let fix = self.fixes.get(self.next).copied();
        if fix.is_some() {
            self.next += 1;
        }
        fix
    }
}

/// Parse `lat,lon` lines. Blank lines and `#` comments are skipped.
pub fn parse_track(text: &str) -> Result<Vec<LatLng>, LocationError> {
    let mut fixes = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        fixes.push(parse_lat_lon(line).map_err(|reason| LocationError::ReplayParse {
            line: idx + 1,
            reason,
        })?);
    }
    Ok(fixes)
}

/// Parse a single `lat,lon` pair
pub fn parse_lat_lon(s: &str) -> Result<LatLng, String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `lat,lon`, got `{s}`"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("bad latitude `{}`", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("bad longitude `{}`", lon.trim()))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("coordinate out of range: {lat},{lon}"));
    }
    Ok(LatLng::new(lat, lon))
}

/// Delivery thresholds for the watch
#[derive(Clone, Copy, Debug)]
pub struct WatchOptions {
    pub min_interval: Duration,
    pub min_distance_m: f64,
    /// How often the source is polled
    pub poll: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            min_distance_m: 10.0,
            poll: Duration::from_secs(1),
        }
    }
}

/// Passes a fix when enough time has elapsed or the device moved far enough,
/// whichever happens first. The first fix always passes.
#[derive(Clone, Debug)]
pub struct LocationThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<(Instant, LatLng)>,
}

impl LocationThrottle {
    pub fn new(options: &WatchOptions) -> Self {
        Self {
            min_interval: options.min_interval,
            min_distance_m: options.min_distance_m,
            last: None,
        }
    }

    pub fn accept(&mut self, now: Instant, fix: LatLng) -> bool {
        let pass = match self.last {
            None => true,
            Some((at, prev)) => {
                now.saturating_duration_since(at) >= self.min_interval
                    || distance_m(prev, fix) >= self.min_distance_m
            }
        };
        if pass {
            self.last = Some((now, fix));
        }
        pass
    }
}

/// Live watch subscription. Released once, either by `cancel` or on drop.
pub struct WatchHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop the watch. Returns true only for the call that actually released it.
    pub fn cancel(&mut self) -> bool {
        let Some(stop) = self.stop.take() else {
            return false;
        };
        // Receiver may already be gone if the thread exited; dropping the sender also wakes it
        let _ = stop.send(());
        drop(stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("location watch released");
        true
    }

    pub fn is_active(&self) -> bool {
        self.stop.is_some()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Request permission, then start delivering throttled fixes to `sink` on a
/// background thread until the returned handle is cancelled or dropped.
pub fn watch_position<S, F>(
    mut source: S,
    options: WatchOptions,
    mut sink: F,
) -> Result<WatchHandle, LocationError>
where
    S: LocationSource,
    F: FnMut(LatLng) + Send + 'static,
{
    if source.request_permission() != Permission::Granted {
        info!("location permission denied");
        return Err(LocationError::PermissionDenied);
    }

    let (stop_tx, stop_rx) = bounded::<()>(1);
    let thread = thread::Builder::new()
        .name("location-watch".into())
        .spawn(move || {
            let mut throttle = LocationThrottle::new(&options);
            loop {
                if let Some(fix) = source.next_fix() {
                    if throttle.accept(Instant::now(), fix) {
                        sink(fix);
                    }
                }
                match stop_rx.recv_timeout(options.poll) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .map_err(LocationError::Spawn)?;

    info!(
        interval_secs = options.min_interval.as_secs(),
        distance_m = options.min_distance_m,
        "location watch started"
    );
    Ok(WatchHandle {
        stop: Some(stop_tx),
        thread: Some(thread),
    })
}
