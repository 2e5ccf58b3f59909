//! One-shot background fetches. Results come back to the UI thread over a
//! channel; nothing here touches screen state.

use std::io;
use std::thread;

use crossbeam_channel::Sender;
use tracing::error;

use crate::api::{BackendClient, Profile};
use crate::error::ApiError;
use crate::geo::{LatLng, Point};
use crate::session::ProfileRequest;

/// Work finished off the UI thread
#[derive(Debug)]
pub enum Completion {
    Markers(Result<Vec<Point>, ApiError>),
    Profile {
        seq: u64,
        result: Result<Profile, ApiError>,
    },
    Location(LatLng),
}

/// Which fetch a worker thread runs
#[derive(Clone, Copy, Debug)]
enum Job {
    Markers,
    Profile(u64),
}

impl Job {
    fn thread_name(self) -> &'static str {
        match self {
            Job::Markers => "fetch-markers",
            Job::Profile(_) => "fetch-profile",
        }
    }

    /// Completion reported when the worker never started
    fn failed(self, err: io::Error) -> Completion {
        let err = ApiError::Spawn(err);
        match self {
            Job::Markers => Completion::Markers(Err(err)),
            Job::Profile(seq) => Completion::Profile {
                seq,
                result: Err(err),
            },
        }
    }
}

/// Run `work` on a named thread. Every job reports back exactly once, so a
/// spawn failure is sent as a failed completion.
fn spawn_job<F>(job: Job, tx: Sender<Completion>, work: F)
where
    F: FnOnce(Sender<Completion>) + Send + 'static,
{
    let fallback = tx.clone();
    let spawned = thread::Builder::new()
        .name(job.thread_name().to_string())
        .spawn(move || work(tx));
    if let Err(e) = spawned {
        error!(thread = job.thread_name(), error = %e, "failed to spawn worker");
        let _ = fallback.send(job.failed(e));
    }
}

/// Fetch the marker set once. No retry.
pub fn spawn_marker_fetch(client: BackendClient, tx: Sender<Completion>) {
    spawn_job(Job::Markers, tx, move |tx| {
        let result = client.fetch_markers();
        // Receiver gone means the screen already closed
        let _ = tx.send(Completion::Markers(result));
    });
}

/// Fetch one profile, tagged with the request's sequence number
pub fn spawn_profile_fetch(client: BackendClient, request: ProfileRequest, tx: Sender<Completion>) {
    spawn_job(Job::Profile(request.seq), tx, move |tx| {
        let result = client.fetch_profile(&request.key);
        let _ = tx.send(Completion::Profile {
            seq: request.seq,
            result,
        });
    });
}
