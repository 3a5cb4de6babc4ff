//! Custom test assertions for pipeline runs

use pixfetch::{Event, RunId};
use std::time::Duration;
use tokio::sync::broadcast::Receiver;

/// Result of waiting for a run to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Image displayed with these dimensions
    Displayed(u32, u32),
    /// Fetch failed; the flag tells whether it timed out
    FetchFailed(String, bool),
    /// Fetched bytes could not be decoded
    DecodeFailed(String),
    /// Result dropped because a newer run claimed the target
    Superseded,
    /// Timeout waiting for an outcome
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for the terminal event of `run`
///
/// # Arguments
/// * `events` - Receiver subscribed before the run was started
/// * `run` - Run to wait for
/// * `timeout` - Maximum time to wait
pub async fn wait_for_outcome(
    events: &mut Receiver<Event>,
    run: RunId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Displayed {
                    run: r,
                    width,
                    height,
                    ..
                }) if r == run => return WaitResult::Displayed(width, height),
                Ok(Event::FetchFailed {
                    run: r,
                    error,
                    timed_out,
                    ..
                }) if r == run => return WaitResult::FetchFailed(error, timed_out),
                Ok(Event::DecodeFailed { run: r, error, .. }) if r == run => {
                    return WaitResult::DecodeFailed(error);
                }
                Ok(Event::Superseded { run: r, .. }) if r == run => {
                    return WaitResult::Superseded;
                }
                Ok(_) => {
                    // Other events, continue waiting
                    continue;
                }
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    match result {
        Ok(wait_result) => wait_result,
        Err(_) => WaitResult::Timeout,
    }
}

/// Collect every event up to and including the one `done` accepts
pub async fn collect_events_until(
    events: &mut Receiver<Event>,
    timeout: Duration,
    done: impl Fn(&Event) -> bool,
) -> Vec<Event> {
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let finished = done(&event);
            collected.push(event);
            if finished {
                break;
            }
        }
    })
    .await;
    collected
}
