// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Fixed-interval polling of a provisioning resource.

use std::fmt::Display;
use std::future::Future;
use tokio::time::Duration;
use tracing::debug;

/// Terminal value of a poll together with how many times the resource was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub observations: u32,
}

impl<T> Polled<T> {
    /// Number of intervals waited before the terminal value was observed.
    pub const fn waits(&self) -> u32 {
        self.observations.saturating_sub(1)
    }
}

/// Queries `fetch` until `in_progress` returns false, sleeping `interval` between queries.
///
/// The first query is issued immediately. There is no attempt limit: a resource that stays
/// in progress forever keeps the caller waiting.
///
/// # Errors
///
/// Returns the first error produced by `fetch`.
pub async fn poll_until<T, E, F, Fut, P>(
    mut fetch: F,
    in_progress: P,
    interval: Duration,
) -> Result<Polled<T>, E>
where
    T: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut observations = 0u32;
    loop {
        let value = fetch().await?;
        observations = observations.saturating_add(1);

        if !in_progress(&value) {
            debug!(attempt = observations, state = %value, "Polling finished");
            return Ok(Polled { value, observations });
        }

        debug!(attempt = observations, state = %value, "Still in progress");
        println!("State: '{value}'. Let's wait a bit and poll again...");
        println!();
        tokio::time::sleep(interval).await;
    }
}
