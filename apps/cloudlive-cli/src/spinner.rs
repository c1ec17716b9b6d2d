// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::io::Write;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

fn draw(text: &str) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{text}");
    let _ = stderr.flush();
}

/// Transient progress indicator drawn on stderr while an API call is in flight.
pub struct Spinner {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Starts drawing `label` next to a rotating frame until [`Spinner::finish`] is called.
    pub fn start(label: String) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            let mut frame = 0usize;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        draw(&format!("\r{} {label}", FRAMES[frame % FRAMES.len()]));
                        frame = frame.wrapping_add(1);
                    }
                    () = cancelled.cancelled() => break,
                }
            }
            // Erase the spinner line
            draw("\r\x1b[2K");
        });

        Self { token, handle: Some(handle) }
    }

    /// A spinner that draws nothing (non-terminal stderr or progress disabled).
    pub fn disabled() -> Self {
        Self { token: CancellationToken::new(), handle: None }
    }

    /// Stops the spinner and waits until its line has been erased.
    pub async fn finish(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finish_stops_drawing_task() {
        let spinner = Spinner::start("calling GET http://127.0.0.1/api/v1/live_streams".to_string());
        tokio::time::sleep(Duration::from_millis(5)).await;
        let finished = tokio::time::timeout(Duration::from_secs(1), spinner.finish()).await;
        assert!(finished.is_ok(), "spinner task ignored cancellation");
    }

    #[tokio::test]
    async fn test_disabled_spinner_finishes_immediately() {
        Spinner::disabled().finish().await;
    }
}
