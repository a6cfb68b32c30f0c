/*
 * progress.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Cassetta, a cross-platform email client.
 *
 * Cassetta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Cassetta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Cassetta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Transfer progress driver. Polls the session byte counter against an
//! expected size and reports percentages to a callback; completion is
//! reported exactly once, and a watch never outlives the hard ceiling even
//! if the transfer stalls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hard ceiling on a single watch. A transfer still unfinished after this
/// long is treated as complete so the UI never shows a stuck bar.
const WATCH_CEILING: Duration = Duration::from_secs(300);

/// Completion percentage, clamped to 100. An unknown or zero expected size
/// reports complete immediately.
pub fn percentage(current: u64, expected: u64) -> u8 {
    if expected == 0 {
        return 100;
    }
    std::cmp::min(100, current * 100 / expected) as u8
}

/// Watch `counter` until `expected` bytes have accumulated past its starting
/// value, reporting each distinct percentage to `report`. 100 is reported
/// exactly once, at completion or when the ceiling expires.
pub async fn watch<F>(counter: Arc<AtomicU64>, expected: u64, mut report: F)
where
    F: FnMut(u8),
{
    let baseline = counter.load(Ordering::Relaxed);
    let deadline = Instant::now() + WATCH_CEILING;
    let mut last: Option<u8> = None;
    loop {
        let current = counter.load(Ordering::Relaxed).saturating_sub(baseline);
        let pct = percentage(current, expected);
        if last != Some(pct) {
            report(pct);
            last = Some(pct);
        }
        if pct >= 100 {
            return;
        }
        if Instant::now() >= deadline {
            log::warn!("transfer watch expired at {}%", pct);
            report(100);
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_clamps_at_100() {
        assert_eq!(percentage(0, 200), 0);
        assert_eq!(percentage(100, 200), 50);
        assert_eq!(percentage(200, 200), 100);
        assert_eq!(percentage(5000, 200), 100);
    }

    #[test]
    fn zero_expected_is_complete() {
        assert_eq!(percentage(0, 0), 100);
        assert_eq!(percentage(42, 0), 100);
    }

    #[tokio::test]
    async fn completed_transfer_reports_100_once() {
        let counter = Arc::new(AtomicU64::new(500));
        counter.fetch_add(80, Ordering::Relaxed);
        let mut reports = Vec::new();
        watch(counter, 80, |pct| reports.push(pct)).await;
        assert_eq!(reports, [100]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_reported_as_bytes_arrive() {
        let counter = Arc::new(AtomicU64::new(0));
        let writer = counter.clone();
        let handle = tokio::spawn(async move {
            let mut reports = Vec::new();
            watch(counter, 100, |pct| reports.push(pct)).await;
            reports
        });
        tokio::time::sleep(Duration::from_millis(150)).await;
        writer.fetch_add(50, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(150)).await;
        writer.fetch_add(50, Ordering::Relaxed);
        let reports = handle.await.unwrap();
        assert_eq!(reports.first(), Some(&0));
        assert!(reports.contains(&50));
        assert_eq!(reports.last(), Some(&100));
        assert_eq!(reports.iter().filter(|&&p| p == 100).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_transfer_completes_at_ceiling() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut reports = Vec::new();
        watch(counter, 1000, |pct| reports.push(pct)).await;
        assert_eq!(reports.last(), Some(&100));
        assert_eq!(reports.iter().filter(|&&p| p == 100).count(), 1);
    }
}
