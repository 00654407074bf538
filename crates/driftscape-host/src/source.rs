//! Synthetic pointer source standing in for the global mouse hook.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use driftscape_core::kurbo::{Point, Rect};
use driftscape_core::{EventSource, InputEvent, InputQueue};

/// Point on a figure-eight across `display` at `phase` turns.
pub fn sweep_point(display: Rect, phase: f64) -> Point {
    let center = display.center();
    let angle = phase * TAU;
    Point::new(
        center.x + angle.cos() * display.width() * 0.45,
        center.y + (angle * 2.0).sin() * display.height() * 0.45,
    )
}

/// Pushes pointer samples tracing a figure-eight from a background thread.
pub struct SweepPointerSource {
    queue: InputQueue,
    display: Rect,
    period: Duration,
    interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SweepPointerSource {
    pub fn new(queue: InputQueue, display: Rect, period: Duration, rate_hz: f64) -> Self {
        Self {
            queue,
            display,
            period,
            interval: Duration::from_secs_f64(1.0 / rate_hz.max(1.0)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl EventSource for SweepPointerSource {
    fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let queue = self.queue.clone();
        let running = Arc::clone(&self.running);
        let display = self.display;
        let period = self.period.as_secs_f64().max(f64::EPSILON);
        let interval = self.interval;
        self.worker = Some(std::thread::spawn(move || {
            let started = Instant::now();
            while running.load(Ordering::SeqCst) {
                let phase = started.elapsed().as_secs_f64() / period;
                queue.push(InputEvent::PointerSample(sweep_point(display, phase)));
                std::thread::sleep(interval);
            }
        }));
        tracing::debug!("[source] Pointer sweep started");
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            tracing::warn!("[source] Pointer sweep thread panicked");
        }
        tracing::debug!("[source] Pointer sweep stopped");
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for SweepPointerSource {
    fn drop(&mut self) {
        self.dispose();
    }
}
