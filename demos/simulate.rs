//! Drive the poll loop against the simulated SDK and print what the host
//! would receive.
//!
//! Usage: cargo run --example simulate
//! Set RUST_LOG=debug for session logs.

use gazesync::controller::DEVICE_NAME;
use gazesync::detection::DRIVER_NAME;
use gazesync::sim::{SimFeed, SimulatedSdk};
use gazesync::types::{BlinkReport, GazeReport, WearableData, WearableEye};
use gazesync::{Config, DetectionGate, DeviceSession, HostRegistry, ReportSink, TrackerController};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Session = DeviceSession<SimulatedSdk>;

struct Host {
    devices: Vec<TrackerController<Session>>,
}

impl HostRegistry<Session> for Host {
    fn adopt(&mut self, controller: TrackerController<Session>) {
        println!("{} driver registered {}", DRIVER_NAME, DEVICE_NAME);
        self.devices.push(controller);
    }
}

#[derive(Default)]
struct Printer {
    reports: u64,
}

impl ReportSink for Printer {
    fn send_descriptor(&mut self, descriptor: &str) {
        println!("Descriptor: {} bytes", descriptor.len());
    }

    fn report_gaze(&mut self, r: GazeReport) {
        self.reports += 1;
        // Print every ~60th report to avoid flooding the terminal
        if self.reports % 60 == 1 {
            println!(
                "{:?} t={}.{:06}  pos=[{:.3}, {:.3}]  dir=[{:+.3}, {:+.3}, {:+.3}]  origin=[{:+.1}, {:+.1}, {:+.1}]",
                r.channel,
                r.timestamp.seconds, r.timestamp.microseconds,
                r.position[0], r.position[1],
                r.direction[0], r.direction[1], r.direction[2],
                r.origin[0], r.origin[1], r.origin[2],
            );
        }
    }

    fn report_blink(&mut self, r: BlinkReport) {
        println!("blink -> {}", r.blinking);
    }
}

/// Stand-in for the vendor streaming thread: ~120 Hz of slowly circling
/// gaze with a blink every two seconds.
fn spawn_producer(feed: SimFeed, stop: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let start = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            let t = start.elapsed().as_secs_f32();
            let openness = if t % 2.0 < 0.15 { 0.02 } else { 0.5 };
            let (sx, sy) = (t.sin(), t.cos());
            let eye = |ox: f32| {
                WearableEye::valid(
                    [ox, 0.0, 30.0],
                    [0.2 * sx, 0.2 * sy, -1.0],
                    openness,
                    [0.5 + 0.3 * sx, 0.5 + 0.3 * sy],
                )
            };
            feed.push(WearableData {
                timestamp_us: start.elapsed().as_micros() as i64,
                left: eye(-32.0),
                right: eye(32.0),
            });
            std::thread::sleep(Duration::from_millis(8));
        }
    })
}

fn main() {
    env_logger::init();

    let sdk = SimulatedSdk::new();
    let feed = sdk.control().feed();
    let config = Config::from_env();
    let slot = Arc::new(Mutex::new(Some(sdk)));

    let mut gate = DetectionGate::new(move || {
        let slot = slot.clone();
        let config = config.clone();
        TrackerController::new(move || {
            let sdk = slot
                .lock()
                .ok()
                .and_then(|mut s| s.take())
                .unwrap_or_default();
            DeviceSession::new(sdk, config.clone())
        })
    });

    let mut host = Host {
        devices: Vec::new(),
    };
    if let Err(e) = gate.try_detect(&mut host) {
        eprintln!("Detection failed: {}", e);
        std::process::exit(1);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let producer = spawn_producer(feed, stop.clone());

    let mut sink = Printer::default();
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        for device in host.devices.iter_mut() {
            device.update(&mut sink);
        }
    }

    stop.store(true, Ordering::Relaxed);
    let _ = producer.join();
    println!("\nTotal: {} gaze reports in {:.1}s", sink.reports, start.elapsed().as_secs_f64());
}
