//! State Controller
//!
//! One tick reads the hardware, decides the next state and fires the side effects of
//! entering it. Entry actions live in the `enter_*` functions; per-tick logic lives in
//! the `on_*` functions, one per state, selected by an exhaustive match.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::state::{DestinationSide, SourceSide, State, TransferPlan};
use crate::classify::{classify_destination, classify_source, DestinationClass};
use crate::config::ControllerConfig;
use crate::feedback::{Cue, Feedback, Led};
use crate::probe::{HardwareProbe, MountedDrive, UsbPort};
use crate::transfer::Transfer;

/// Hardware the controller drives, owned by the process's top-level scope
#[derive(Clone)]
pub struct Hardware {
    pub probe: Arc<dyn HardwareProbe>,
    pub feedback: Feedback,
    pub transfer: Arc<dyn Transfer>,
}

/// Whether entering a state should play its cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announce {
    Audible,
    Silent,
}

/// Finite-state controller of the appliance
pub struct Controller {
    state: State,
    tick: Duration,
    done_repeat: Duration,
    /// Level applied to blinking LEDs after the next tick
    blink_on: bool,
}

impl Controller {
    /// Create a controller; the real starting state is decided by [`Controller::start`]
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            state: State::Filled,
            tick: config.tick(),
            done_repeat: config.done_repeat(),
            blink_on: false,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Rebuild state from live hardware
    ///
    /// Enters `Filled` silently and evaluates one tick, which unmounts drives left over
    /// from a previous run or moves on to `Empty` when nothing is attached. If the
    /// appliance is still occupied afterwards, `Filled` is announced.
    pub async fn start(&mut self, hw: &Hardware) {
        info!("Inspecting hardware left from a previous run");
        self.state = enter_filled(hw, Announce::Silent);
        self.tick(hw).await;
        if self.state == State::Filled {
            self.state = enter_filled(hw, Announce::Audible);
        }
    }

    /// Run one control step
    pub async fn tick(&mut self, hw: &Hardware) {
        let tick = self.tick;
        let done_repeat = self.done_repeat;

        let next = match &mut self.state {
            State::Empty => on_empty(hw),
            State::SourceConnected { source } => on_source_connected(hw, source),
            State::BothConnected { plan } => on_both_connected(hw, plan),
            State::Problem => Some(enter_filled(hw, Announce::Audible)),
            State::Processing { plan } => Some(on_processing(hw, plan, done_repeat).await),
            State::Done { elapsed, threshold } => on_done(hw, elapsed, *threshold, tick),
            State::Filled => on_filled(hw).await,
        };

        if let Some(next) = next {
            info!(from = %self.state, to = %next, "State transition");
            self.state = next;
        }
    }

    /// Apply the blink level to the active state's blinking LEDs and flip it
    pub fn blink(&mut self, hw: &Hardware) {
        for &led in self.state.blink_leds() {
            hw.feedback.set_led(led, self.blink_on);
        }
        self.blink_on = !self.blink_on;
    }

    /// Start up and run the control loop until `shutdown` resolves
    ///
    /// Shutdown is only observed between ticks; a transfer in progress is finished first.
    pub async fn run<F>(&mut self, hw: &Hardware, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.start(hw).await;
        info!("Control loop running, tick {:?}", self.tick);

        loop {
            self.tick(hw).await;
            self.blink(hw);

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.tick) => {}
            }
        }

        hw.feedback.reset_leds(None);
        info!("Control loop stopped in state {}", self.state);
    }
}

// ---------------------------------------------------------------------------
// Entry actions

fn enter_empty(hw: &Hardware) -> State {
    hw.feedback.reset_leds(None);
    hw.feedback.play_cue(Cue::GreetSource);
    State::Empty
}

fn enter_source_connected(hw: &Hardware, source: SourceSide) -> State {
    hw.feedback.play_cue(Cue::GreetDestination);
    State::SourceConnected { source }
}

fn enter_both_connected(hw: &Hardware, plan: TransferPlan) -> State {
    hw.feedback.play_cue(Cue::AwaitButton);
    State::BothConnected { plan }
}

fn enter_problem(hw: &Hardware) -> State {
    hw.feedback.play_cue(Cue::Problem);
    State::Problem
}

fn enter_processing(hw: &Hardware, plan: TransferPlan) -> State {
    hw.feedback.play_cue(Cue::Busy);
    State::Processing { plan }
}

fn enter_done(hw: &Hardware, threshold: Duration) -> State {
    hw.feedback.play_cue(Cue::Complete);
    State::Done {
        elapsed: Duration::ZERO,
        threshold,
    }
}

fn enter_filled(hw: &Hardware, announce: Announce) -> State {
    hw.feedback.reset_leds(None);
    if announce == Announce::Audible {
        hw.feedback.play_cue(Cue::Eject);
    }
    State::Filled
}

// ---------------------------------------------------------------------------
// Per-tick logic

fn on_empty(hw: &Hardware) -> Option<State> {
    let ports = hw.probe.monitored_ports();

    if ports.contains(&UsbPort::Source) {
        debug!("Source USB device attached");
        hw.feedback.set_led(Led::Source, true);

        let mounted = hw.probe.mounted_drives();
        debug!(mounted = ?mounted, "Mounted drives");
        if let [drive] = mounted.as_slice() {
            info!("Source drive mounted: {}", drive);
            let next = match classify_source(&drive.mount_path).media_kind() {
                Some(kind) => enter_source_connected(
                    hw,
                    SourceSide {
                        device: drive.device.clone(),
                        mount_path: drive.mount_path.clone(),
                        kind,
                    },
                ),
                None => enter_problem(hw),
            };
            return Some(next);
        }
    } else if ports.contains(&UsbPort::Destination) {
        debug!("Wrong order: destination drive attached before the source device");
        hw.feedback.reset_leds(None);
        if hw.probe.mounted_drives().len() == 1 {
            warn!("Destination drive mounted before the source device");
            return Some(enter_problem(hw));
        }
    }

    None
}

fn on_source_connected(hw: &Hardware, source: &SourceSide) -> Option<State> {
    let ports = hw.probe.monitored_ports();

    if ports.contains(&UsbPort::Destination) {
        debug!("Destination USB device attached");
        hw.feedback.set_led(Led::Destination, true);

        let mounted = hw.probe.mounted_drives();
        debug!(mounted = ?mounted, "Mounted drives");
        if mounted.len() != 2 {
            return None;
        }

        // Two ports, two drives: the one that is not the source is the destination
        let others: Vec<&MountedDrive> = mounted
            .iter()
            .filter(|d| d.mount_path != source.mount_path)
            .collect();
        let [drive] = others.as_slice() else {
            warn!(
                source = %source.mount_path.display(),
                mounted = ?mounted,
                "Cannot tell the destination drive apart from the source drive"
            );
            return None;
        };

        info!("Destination drive mounted: {}", drive);
        let next = match classify_destination(&drive.mount_path) {
            DestinationClass::Known => enter_both_connected(
                hw,
                TransferPlan {
                    source: source.clone(),
                    destination: DestinationSide {
                        device: drive.device.clone(),
                        mount_path: drive.mount_path.clone(),
                    },
                },
            ),
            DestinationClass::Unrecognized => enter_problem(hw),
        };
        return Some(next);
    }

    if !ports.contains(&UsbPort::Source) {
        info!("Source device removed while waiting for the destination drive");
        hw.feedback.reset_leds(None);
        return Some(enter_empty(hw));
    }

    None
}

fn on_both_connected(hw: &Hardware, plan: &TransferPlan) -> Option<State> {
    let ports = hw.probe.monitored_ports();

    if ports.contains(&UsbPort::Source) && ports.contains(&UsbPort::Destination) {
        debug!("Both devices ready, waiting for the button");
        hw.feedback.set_led(Led::Button, true);
        if hw.feedback.button_pressed() {
            info!("Button pressed");
            return Some(enter_processing(hw, plan.clone()));
        }
        return None;
    }

    warn!(attached = ?ports, "A device was disconnected before the transfer");
    hw.feedback
        .reset_leds(Some(&[Led::Destination, Led::Button][..]));
    Some(enter_source_connected(hw, plan.source.clone()))
}

async fn on_processing(hw: &Hardware, plan: &TransferPlan, done_repeat: Duration) -> State {
    let copied = hw
        .transfer
        .copy(
            &plan.source.mount_path,
            plan.source_subpath(),
            &plan.destination.mount_path,
            plan.destination_subpath(),
        )
        .await;

    let source_unmounted = hw.transfer.unmount(&plan.source.device).await;
    let destination_unmounted = hw.transfer.unmount(&plan.destination.device).await;

    if copied && source_unmounted && destination_unmounted {
        info!(kind = %plan.source.kind, "Transfer complete");
    } else {
        warn!(
            copied,
            source_unmounted, destination_unmounted, "Transfer finished with errors"
        );
    }

    enter_done(hw, done_repeat)
}

fn on_done(
    hw: &Hardware,
    elapsed: &mut Duration,
    threshold: Duration,
    tick: Duration,
) -> Option<State> {
    if hw.feedback.button_pressed() {
        info!("Button pressed, session finished");
        return Some(enter_filled(hw, Announce::Audible));
    }

    if *elapsed > threshold {
        hw.feedback.play_cue(Cue::Complete);
        *elapsed = Duration::ZERO;
    } else {
        *elapsed += tick;
    }
    None
}

async fn on_filled(hw: &Hardware) -> Option<State> {
    let ports = hw.probe.monitored_ports();
    let mounted = hw.probe.mounted_drives();

    if ports.is_empty() && mounted.is_empty() {
        info!("All devices removed");
        return Some(enter_empty(hw));
    }

    for drive in &mounted {
        debug!("Unmounting leftover drive {}", drive);
        hw.transfer.unmount(&drive.device).await;
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::classify::MediaKind;
    use crate::config::ControllerConfig;
    use crate::error::Result;
    use crate::feedback::{Cue, CuePlayer, Feedback, Led, Panel};
    use crate::probe::{HardwareProbe, MountedDrive, UsbPort};
    use crate::transfer::Transfer;

    use UsbPort::{Destination, Source};

    #[derive(Default)]
    struct FakeProbe {
        ports: Mutex<BTreeSet<UsbPort>>,
        drives: Mutex<Vec<MountedDrive>>,
    }

    impl FakeProbe {
        fn set(&self, ports: &[UsbPort], drives: &[&MountedDrive]) {
            *self.ports.lock().unwrap() = ports.iter().copied().collect();
            *self.drives.lock().unwrap() = drives.iter().map(|d| (*d).clone()).collect();
        }
    }

    impl HardwareProbe for FakeProbe {
        fn monitored_ports(&self) -> BTreeSet<UsbPort> {
            self.ports.lock().unwrap().clone()
        }

        fn mounted_drives(&self) -> Vec<MountedDrive> {
            self.drives.lock().unwrap().clone()
        }
    }

    #[derive(Default)]
    struct FakePanel {
        leds: Mutex<BTreeMap<Led, bool>>,
        pressed: AtomicBool,
    }

    impl FakePanel {
        fn level(&self, led: Led) -> Option<bool> {
            self.leds.lock().unwrap().get(&led).copied()
        }

        fn press(&self, pressed: bool) {
            self.pressed.store(pressed, Ordering::SeqCst);
        }
    }

    impl Panel for FakePanel {
        fn set_led(&self, led: Led, on: bool) -> Result<()> {
            self.leds.lock().unwrap().insert(led, on);
            Ok(())
        }

        fn button_pressed(&self) -> Result<bool> {
            Ok(self.pressed.load(Ordering::SeqCst))
        }
    }

    #[derive(Default)]
    struct FakeCues {
        played: Mutex<Vec<Cue>>,
    }

    impl FakeCues {
        fn take(&self) -> Vec<Cue> {
            std::mem::take(&mut *self.played.lock().unwrap())
        }
    }

    impl CuePlayer for FakeCues {
        fn play(&self, cue: Cue) -> Result<()> {
            self.played.lock().unwrap().push(cue);
            Ok(())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Copy {
            source: PathBuf,
            source_subpath: String,
            destination: PathBuf,
            destination_subpath: String,
        },
        Unmount(String),
    }

    #[derive(Default)]
    struct FakeTransfer {
        calls: Mutex<Vec<Call>>,
        failing: AtomicBool,
    }

    impl FakeTransfer {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    #[async_trait]
    impl Transfer for FakeTransfer {
        async fn copy(
            &self,
            source_mount: &Path,
            source_subpath: &str,
            dest_mount: &Path,
            dest_subpath: &str,
        ) -> bool {
            self.calls.lock().unwrap().push(Call::Copy {
                source: source_mount.to_path_buf(),
                source_subpath: source_subpath.to_string(),
                destination: dest_mount.to_path_buf(),
                destination_subpath: dest_subpath.to_string(),
            });
            !self.failing.load(Ordering::SeqCst)
        }

        async fn unmount(&self, device: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Unmount(device.to_string()));
            !self.failing.load(Ordering::SeqCst)
        }
    }

    /// Controller wired to fakes, with a phone drive and a backup drive on disk
    struct Rig {
        probe: Arc<FakeProbe>,
        panel: Arc<FakePanel>,
        cues: Arc<FakeCues>,
        transfer: Arc<FakeTransfer>,
        hw: Hardware,
        controller: Controller,
        source: MountedDrive,
        destination: MountedDrive,
        _dirs: (TempDir, TempDir),
    }

    fn drive_with(dirs: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for d in dirs {
            std::fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        dir
    }

    impl Rig {
        fn with_source_layout(source_dirs: &[&str]) -> Self {
            let source_dir = drive_with(source_dirs);
            let destination_dir = drive_with(&["fotky", "videa", "originaly/telefon"]);

            let probe = Arc::new(FakeProbe::default());
            let panel = Arc::new(FakePanel::default());
            let cues = Arc::new(FakeCues::default());
            let transfer = Arc::new(FakeTransfer::default());

            let hw = Hardware {
                probe: probe.clone(),
                feedback: Feedback::new(panel.clone(), cues.clone()),
                transfer: transfer.clone(),
            };
            let controller = Controller::new(&ControllerConfig {
                tick_ms: 300,
                done_repeat_secs: 1,
            });

            Self {
                probe,
                panel,
                cues,
                transfer,
                hw,
                controller,
                source: MountedDrive::new("/dev/sda1", source_dir.path()),
                destination: MountedDrive::new("/dev/sdb1", destination_dir.path()),
                _dirs: (source_dir, destination_dir),
            }
        }

        fn phone() -> Self {
            let rig = Self::with_source_layout(&["DCIM/Camera", "Android"]);
            std::fs::write(rig.source.mount_path.join("DCIM/Camera/img.jpg"), b"jpeg").unwrap();
            rig
        }

        async fn tick(&mut self) -> &State {
            self.controller.tick(&self.hw).await;
            self.controller.state()
        }

        /// Start with nothing attached and forget the greeting
        async fn started(mut self) -> Self {
            self.probe.set(&[], &[]);
            self.controller.start(&self.hw).await;
            assert_eq!(*self.controller.state(), State::Empty);
            self.cues.take();
            self
        }

        async fn source_connected(mut self) -> Self {
            self = self.started().await;
            let source = self.source.clone();
            self.probe.set(&[Source], &[&source]);
            self.tick().await;
            assert!(matches!(self.controller.state(), State::SourceConnected { .. }));
            self.cues.take();
            self
        }

        async fn both_connected(mut self) -> Self {
            self = self.source_connected().await;
            let (source, destination) = (self.source.clone(), self.destination.clone());
            self.probe.set(&[Source, Destination], &[&source, &destination]);
            self.tick().await;
            assert!(matches!(self.controller.state(), State::BothConnected { .. }));
            self.cues.take();
            self
        }

        async fn done(mut self) -> Self {
            self = self.both_connected().await;
            self.panel.press(true);
            self.tick().await;
            self.panel.press(false);
            self.tick().await;
            assert!(matches!(self.controller.state(), State::Done { .. }));
            self.cues.take();
            self.transfer.take();
            self
        }
    }

    // ---------------------------------------------------------------------------
    // Startup

    #[tokio::test]
    async fn test_startup_with_nothing_attached_greets() {
        let mut rig = Rig::phone();
        rig.controller.start(&rig.hw).await;

        assert_eq!(*rig.controller.state(), State::Empty);
        assert_eq!(rig.cues.take(), vec![Cue::GreetSource]);
        assert!(rig.transfer.take().is_empty());
    }

    #[tokio::test]
    async fn test_startup_drains_leftover_mounts_and_announces_eject() {
        let mut rig = Rig::phone();
        let stale = rig.source.clone();
        rig.probe.set(&[], &[&stale]);

        rig.controller.start(&rig.hw).await;

        assert_eq!(*rig.controller.state(), State::Filled);
        assert_eq!(rig.transfer.take(), vec![Call::Unmount("/dev/sda1".into())]);
        assert_eq!(rig.cues.take(), vec![Cue::Eject]);
        assert_eq!(rig.panel.level(Led::Button), Some(false));
    }

    // ---------------------------------------------------------------------------
    // Empty

    #[tokio::test]
    async fn test_phone_source_is_recognized() {
        let mut rig = Rig::phone().started().await;
        let source = rig.source.clone();
        rig.probe.set(&[Source], &[&source]);

        let state = rig.tick().await.clone();

        let State::SourceConnected { source: side } = &state else {
            panic!("expected source-connected, got {}", state);
        };
        assert_eq!(side.kind, MediaKind::Phone);
        assert_eq!(side.kind.source_subpath(), "DCIM/Camera");
        assert_eq!(side.device, "/dev/sda1");
        assert_eq!(side.mount_path, source.mount_path);
        assert_eq!(rig.cues.take(), vec![Cue::GreetDestination]);
        assert_eq!(rig.panel.level(Led::Source), Some(true));
    }

    #[tokio::test]
    async fn test_camera_source_is_recognized() {
        let mut rig = Rig::with_source_layout(&["DCIM/119___06"]).started().await;
        let source = rig.source.clone();
        rig.probe.set(&[Source], &[&source]);

        rig.tick().await;

        let side = rig.controller.state().source().unwrap();
        assert_eq!(side.kind, MediaKind::Camera);
    }

    #[tokio::test]
    async fn test_source_waits_for_its_mount() {
        let mut rig = Rig::phone().started().await;
        rig.probe.set(&[Source], &[]);

        assert_eq!(*rig.tick().await, State::Empty);
        assert_eq!(rig.panel.level(Led::Source), Some(true));
        assert!(rig.cues.take().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_source_is_a_problem() {
        let mut rig = Rig::with_source_layout(&["Documents"]).started().await;
        let source = rig.source.clone();
        rig.probe.set(&[Source], &[&source]);

        assert_eq!(*rig.tick().await, State::Problem);
        assert_eq!(rig.cues.take(), vec![Cue::Problem]);
    }

    #[tokio::test]
    async fn test_destination_first_is_a_problem() {
        let mut rig = Rig::phone().started().await;
        let destination = rig.destination.clone();

        rig.probe.set(&[Destination], &[]);
        for _ in 0..3 {
            assert_eq!(*rig.tick().await, State::Empty);
            assert_eq!(rig.panel.level(Led::Source), Some(false));
        }
        assert!(rig.cues.take().is_empty());

        rig.probe.set(&[Destination], &[&destination]);
        assert_eq!(*rig.tick().await, State::Problem);
        assert_eq!(rig.cues.take(), vec![Cue::Problem]);
    }

    #[tokio::test]
    async fn test_two_drives_at_once_do_not_skip_source_recognition() {
        let mut rig = Rig::phone().started().await;
        let (source, destination) = (rig.source.clone(), rig.destination.clone());
        rig.probe.set(&[Source, Destination], &[&source, &destination]);

        for _ in 0..3 {
            assert_eq!(*rig.tick().await, State::Empty);
        }
    }

    // ---------------------------------------------------------------------------
    // SourceConnected

    #[tokio::test]
    async fn test_destination_is_the_drive_that_is_not_the_source() {
        let mut rig = Rig::phone().source_connected().await;
        let (source, destination) = (rig.source.clone(), rig.destination.clone());
        // Mount table order does not matter
        rig.probe.set(&[Source, Destination], &[&destination, &source]);

        rig.tick().await;

        let plan = rig.controller.state().plan().unwrap().clone();
        assert!(matches!(rig.controller.state(), State::BothConnected { .. }));
        assert_eq!(plan.source.device, "/dev/sda1");
        assert_eq!(plan.destination.device, "/dev/sdb1");
        assert_eq!(plan.destination.mount_path, destination.mount_path);
        assert_eq!(plan.destination_subpath(), "originaly/telefon");
        assert_eq!(rig.cues.take(), vec![Cue::AwaitButton]);
        assert_eq!(rig.panel.level(Led::Destination), Some(true));
    }

    #[tokio::test]
    async fn test_unrecognized_destination_is_a_problem() {
        let mut rig = Rig::phone().source_connected().await;
        let source = rig.source.clone();
        let stranger_dir = drive_with(&["fotky", "Music"]);
        let stranger = MountedDrive::new("/dev/sdb1", stranger_dir.path());
        rig.probe.set(&[Source, Destination], &[&source, &stranger]);

        assert_eq!(*rig.tick().await, State::Problem);
        assert_eq!(rig.cues.take(), vec![Cue::Problem]);
    }

    #[tokio::test]
    async fn test_source_connected_waits_for_exactly_two_drives() {
        let mut rig = Rig::phone().source_connected().await;
        let (source, destination) = (rig.source.clone(), rig.destination.clone());
        let extra = MountedDrive::new("/dev/sdc1", "/media/usb2");

        rig.probe.set(&[Source, Destination], &[&source]);
        assert!(matches!(rig.tick().await, State::SourceConnected { .. }));

        rig.probe
            .set(&[Source, Destination], &[&source, &destination, &extra]);
        assert!(matches!(rig.tick().await, State::SourceConnected { .. }));

        // Two entries, neither distinguishable from the source
        rig.probe.set(&[Source, Destination], &[&source, &source]);
        assert!(matches!(rig.tick().await, State::SourceConnected { .. }));
        assert!(rig.cues.take().is_empty());
    }

    #[tokio::test]
    async fn test_source_removed_returns_to_empty() {
        let mut rig = Rig::phone().source_connected().await;
        rig.probe.set(&[], &[]);

        assert_eq!(*rig.tick().await, State::Empty);
        assert_eq!(rig.cues.take(), vec![Cue::GreetSource]);
        assert!(rig.controller.state().source().is_none());
    }

    // ---------------------------------------------------------------------------
    // BothConnected and Processing

    #[tokio::test]
    async fn test_button_starts_processing_on_the_sixth_tick() {
        let mut rig = Rig::phone().both_connected().await;

        for _ in 0..5 {
            assert!(matches!(rig.tick().await, State::BothConnected { .. }));
            assert_eq!(rig.panel.level(Led::Button), Some(true));
        }

        rig.panel.press(true);
        let state = rig.tick().await.clone();

        let State::Processing { plan } = &state else {
            panic!("expected processing, got {}", state);
        };
        assert_eq!(plan.source.device, "/dev/sda1");
        assert_eq!(plan.source_subpath(), "DCIM/Camera");
        assert_eq!(plan.destination.device, "/dev/sdb1");
        assert_eq!(plan.destination_subpath(), "originaly/telefon");
        assert_eq!(rig.cues.take(), vec![Cue::Busy]);
        assert!(rig.transfer.take().is_empty());
    }

    #[tokio::test]
    async fn test_device_removed_before_button_falls_back() {
        let mut rig = Rig::phone().both_connected().await;
        let source = rig.source.clone();
        rig.probe.set(&[Source], &[&source]);

        let state = rig.tick().await.clone();

        let State::SourceConnected { source: side } = &state else {
            panic!("expected source-connected, got {}", state);
        };
        assert_eq!(side.device, "/dev/sda1");
        assert_eq!(rig.panel.level(Led::Destination), Some(false));
        assert_eq!(rig.panel.level(Led::Button), Some(false));
        assert_eq!(rig.cues.take(), vec![Cue::GreetDestination]);
    }

    #[tokio::test]
    async fn test_processing_copies_then_unmounts_both() {
        let mut rig = Rig::phone().both_connected().await;
        rig.panel.press(true);
        rig.tick().await;
        rig.cues.take();

        let state = rig.tick().await.clone();

        assert!(matches!(state, State::Done { .. }));
        assert_eq!(
            rig.transfer.take(),
            vec![
                Call::Copy {
                    source: rig.source.mount_path.clone(),
                    source_subpath: "DCIM/Camera".into(),
                    destination: rig.destination.mount_path.clone(),
                    destination_subpath: "originaly/telefon".into(),
                },
                Call::Unmount("/dev/sda1".into()),
                Call::Unmount("/dev/sdb1".into()),
            ]
        );
        assert_eq!(rig.cues.take(), vec![Cue::Complete]);
    }

    #[tokio::test]
    async fn test_failed_transfer_still_reaches_done() {
        let mut rig = Rig::phone().both_connected().await;
        rig.transfer.failing.store(true, Ordering::SeqCst);
        rig.panel.press(true);
        rig.tick().await;

        assert!(matches!(rig.tick().await, State::Done { .. }));
        // Unmount is attempted even though the copy failed
        assert_eq!(rig.transfer.take().len(), 3);
    }

    // ---------------------------------------------------------------------------
    // Problem, Done, Filled

    #[tokio::test]
    async fn test_problem_always_moves_to_filled() {
        let mut rig = Rig::with_source_layout(&[]).started().await;
        let (source, destination) = (rig.source.clone(), rig.destination.clone());
        rig.probe.set(&[Source], &[&source]);
        assert_eq!(*rig.tick().await, State::Problem);
        rig.cues.take();

        rig.probe.set(&[Source, Destination], &[&source, &destination]);
        rig.panel.press(true);
        assert_eq!(*rig.tick().await, State::Filled);
        assert_eq!(rig.cues.take(), vec![Cue::Eject]);
    }

    #[tokio::test]
    async fn test_done_repeats_completion_cue_periodically() {
        let mut rig = Rig::phone().done().await;

        // threshold 1s, tick 300ms: counter 0.3, 0.6, 0.9, 1.2, then replay
        let mut replayed_on = Vec::new();
        for tick in 1..=20 {
            rig.tick().await;
            if rig.cues.take() == vec![Cue::Complete] {
                replayed_on.push(tick);
            }
        }

        assert_eq!(replayed_on, vec![5, 10, 15, 20]);
        assert!(matches!(rig.controller.state(), State::Done { .. }));
    }

    #[tokio::test]
    async fn test_button_in_done_ends_session() {
        let mut rig = Rig::phone().done().await;
        rig.panel.press(true);

        assert_eq!(*rig.tick().await, State::Filled);
        assert_eq!(rig.cues.take(), vec![Cue::Eject]);
        assert_eq!(rig.panel.level(Led::Source), Some(false));
    }

    #[tokio::test]
    async fn test_filled_clears_only_when_everything_is_gone() {
        let mut rig = Rig::phone().done().await;
        rig.panel.press(true);
        rig.tick().await;
        rig.panel.press(false);
        rig.cues.take();
        let stale = rig.source.clone();

        // Devices still plugged in but already unmounted
        rig.probe.set(&[Source, Destination], &[]);
        assert_eq!(*rig.tick().await, State::Filled);
        assert!(rig.transfer.take().is_empty());

        // Unplugged, but the mount entry lingers
        rig.probe.set(&[], &[&stale]);
        assert_eq!(*rig.tick().await, State::Filled);
        assert_eq!(rig.transfer.take(), vec![Call::Unmount("/dev/sda1".into())]);

        rig.probe.set(&[], &[]);
        assert_eq!(*rig.tick().await, State::Empty);
        assert_eq!(rig.cues.take(), vec![Cue::GreetSource]);
    }

    // ---------------------------------------------------------------------------
    // Blinking

    #[tokio::test]
    async fn test_blink_alternates_active_state_leds() {
        let mut rig = Rig::phone().started().await;

        rig.controller.blink(&rig.hw);
        assert_eq!(rig.panel.level(Led::Source), Some(false));
        rig.controller.blink(&rig.hw);
        assert_eq!(rig.panel.level(Led::Source), Some(true));
        rig.controller.blink(&rig.hw);
        assert_eq!(rig.panel.level(Led::Source), Some(false));

        assert_eq!(rig.panel.level(Led::Destination), Some(false));
    }

    #[tokio::test]
    async fn test_filled_does_not_blink() {
        let mut rig = Rig::phone();
        let stale = rig.source.clone();
        rig.probe.set(&[], &[&stale]);
        rig.controller.start(&rig.hw).await;

        for _ in 0..4 {
            rig.controller.blink(&rig.hw);
            for led in Led::ALL {
                assert_eq!(rig.panel.level(led), Some(false));
            }
        }
    }

    // ---------------------------------------------------------------------------
    // Control loop

    #[tokio::test]
    async fn test_run_stops_on_shutdown_and_turns_leds_off() {
        let mut rig = Rig::phone();
        assert_eq!(rig.controller.tick_interval(), Duration::from_millis(300));
        rig.probe.set(&[], &[]);

        rig.controller.run(&rig.hw, std::future::ready(())).await;

        assert_eq!(*rig.controller.state(), State::Empty);
        assert_eq!(rig.cues.take(), vec![Cue::GreetSource]);
        for led in Led::ALL {
            assert_eq!(rig.panel.level(led), Some(false));
        }
    }
}
