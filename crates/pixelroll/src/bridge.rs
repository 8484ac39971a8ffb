//! The bridge actor: one Tokio task that owns every die, the roll in
//! progress and the chat sink.
//!
//! # How messages flow
//!
//! ```text
//! BridgeHandle ──requests──→ ┌──────────────┐ ──posts────→ ChatSink
//!                            │ BridgeActor  │
//! reader tasks ──events────→ └──────────────┘ ──notices──→ popup/UI
//!      ↑                        │
//!      └── one per open link    └── spawns discovery, connect-with-retry,
//!                                   animations and grace-delayed closes
//! ```
//!
//! The actor never awaits device I/O inside its loop. Anything slow runs
//! in a spawned task that reports back through the event channel, so the
//! registry and the roll session only ever change between two messages.
//! Notifications from one die go through one reader task and one
//! channel, so they are handled in arrival order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use pixelroll_animation::{AnimationController, AnimationError, AnimationJob};
use pixelroll_die::{Die, DieId, RollState};
use pixelroll_protocol::{
    BatteryStatus, BridgeCommand, BridgeNotice, DieMessage, FaceMask,
    decode_notification, encode_identify_request,
};
use pixelroll_roll::{RollAggregator, RollReport, RollSettings};
use pixelroll_transport::{
    DeviceSelector, DieLink, Peripheral, Scanner, TransportError,
    connect_with_retry,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{BridgeConfig, ChatSink, PixelRollError};

/// Spin color played when a die connects.
const CONNECT_COLOR: u32 = 0x0000_FF00;
/// Blink color played when a die is asked to disconnect.
const FAREWELL_COLOR: u32 = 0x00FF_0000;
const FAREWELL_BLINKS: u8 = 3;
const FAREWELL_DURATION: Duration = Duration::from_millis(1500);
const FAREWELL_FADE: u8 = 32;

type LinkOf<S> = <<S as Scanner>::Peripheral as Peripheral>::Link;

/// Requests sent through a [`BridgeHandle`].
#[derive(Debug)]
enum BridgeRequest {
    Command(BridgeCommand),
    Snapshot { reply: oneshot::Sender<BridgeSnapshot> },
    Shutdown { done: oneshot::Sender<()> },
}

/// What spawned tasks report back to the actor.
enum LinkEvent<S: Scanner> {
    Discovered(S::Peripheral),
    DiscoveryFailed(TransportError),
    Opened { name: String, link: Arc<LinkOf<S>> },
    OpenFailed { name: String, error: TransportError },
    Notification { id: DieId, data: Vec<u8> },
    Closed { id: DieId },
}

/// A point-in-time view of one die.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DieSnapshot {
    pub id: DieId,
    pub name: String,
    pub token: String,
    pub status: RollState,
    pub face: Option<u8>,
    pub battery: Option<BatteryStatus>,
    pub animating: bool,
    pub writable: bool,
}

/// A point-in-time view of the whole bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSnapshot {
    /// Connected dice in connection order.
    pub dice: Vec<DieSnapshot>,
    /// Names of the dice in the current rollset.
    pub rollset: Vec<String>,
    pub settings: RollSettings,
    /// Current pass of the roll, 1 or 2.
    pub pass: u8,
    /// Names of dice still being connected.
    pub pending: Vec<String>,
}

impl BridgeSnapshot {
    pub fn die(&self, name: &str) -> Option<&DieSnapshot> {
        self.dice.iter().find(|d| d.name == name)
    }
}

/// Handle to a running bridge. Cheap to clone.
///
/// Every method fails with [`PixelRollError::BridgeUnavailable`] once the
/// bridge has shut down.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    sender: mpsc::Sender<BridgeRequest>,
}

impl BridgeHandle {
    /// Sends one command (fire-and-forget).
    pub async fn send(&self, command: BridgeCommand) -> Result<(), PixelRollError> {
        self.request(BridgeRequest::Command(command)).await
    }

    /// Scans for a die, optionally by advertised name, and connects to it.
    pub async fn connect(&self, name: Option<&str>) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::Connect {
            name: name.map(str::to_owned),
        })
        .await
    }

    pub async fn disconnect_die(&self, name: &str) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::DisconnectDie { name: name.to_owned() })
            .await
    }

    pub async fn disconnect_all(&self) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::DisconnectAll).await
    }

    /// Asks for a fresh `showDice` + `updateDiceData` broadcast.
    pub async fn get_status(&self) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::GetStatus).await
    }

    pub async fn set_formula(
        &self,
        formula: &str,
        advantage: bool,
        sum: bool,
    ) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::SetFormula {
            formula: formula.to_owned(),
            adv_disadvantage: advantage,
            sum_rolls: sum,
        })
        .await
    }

    pub async fn set_checked(
        &self,
        advantage: bool,
        sum: bool,
    ) -> Result<(), PixelRollError> {
        self.send(BridgeCommand::SetChecked {
            adv_disadvantage: advantage,
            sum_rolls: sum,
        })
        .await
    }

    /// Includes or excludes a die from rolls.
    pub async fn set_enabled(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<(), PixelRollError> {
        let status = if enabled {
            RollState::Ready
        } else {
            RollState::Disabled
        };
        self.send(BridgeCommand::UpdateDieStatus {
            name: name.to_owned(),
            status: status.as_str().to_owned(),
        })
        .await
    }

    /// Returns the bridge's current state.
    ///
    /// Every request sent before this one has been handled by the time
    /// the snapshot is taken.
    pub async fn snapshot(&self) -> Result<BridgeSnapshot, PixelRollError> {
        let (reply, rx) = oneshot::channel();
        self.request(BridgeRequest::Snapshot { reply }).await?;
        rx.await.map_err(|_| PixelRollError::BridgeUnavailable)
    }

    /// Closes every link and stops the bridge.
    pub async fn shutdown(&self) -> Result<(), PixelRollError> {
        let (done, rx) = oneshot::channel();
        self.request(BridgeRequest::Shutdown { done }).await?;
        rx.await.map_err(|_| PixelRollError::BridgeUnavailable)
    }

    async fn request(&self, request: BridgeRequest) -> Result<(), PixelRollError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| PixelRollError::BridgeUnavailable)
    }
}

/// Entry point for starting a bridge.
pub struct Bridge;

impl Bridge {
    /// Spawns the bridge actor on the current Tokio runtime.
    ///
    /// Finished roll messages go to `chat`; `showDice` and
    /// `updateDiceData` notices go to `notices`.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<S, C>(
        config: BridgeConfig,
        scanner: S,
        chat: C,
        notices: mpsc::UnboundedSender<BridgeNotice>,
    ) -> BridgeHandle
    where
        S: Scanner,
        C: ChatSink,
    {
        let (sender, requests) =
            mpsc::channel(config.command_channel_size.max(1));
        let (events_tx, events) = mpsc::unbounded_channel();
        let farewell_faces = config.farewell_mask().unwrap_or_else(|e| {
            warn!(error = %e, "bad farewell_faces, lighting every face");
            FaceMask::ALL
        });

        let actor = BridgeActor {
            roller: RollAggregator::new(config.roll.clone()),
            farewell_faces,
            config,
            scanner: Arc::new(scanner),
            chat,
            notices,
            links: HashMap::new(),
            pending: HashSet::new(),
            requests,
            events,
            events_tx,
        };
        tokio::spawn(actor.run());

        BridgeHandle { sender }
    }
}

/// Transport side of one registered die.
struct DieSlot<L> {
    link: Arc<L>,
    animation: AnimationController,
    reader: JoinHandle<()>,
}

struct BridgeActor<S: Scanner, C> {
    config: BridgeConfig,
    scanner: Arc<S>,
    chat: C,
    notices: mpsc::UnboundedSender<BridgeNotice>,
    roller: RollAggregator,
    /// Parsed `farewell_faces`.
    farewell_faces: FaceMask,
    links: HashMap<DieId, DieSlot<LinkOf<S>>>,
    /// Names between discovery and registration.
    pending: HashSet<String>,
    requests: mpsc::Receiver<BridgeRequest>,
    events: mpsc::UnboundedReceiver<LinkEvent<S>>,
    events_tx: mpsc::UnboundedSender<LinkEvent<S>>,
}

impl<S: Scanner, C: ChatSink> BridgeActor<S, C> {
    async fn run(mut self) {
        info!(service = %self.config.service_uuid, "bridge started");

        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(BridgeRequest::Command(command)) => {
                        self.handle_command(command);
                    }
                    Some(BridgeRequest::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(BridgeRequest::Shutdown { done }) => {
                        self.requests.close();
                        self.close_all().await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.close_all().await;
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        info!("bridge stopped");
    }

    fn handle_command(&mut self, command: BridgeCommand) {
        debug!(?command, "command");
        match command {
            BridgeCommand::Connect { name } => self.discover(name),
            BridgeCommand::DisconnectDie { name } => {
                let Some(id) = self.roller.dice().by_name(&name).map(Die::id)
                else {
                    warn!(die = %name, "disconnect ignored, no such die");
                    return;
                };
                if let Some((_, report)) = self.roller.remove(id) {
                    self.retire(id, name);
                    self.apply_report(report);
                    self.broadcast();
                }
            }
            BridgeCommand::DisconnectAll => {
                let removed = self.roller.clear();
                info!(dice = removed.len(), "disconnecting all dice");
                for die in removed {
                    self.retire(die.id(), die.name().to_owned());
                }
                self.broadcast();
            }
            BridgeCommand::GetStatus => self.broadcast(),
            BridgeCommand::SetFormula {
                formula,
                adv_disadvantage,
                sum_rolls,
            } => {
                let report = self.roller.set_settings(RollSettings {
                    formula,
                    advantage: adv_disadvantage,
                    sum: sum_rolls,
                });
                self.apply_report(report);
            }
            BridgeCommand::SetChecked {
                adv_disadvantage,
                sum_rolls,
            } => {
                let report = self.roller.set_modes(adv_disadvantage, sum_rolls);
                self.apply_report(report);
            }
            BridgeCommand::UpdateDieStatus { name, status } => {
                match self.roller.dice().id_of(&name) {
                    Ok(id) => {
                        let enabled = status != RollState::Disabled.as_str();
                        let report = self.roller.set_enabled(id, enabled);
                        self.apply_report(report);
                    }
                    Err(e) => warn!(error = %e, "status update ignored"),
                }
            }
        }
    }

    fn handle_event(&mut self, event: LinkEvent<S>) {
        match event {
            LinkEvent::Discovered(peripheral) => self.open(peripheral),
            LinkEvent::DiscoveryFailed(e) => {
                warn!(error = %e, "no die found");
            }
            LinkEvent::Opened { name, link } => self.register(name, link),
            LinkEvent::OpenFailed { name, error } => {
                self.pending.remove(&name);
                warn!(die = %name, error = %error, "die not connected");
            }
            LinkEvent::Notification { id, data } => self.on_notification(id, &data),
            LinkEvent::Closed { id } => self.on_closed(id),
        }
    }

    fn discover(&self, name: Option<String>) {
        let mut selector = DeviceSelector::service(self.config.service_uuid);
        if let Some(name) = name {
            selector = selector.named(name);
        }
        info!(name = ?selector.name, "scanning for die");

        let scanner = Arc::clone(&self.scanner);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match scanner.request_device(&selector).await {
                Ok(peripheral) => LinkEvent::Discovered(peripheral),
                Err(e) => LinkEvent::DiscoveryFailed(e),
            };
            let _ = events.send(event);
        });
    }

    fn open(&mut self, peripheral: S::Peripheral) {
        let name = peripheral.name().to_owned();
        if self.roller.dice().by_name(&name).is_some()
            || self.pending.contains(&name)
        {
            warn!(die = %name, "duplicate peripheral ignored");
            return;
        }
        self.pending.insert(name.clone());

        let policy = self.config.retry_policy();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match connect_with_retry(&peripheral, &policy).await {
                Ok(link) => LinkEvent::Opened {
                    name,
                    link: Arc::new(link),
                },
                Err(error) => LinkEvent::OpenFailed { name, error },
            };
            let _ = events.send(event);
        });
    }

    fn register(&mut self, name: String, link: Arc<LinkOf<S>>) {
        self.pending.remove(&name);
        let id = match self.roller.register(&name, self.config.enable_on_connect)
        {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "connected die not registered");
                tokio::spawn(async move {
                    let _ = link.close().await;
                });
                return;
            }
        };

        let reader = spawn_reader(id, Arc::clone(&link), self.events_tx.clone());
        let animation = AnimationController::new();
        if self.config.connect_animation {
            start_animation(
                &animation,
                AnimationJob::spin(CONNECT_COLOR),
                &link,
                &name,
            );
        }
        self.links.insert(
            id,
            DieSlot {
                link,
                animation,
                reader,
            },
        );

        info!(die = %name, %id, "die connected");
        self.broadcast();
    }

    fn on_notification(&mut self, id: DieId, data: &[u8]) {
        let message = match decode_notification(data) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(%id, kind = ?data.first(), "notification ignored");
                return;
            }
            Err(e) => {
                warn!(%id, error = %e, "malformed notification dropped");
                return;
            }
        };

        match message {
            DieMessage::Roll(event) => {
                let report = self.roller.handle_event(id, event);
                self.apply_report(report);
            }
            DieMessage::Info(info) => {
                if self.roller.update_info(id, info) {
                    self.notify_die(id);
                }
            }
            DieMessage::Battery(battery) => {
                self.roller.update_battery(id, battery);
            }
        }
    }

    fn on_closed(&mut self, id: DieId) {
        self.links.remove(&id);
        let Some((die, report)) = self.roller.remove(id) else {
            return;
        };

        warn!(die = %die.name(), %id, "die link lost");
        self.notify(BridgeNotice::UpdateDiceData {
            dice_name: die.name().to_owned(),
            face_value: die.last_face(),
            status: RollState::Disconnected.as_str().to_owned(),
        });
        self.apply_report(report);
        self.broadcast();
    }

    /// Plays the farewell blink, then closes the link once the grace
    /// period is over.
    fn retire(&mut self, id: DieId, name: String) {
        let Some(slot) = self.links.remove(&id) else {
            return;
        };
        let farewell =
            AnimationJob::blink(FAREWELL_COLOR, FAREWELL_BLINKS, FAREWELL_DURATION)
                .with_faces(self.farewell_faces)
                .with_fade(FAREWELL_FADE)
                .with_loops(self.config.farewell_loops);
        start_animation(&slot.animation, farewell, &slot.link, &name);

        let grace = self.config.disconnect_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            slot.reader.abort();
            if let Err(e) = slot.link.close().await {
                warn!(die = %name, error = %e, "close failed");
            }
            info!(die = %name, "die disconnected");
        });
    }

    async fn close_all(&mut self) {
        let slots: Vec<_> = self.links.drain().collect();
        for (id, slot) in slots {
            slot.reader.abort();
            if let Err(e) = slot.link.close().await {
                warn!(%id, error = %e, "close failed");
            }
        }
        self.roller.clear();
    }

    fn apply_report(&mut self, report: RollReport) {
        for post in &report.posts {
            match self.chat.post(post) {
                Ok(()) => info!(text = %post, "roll posted"),
                Err(e) => warn!(text = %post, error = %e, "roll message dropped"),
            }
        }
        for id in report.changed {
            self.notify_die(id);
        }
    }

    /// Sends `showDice` and then one `updateDiceData` per die.
    fn broadcast(&self) {
        let dice = self.roller.dice().iter().map(|d| d.summary()).collect();
        self.notify(BridgeNotice::ShowDice { dice });
        for die in self.roller.dice().iter() {
            self.notify_die(die.id());
        }
    }

    fn notify_die(&self, id: DieId) {
        if let Some(die) = self.roller.die(id) {
            self.notify(BridgeNotice::UpdateDiceData {
                dice_name: die.name().to_owned(),
                face_value: die.last_face(),
                status: die.state().as_str().to_owned(),
            });
        }
    }

    fn notify(&self, notice: BridgeNotice) {
        if self.notices.send(notice).is_err() {
            debug!("notice dropped, no listener");
        }
    }

    fn snapshot(&self) -> BridgeSnapshot {
        let dice = self
            .roller
            .dice()
            .iter()
            .map(|die| {
                let slot = self.links.get(&die.id());
                DieSnapshot {
                    id: die.id(),
                    name: die.name().to_owned(),
                    token: die.token().to_owned(),
                    status: die.state(),
                    face: die.last_face(),
                    battery: die.battery(),
                    animating: slot.is_some_and(|s| s.animation.is_running()),
                    writable: slot.is_some_and(|s| s.link.can_write()),
                }
            })
            .collect();

        let rollset = self
            .roller
            .rollset()
            .iter()
            .filter_map(|&id| self.roller.die(id))
            .map(|die| die.name().to_owned())
            .collect();

        let mut pending: Vec<_> = self.pending.iter().cloned().collect();
        pending.sort();

        BridgeSnapshot {
            dice,
            rollset,
            settings: self.roller.settings().clone(),
            pass: self.roller.session().pass(),
            pending,
        }
    }
}

/// Forwards a link's notifications to the actor, tagged with the die id.
///
/// Asks the die to identify itself first, when the link can write.
fn spawn_reader<S: Scanner>(
    id: DieId,
    link: Arc<LinkOf<S>>,
    events: mpsc::UnboundedSender<LinkEvent<S>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if link.can_write() {
            if let Err(e) = link.send(&encode_identify_request()).await {
                warn!(%id, error = %e, "identify request not sent");
            }
        }

        loop {
            match link.recv().await {
                Ok(Some(data)) => {
                    if events.send(LinkEvent::Notification { id, data }).is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(%id, error = %e, "notification stream failed");
                    break;
                }
            }
        }
        let _ = events.send(LinkEvent::Closed { id });
    })
}

fn start_animation<L: DieLink>(
    controller: &AnimationController,
    job: AnimationJob,
    link: &Arc<L>,
    name: &str,
) {
    match controller.start(job, Arc::clone(link)) {
        Ok(_) => {}
        Err(AnimationError::WriteUnavailable) => {
            debug!(die = %name, "die cannot animate");
        }
        Err(e) => debug!(die = %name, error = %e, "animation not started"),
    }
}
