use std::{collections::HashMap, time::Duration};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{error, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

/// Restart policy carried over from the deployment's process manifest:
/// dying before MIN_UPTIME burns one of MAX_RESTARTS; surviving past it
/// resets the count.
const MAX_RESTARTS: u32 = 10;
const MIN_UPTIME: Duration = Duration::from_secs(10);

const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);

struct ActorSlot {
    factory: Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>,
    handle: Option<JoinHandle<()>>,
    started_at: Instant,
    last_pulse: Instant,
    restarts: u32,
    retired: bool,
}

/// Keeps every registered actor alive: respawns on missed heartbeats, retires
/// an actor once it exhausts its restart budget.
pub struct Supervisor {
    slots: HashMap<ActorType, ActorSlot>,
    ids: HashMap<Uuid, ActorType>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            ids: HashMap::new(),
        }
    }

    pub fn register_actor(
        &mut self,
        actor_type: ActorType,
        factory: Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>,
    ) {
        self.slots.insert(
            actor_type,
            ActorSlot {
                factory,
                handle: None,
                started_at: Instant::now(),
                last_pulse: Instant::now(),
                restarts: 0,
                retired: false,
            },
        );
    }

    pub async fn start(&mut self) {
        let mut check_interval = time::interval(Duration::from_secs(1));

        let (supervisor_tx, mut supervisor_rx) = mpsc::channel::<ControlMessage>(512);

        let actors: Vec<ActorType> = self.slots.keys().copied().collect();
        for actor_type in actors {
            self.spawn_actor(actor_type, supervisor_tx.clone());
        }

        loop {
            tokio::select! {
                Some(msg) = supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(id) => {
                            if let Some(actor_type) = self.ids.get(&id).copied() {
                                if let Some(slot) = self.slots.get_mut(&actor_type) {
                                    slot.last_pulse = Instant::now();
                                }
                            }
                        }
                        ControlMessage::Shutdown(id) => {
                            if let Some(actor_type) = self.ids.remove(&id) {
                                warn!("{:?} is shutting down gracefully.", actor_type);
                                if let Some(slot) = self.slots.get_mut(&actor_type) {
                                    slot.retired = true;
                                    if let Some(handle) = slot.handle.take() {
                                        handle.abort();
                                    }
                                }
                            }
                        }
                        ControlMessage::Error(id, error_msg) => {
                            if let Some(actor_type) = self.ids.get(&id).copied() {
                                error!("Actor {:?} reported error: {}", actor_type, error_msg);
                                if let Some(slot) = self.slots.get_mut(&actor_type) {
                                    slot.last_pulse = Instant::now();
                                }
                            }
                        }
                    }
                }

                _ = check_interval.tick() => {
                    let dead_timeout = Instant::now() - HEARTBEAT_TIMEOUT;

                    let dead_actors: Vec<ActorType> = self
                        .slots
                        .iter()
                        .filter(|(_, slot)| !slot.retired && slot.last_pulse < dead_timeout)
                        .map(|(actor_type, _)| *actor_type)
                        .collect();

                    for actor_type in dead_actors {
                        warn!("{:?} is unresponsive!", actor_type);
                        let slot = self.slots.get_mut(&actor_type).expect("slot exists");

                        if let Some(handle) = slot.handle.take() {
                            handle.abort();
                        }

                        if slot.started_at.elapsed() >= MIN_UPTIME {
                            slot.restarts = 0;
                        }

                        if slot.restarts >= MAX_RESTARTS {
                            error!(
                                "{:?} exhausted its restart budget ({}), giving up on it.",
                                actor_type, MAX_RESTARTS
                            );
                            slot.retired = true;
                            continue;
                        }

                        slot.restarts += 1;
                        self.spawn_actor(actor_type, supervisor_tx.clone());
                    }
                }
            }
        }
    }

    fn spawn_actor(&mut self, actor_type: ActorType, tx: mpsc::Sender<ControlMessage>) {
        let slot = self.slots.get_mut(&actor_type).expect("slot exists");
        let mut new_actor = (slot.factory)();
        self.ids.insert(new_actor.id(), actor_type);

        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx).await {
                error!("Actor {:?} crashed: {}", actor_type, e);
            }
        });

        slot.handle = Some(new_actor_handle);
        slot.started_at = Instant::now();
        slot.last_pulse = Instant::now();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
