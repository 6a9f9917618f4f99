use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lightctl_core::{
    clamp, sanitize, Command, CommandResponse, Directive, PowerState, PowerTarget, ReportedState,
    DEFAULT_INTENSITY,
};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::CommandGateway;

/// State changes published to whatever renders the control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    PowerChanged(PowerState),
    BusyChanged(bool),
    IntensityChanged(String),
}

#[derive(Debug)]
struct ControlState {
    power: PowerState,
    intensity: String,
}

/// Client-side light switch with a pending intensity field.
///
/// Power state only ever changes from a server response. Overlapping commands
/// are not suppressed: each is sent as soon as it's issued, the last response
/// to arrive decides the power state, and the first one to finish clears the
/// busy flag.
#[derive(Clone)]
pub struct LightControl {
    gateway: Arc<dyn CommandGateway>,
    state: Arc<RwLock<ControlState>>,
    busy: Arc<AtomicBool>,
    next_seq: Arc<AtomicU64>,
    events_tx: broadcast::Sender<ControlEvent>,
}

impl LightControl {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            gateway,
            state: Arc::new(RwLock::new(ControlState {
                power: PowerState::Unknown,
                intensity: DEFAULT_INTENSITY.to_string(),
            })),
            busy: Arc::new(AtomicBool::new(false)),
            next_seq: Arc::new(AtomicU64::new(1)),
            events_tx: tx,
        }
    }

    pub fn events(&self) -> broadcast::Receiver<ControlEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn power_state(&self) -> PowerState {
        self.state.read().await.power
    }

    pub async fn intensity(&self) -> String {
        self.state.read().await.intensity.clone()
    }

    /// Handle a keystroke in the intensity field. The returned text should
    /// replace what the field displays.
    pub async fn on_intensity_input(&self, raw: &str) -> String {
        let value = sanitize(raw);
        let mut state = self.state.write().await;
        if state.intensity != value {
            state.intensity = value.clone();
            let _ = self.events_tx.send(ControlEvent::IntensityChanged(value.clone()));
        }
        value
    }

    /// The command `toggle` would send right now.
    pub async fn toggle_command(&self) -> Command {
        let state = self.state.read().await;
        Command::Toggle {
            target: Directive::for_state(state.power),
            pwm: clamp(&state.intensity),
        }
    }

    pub async fn toggle(&self) -> Result<CommandResponse, GatewayError> {
        let command = self.toggle_command().await;
        self.dispatch(command).await
    }

    pub async fn set_power(&self, target: PowerTarget) -> Result<CommandResponse, GatewayError> {
        let pwm = clamp(&self.state.read().await.intensity);
        self.dispatch(Command::SetState { state: target, pwm }).await
    }

    pub async fn query(&self) -> Result<CommandResponse, GatewayError> {
        self.dispatch(Command::QueryStatus).await
    }

    /// Send one command and fold its response into local state.
    pub async fn dispatch(&self, command: Command) -> Result<CommandResponse, GatewayError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let _busy = BusyGuard::acquire(&self.busy, &self.events_tx, seq);
        debug!(seq, command = command.name(), pwm = ?command.pwm(), "Dispatching command");

        match self.gateway.send(&command).await {
            Ok(resp) => {
                self.apply(seq, &resp).await;
                Ok(resp)
            }
            Err(err) => {
                warn!(seq, command = command.name(), error = %err, "Command failed; keeping last known state");
                Err(err)
            }
        }
    }

    async fn apply(&self, seq: u64, resp: &CommandResponse) {
        let Some(reported) = resp.reported_state() else {
            debug!(seq, "Response carries no power state");
            return;
        };
        let power = reported.power();
        let mut state = self.state.write().await;
        match reported {
            ReportedState::Confirmed(_) => debug!(seq, %power, "Device confirmed power state"),
            ReportedState::Assumed(_) => debug!(seq, %power, "Device assumed power state"),
        }
        if state.power != power {
            info!(seq, from = %state.power, to = %power, "Light power state changed");
            state.power = power;
            let _ = self.events_tx.send(ControlEvent::PowerChanged(power));
        }
    }

    /// Query the device once after `delay`, giving the host time to settle.
    pub fn spawn_startup_query(&self, delay: Duration) -> JoinHandle<()> {
        let control = self.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            debug!("Running startup status query");
            if let Err(err) = control.query().await {
                warn!(error = %err, "Startup status query failed");
            }
        })
    }
}

// Clears the busy flag when the dispatch finishes, fails or is dropped
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    events_tx: &'a broadcast::Sender<ControlEvent>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(busy: &'a AtomicBool, events_tx: &'a broadcast::Sender<ControlEvent>, seq: u64) -> Self {
        if busy.swap(true, Ordering::SeqCst) {
            debug!(seq, "Overlapping request; last response wins");
        }
        let _ = events_tx.send(ControlEvent::BusyChanged(true));
        Self { busy, events_tx }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
        let _ = self.events_tx.send(ControlEvent::BusyChanged(false));
    }
}

#[cfg(test)]
#[path = "tests/control_tests.rs"]
mod tests;
