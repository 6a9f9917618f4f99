use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use lightctl_client::{ClientConfig, ControlEvent, GatewayError, HttpGateway, LightControl};
use lightctl_core::{CommandResponse, PowerTarget};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lightctl", about = "Switch the printer light and set its intensity")]
struct Cli {
    /// Overrides LIGHTCTL_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
    /// Overrides LIGHTCTL_API_KEY
    #[arg(long)]
    api_key: Option<String>,
    /// Intensity as typed into the field; filtered to at most three digits
    #[arg(long, global = true)]
    pwm: Option<String>,
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Action {
    /// Ask the device for its power state
    Status,
    /// Flip the light, or let the device decide if its state is unknown
    Toggle,
    On,
    Off,
    /// Reconcile after the startup delay, then print state changes until Ctrl+C
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut cfg = ClientConfig::from_env();
    if let Some(url) = cli.base_url {
        cfg.base_url = url;
    }
    if let Some(key) = cli.api_key {
        cfg.api_key = Some(key);
    }

    let gateway = HttpGateway::new(&cfg)?;
    tracing::debug!(endpoint = %gateway.endpoint(), "Using light control endpoint");
    let control = LightControl::new(Arc::new(gateway));
    if let Some(shown) = apply_pwm(&control, cli.pwm.as_deref()).await {
        eprintln!("intensity input read as '{}'", shown);
    }

    if let Action::Watch = cli.action {
        return watch(control, &cfg).await;
    }
    if let Some(resp) = perform(&control, cli.action).await? {
        report(resp);
    }
    println!("light: {}", control.power_state().await);
    Ok(())
}

/// Feeds `--pwm` through the intensity field; returns what the field shows
/// when filtering changed the input.
async fn apply_pwm(control: &LightControl, raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let shown = control.on_intensity_input(raw).await;
    (shown != raw).then_some(shown)
}

async fn perform(control: &LightControl, action: Action) -> Result<Option<CommandResponse>, GatewayError> {
    match action {
        Action::Status | Action::Watch => {
            control.query().await?;
            Ok(None)
        }
        Action::Toggle => {
            // A fresh process knows nothing; learn the state first so toggle
            // can send an explicit on/off instead of a blind toggle
            if let Err(err) = control.query().await {
                tracing::warn!(%err, "Status query failed; sending blind toggle");
            }
            control.toggle().await.map(Some)
        }
        Action::On => control.set_power(PowerTarget::On).await.map(Some),
        Action::Off => control.set_power(PowerTarget::Off).await.map(Some),
    }
}

fn report(resp: CommandResponse) {
    if let Some(sent) = resp.sent {
        println!("sent: {}", sent);
    }
    if let Some(err) = resp.error {
        eprintln!("device error: {}", err);
    }
}

async fn watch(control: LightControl, cfg: &ClientConfig) -> anyhow::Result<()> {
    let mut events = control.events();
    let startup = control.spawn_startup_query(cfg.startup_delay());
    println!("light: {} (querying in {} ms)", control.power_state().await, cfg.startup_delay_ms);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            ev = events.recv() => match ev {
                Ok(ControlEvent::PowerChanged(state)) => println!("light: {}", state),
                Ok(ControlEvent::BusyChanged(busy)) => tracing::debug!(busy, "Busy changed"),
                Ok(ControlEvent::IntensityChanged(value)) => println!("intensity: {}", value),
                Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "Dropped control events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
    startup.abort();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,lightctl_client=info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lightctl_client::CommandGateway;
    use lightctl_core::{Command, Directive};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<Command>>,
        is_on: Option<bool>,
    }

    #[async_trait]
    impl CommandGateway for RecordingGateway {
        async fn send(&self, command: &Command) -> Result<CommandResponse, GatewayError> {
            self.sent.lock().unwrap().push(command.clone());
            Ok(CommandResponse { ok: Some(true), is_on: self.is_on, ..Default::default() })
        }
    }

    async fn run(args: &[&str], gateway: Arc<RecordingGateway>) -> (LightControl, Option<String>) {
        let cli = Cli::try_parse_from(args).expect("args");
        let control = LightControl::new(gateway);
        let shown = apply_pwm(&control, cli.pwm.as_deref()).await;
        perform(&control, cli.action).await.expect("perform");
        (control, shown)
    }

    #[tokio::test]
    async fn pwm_flag_is_sanitized_then_clamped() {
        let gateway = Arc::new(RecordingGateway { is_on: Some(true), ..Default::default() });

        let (control, shown) = run(&["lightctl", "on", "--pwm", "1x2y3z9"], gateway.clone()).await;

        assert_eq!(shown.as_deref(), Some("123"));
        assert_eq!(control.intensity().await, "123");
        assert_eq!(
            *gateway.sent.lock().unwrap(),
            vec![Command::SetState { state: PowerTarget::On, pwm: Some(123) }]
        );
    }

    #[tokio::test]
    async fn out_of_range_pwm_clamps_to_max() {
        let gateway = Arc::new(RecordingGateway::default());

        let (_, shown) = run(&["lightctl", "--pwm", "999", "off"], gateway.clone()).await;

        assert_eq!(shown, None);
        assert_eq!(
            *gateway.sent.lock().unwrap(),
            vec![Command::SetState { state: PowerTarget::Off, pwm: Some(255) }]
        );
    }

    #[tokio::test]
    async fn toggle_queries_before_deciding() {
        let gateway = Arc::new(RecordingGateway { is_on: Some(true), ..Default::default() });

        run(&["lightctl", "toggle"], gateway.clone()).await;

        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent[0], Command::QueryStatus);
        assert_eq!(sent[1], Command::Toggle { target: Directive::Off, pwm: Some(255) });
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(Cli::try_parse_from(["lightctl", "dim"]).is_err());
        assert!(Cli::try_parse_from(["lightctl"]).is_err());
    }
}
