use super::*;
use crate::gcode::{SinkError, WriterSink};
use std::io;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<String>>,
    fail: bool,
}

impl GcodeSink for RecordingSink {
    fn send(&self, line: &str) -> Result<(), SinkError> {
        self.lines.lock().unwrap().push(line.to_string());
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "printer offline").into());
        }
        Ok(())
    }
}

fn service(settings: GcodeSettings) -> (LightService, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (LightService::new(settings, sink.clone()), sink)
}

fn with_toggle(gcode: &str) -> GcodeSettings {
    GcodeSettings { gcode_toggle: gcode.to_string(), ..GcodeSettings::default() }
}

#[test]
fn pwm_token_is_replaced_in_any_case() {
    assert_eq!(inject_pwm("M355 S1 P{p}", 80), "M355 S1 P80");
    assert_eq!(inject_pwm("M355 S1 P{P}", 80), "M355 S1 P80");
    assert_eq!(inject_pwm("M106 S{p} ; fan {p}", 5), "M106 S5 ; fan 5");
}

#[test]
fn pwm_appended_to_bare_m355() {
    assert_eq!(inject_pwm("M355 S1", 128), "M355 S1 P128");
    assert_eq!(inject_pwm("m355 s1", 0), "m355 s1 P0");
}

#[test]
fn pwm_left_out_when_not_applicable() {
    assert_eq!(inject_pwm("M355 S1 P255", 10), "M355 S1 P255");
    assert_eq!(inject_pwm("M42 P4 S255", 10), "M42 P4 S255");
}

#[tokio::test]
async fn set_on_sends_gcode_with_pwm() {
    let (svc, sink) = service(GcodeSettings::default());

    let resp = svc.handle_set(PowerTarget::On, Some(100)).await;

    assert_eq!(resp.ok, Some(true));
    assert_eq!(resp.is_on, Some(true));
    assert_eq!(resp.used.as_deref(), Some("on"));
    assert_eq!(resp.sent.as_deref(), Some("M355 S1 P100"));
    assert_eq!(*sink.lines.lock().unwrap(), vec!["M355 S1 P100".to_string()]);
    assert_eq!(svc.power_state().await, PowerState::On);
}

#[tokio::test]
async fn set_off_ignores_pwm() {
    let (svc, sink) = service(GcodeSettings::default());

    let resp = svc.handle_set(PowerTarget::Off, Some(100)).await;

    assert_eq!(resp.is_on, Some(false));
    assert_eq!(resp.sent.as_deref(), Some("M355 S0"));
    assert_eq!(*sink.lines.lock().unwrap(), vec!["M355 S0".to_string()]);
}

#[tokio::test]
async fn toggle_without_toggle_gcode_alternates_from_memory() {
    let (svc, sink) = service(GcodeSettings::default());

    // Unknown goes on first
    let first = svc.handle_toggle(Some(Directive::Toggle), None).await;
    assert_eq!(first.is_on, Some(true));
    let second = svc.handle_toggle(Some(Directive::Toggle), None).await;
    assert_eq!(second.is_on, Some(false));

    assert_eq!(
        *sink.lines.lock().unwrap(),
        vec!["M355 S1".to_string(), "M355 S0".to_string()]
    );
}

#[tokio::test]
async fn toggle_gcode_flips_known_state() {
    let (svc, sink) = service(with_toggle("M355 T"));
    svc.handle_set(PowerTarget::On, None).await;

    let resp = svc.handle_toggle(Some(Directive::Toggle), Some(50)).await;

    assert_eq!(resp.ok, Some(true));
    assert_eq!(resp.is_on, None);
    assert_eq!(resp.assumed_is_on, Some(false));
    assert_eq!(resp.used.as_deref(), Some("toggle"));
    assert_eq!(sink.lines.lock().unwrap().last().map(String::as_str), Some("M355 T"));
}

#[tokio::test]
async fn toggle_gcode_keeps_unknown_state_unknown() {
    let (svc, _sink) = service(with_toggle("M355 T"));

    let resp = svc.handle_toggle(Some(Directive::Toggle), None).await;

    assert_eq!(resp.assumed_is_on, None);
    assert_eq!(resp.reported_state(), None);
    assert_eq!(svc.power_state().await, PowerState::Unknown);
}

#[tokio::test]
async fn explicit_targets_delegate_to_set() {
    let (svc, _sink) = service(GcodeSettings::default());
    assert_eq!(svc.handle_toggle(Some(Directive::Off), None).await.is_on, Some(false));
    assert_eq!(svc.handle_toggle(Some(Directive::On), Some(9)).await.sent.as_deref(), Some("M355 S1 P9"));
}

#[tokio::test]
async fn bad_target_is_reported() {
    let (svc, sink) = service(GcodeSettings::default());

    let resp = svc.handle_toggle(None, None).await;

    assert_eq!(resp.ok, Some(false));
    assert_eq!(resp.error.as_deref(), Some("bad target"));
    assert!(sink.lines.lock().unwrap().is_empty());
    assert_eq!(svc.power_state().await, PowerState::Unknown);
}

#[tokio::test]
async fn status_query_only_sent_when_configured() {
    let (svc, sink) = service(GcodeSettings::default());
    assert_eq!(svc.query_status().await, (false, None));
    assert!(sink.lines.lock().unwrap().is_empty());

    let settings = GcodeSettings { status_query: " M355 ".to_string(), ..GcodeSettings::default() };
    let (svc, sink) = service(settings);
    svc.handle_set(PowerTarget::Off, None).await;
    assert_eq!(svc.query_status().await, (true, Some(false)));
    assert_eq!(sink.lines.lock().unwrap().last().map(String::as_str), Some("M355"));
}

#[tokio::test]
async fn sink_failure_still_updates_memory() {
    let sink = Arc::new(RecordingSink { fail: true, ..Default::default() });
    let svc = LightService::new(GcodeSettings::default(), sink.clone());

    let resp = svc.handle_set(PowerTarget::On, None).await;

    assert_eq!(resp.ok, Some(true));
    assert_eq!(svc.power_state().await, PowerState::On);
    assert_eq!(*sink.lines.lock().unwrap(), vec!["M355 S1".to_string()]);
}

#[tokio::test]
async fn writer_sink_receives_each_gcode_line() {
    let sink = Arc::new(WriterSink::new(Vec::new()));
    let svc = LightService::new(with_toggle("M355 T"), sink.clone());

    svc.handle_set(PowerTarget::On, Some(12)).await;
    svc.handle_toggle(Some(Directive::Toggle), None).await;
    drop(svc);

    let sink = Arc::try_unwrap(sink).ok().expect("sole owner");
    assert_eq!(sink.into_inner(), b"M355 S1 P12\nM355 T\n".to_vec());
}

#[tokio::test]
async fn blank_gcode_is_skipped() {
    let settings = GcodeSettings { gcode_off: "   ".to_string(), ..GcodeSettings::default() };
    let (svc, sink) = service(settings);

    let resp = svc.handle_set(PowerTarget::Off, None).await;

    assert_eq!(resp.sent.as_deref(), Some(""));
    assert!(sink.lines.lock().unwrap().is_empty());
}
