mod support;

use muic_core::cable::{ADC_200K_USB, ADC_OPEN};
use muic_core::error::Callback;
use muic_core::registers::{Register, control1, device1, int1, manual_sw1};
use muic_core::telemetry::MuicEventKind;
use muic_core::{
    CableType, CycleOutcome, CycleReport, DockMode, MuicConfig, MuicError, ProcessorPath,
    SwitchRoute, UsbEvent, UsbPort,
};

use support::{Call, TestEngine, engine, engine_with};

fn completed(outcome: CycleOutcome) -> CycleReport {
    match outcome {
        CycleOutcome::Completed(report) => report,
        other => panic!("unexpected cycle outcome: {other:?}"),
    }
}

fn attach(engine: &mut TestEngine, device: [u8; 2], adc: u8, vbus: bool) -> CycleReport {
    engine.bus_mut().plug(device, adc, vbus);
    completed(engine.run_cycle())
}

#[test]
fn jig_variants_select_one_sub_handler() {
    let cases = [
        (
            0x1Du8,
            true,
            CableType::JigUartOn,
            &[Call::Dock(DockMode::DeskDock), Call::Charger(CableType::JigUartOn)][..],
        ),
        (
            0x18,
            true,
            CableType::JigUsbOff,
            &[
                Call::Charger(CableType::JigUsbOff),
                Call::UsbPath(ProcessorPath::Ap),
                Call::Usb(UsbEvent::CableAttached),
            ][..],
        ),
        (
            0x19,
            true,
            CableType::JigUsbOn,
            &[
                Call::Charger(CableType::JigUsbOn),
                Call::UsbPath(ProcessorPath::Ap),
                Call::Usb(UsbEvent::CableAttached),
            ][..],
        ),
        (
            0x1C,
            false,
            CableType::JigUartOff,
            &[
                Call::UartPath(ProcessorPath::Ap),
                Call::Charger(CableType::JigUartOff),
            ][..],
        ),
        (
            0x1C,
            true,
            CableType::JigUartOffWithVbus,
            &[
                Call::UartPath(ProcessorPath::Ap),
                Call::HostNotify(true),
                Call::Charger(CableType::JigUartOffWithVbus),
            ][..],
        ),
    ];

    for (adc, vbus, expected, calls) in cases {
        let mut engine = engine();
        let report = attach(&mut engine, [0, 0], adc, vbus);

        assert_eq!(report.cable_type, expected, "adc {adc:#04x}");
        assert_eq!(
            engine.hooks().calls.as_slice(),
            calls,
            "unexpected callbacks for {expected}"
        );
    }
}

#[test]
fn jig_uart_off_otg_test_reports_nothing_attached() {
    let mut engine = engine();
    engine.hooks_mut().host_notify_result = 1;

    let report = attach(&mut engine, [0, 0], 0x1C, true);

    assert_eq!(report.forced, Some(CableType::None));
    assert_eq!(report.cable_type, CableType::None);
    assert_eq!(engine.cable_type(), CableType::None);
    assert_eq!(engine.hooks().chargers().as_slice(), &[CableType::None]);

    // The JIG bit stays latched, so the next cycle does not replay the attach.
    engine.hooks_mut().clear();
    completed(engine.run_cycle());
    assert!(engine.hooks().calls.is_empty());
}

#[test]
fn jig_uart_off_losing_vbus_replays_detach_and_attach() {
    let mut engine = engine();
    attach(&mut engine, [0, 0], 0x1C, true);
    engine.hooks_mut().clear();

    let report = attach(&mut engine, [0, 0], 0x1C, false);

    assert_eq!(report.cable_type, CableType::JigUartOff);
    assert_eq!(
        engine.hooks().chargers().as_slice(),
        &[CableType::None, CableType::JigUartOff]
    );
    assert_eq!(engine.paths().route, SwitchRoute::Uart(ProcessorPath::Ap));
}

#[test]
fn attach_then_detach_restores_path_config() {
    let cables: [(&str, [u8; 2], u8, bool, u8); 9] = [
        ("sdp", [device1::SDP, 0], ADC_OPEN, true, 0),
        ("cdp", [device1::CDP, 0], ADC_OPEN, true, 0),
        ("otg", [device1::OTG, 0], 0x00, false, 0),
        ("uart", [device1::UART, 0], 0x16, false, 0),
        ("jig-usb-off", [0, 0], 0x18, true, 0),
        ("jig-uart-off", [0, 0], 0x1C, false, 0),
        ("jig-uart-on", [0, 0], 0x1D, true, 0),
        ("dock", [0, 0], 0x1A, true, 0),
        ("200k", [0, 0], ADC_200K_USB, true, int1::CHG_DET),
    ];

    for (label, device, adc, vbus, extra_flags) in cables {
        let mut engine = engine();
        let initial = *engine.paths();

        engine.bus_mut().plug(device, adc, vbus);
        engine.bus_mut().raise_flag1(extra_flags);
        let report = completed(engine.run_cycle());
        assert_ne!(report.cable_type, CableType::None, "{label} not detected");

        engine.bus_mut().unplug();
        let report = completed(engine.run_cycle());

        assert_eq!(report.cable_type, CableType::None, "{label}");
        assert_eq!(*engine.paths(), initial, "{label} left paths modified");
        assert_eq!(
            engine.bus().reg(Register::Control1),
            control1::DEFAULT,
            "{label} left CONTROL1 modified"
        );
    }
}

#[test]
fn otg_disables_automatic_detection_while_attached() {
    let mut engine = engine();
    let report = attach(&mut engine, [device1::OTG, 0], 0x00, false);

    assert_eq!(report.cable_type, CableType::Otg);
    assert!(!engine.paths().auto_config);
    assert!(!engine.paths().charge_detect);
    assert_eq!(
        engine.bus().reg(Register::Control1) & (control1::AUTO_CONFIG | control1::CHG_DET_EN),
        0
    );
    assert_eq!(engine.hooks().count(Call::Usb(UsbEvent::OtgHostAttached)), 1);

    engine.bus_mut().unplug();
    completed(engine.run_cycle());
    assert_eq!(engine.hooks().count(Call::Usb(UsbEvent::OtgHostDetached)), 1);
}

#[test]
fn usb_on_cp_skips_usb_events_but_still_detaches_charger() {
    let mut engine = engine_with(MuicConfig::DEFAULT.with_usb_path(ProcessorPath::Cp));
    attach(&mut engine, [device1::SDP, 0], ADC_OPEN, true);

    assert_eq!(engine.hooks().count(Call::UsbPath(ProcessorPath::Cp)), 1);
    assert_eq!(engine.hooks().count(Call::Usb(UsbEvent::CableAttached)), 0);

    engine.bus_mut().unplug();
    completed(engine.run_cycle());

    assert_eq!(engine.hooks().count(Call::Usb(UsbEvent::CableDetached)), 0);
    assert_eq!(engine.hooks().count(Call::Charger(CableType::None)), 1);
}

#[test]
fn sdp_to_cdp_replays_usb_detach_then_attach() {
    let mut engine = engine();
    attach(&mut engine, [device1::SDP, 0], ADC_OPEN, true);
    engine.hooks_mut().clear();

    let report = attach(&mut engine, [device1::CDP, 0], ADC_OPEN, true);

    assert_eq!(report.cable_type, CableType::Usb(UsbPort::Cdp));
    assert_eq!(
        engine.hooks().calls.as_slice(),
        &[
            Call::Charger(CableType::None),
            Call::Usb(UsbEvent::CableDetached),
            Call::Charger(CableType::Usb(UsbPort::Cdp)),
            Call::UsbPath(ProcessorPath::Ap),
            Call::Usb(UsbEvent::CableAttached),
        ]
    );
}

#[test]
fn plain_charger_is_notified_and_detached_through_cable_change() {
    let mut engine = engine();
    let report = attach(&mut engine, [device1::DCP, 0], ADC_OPEN, true);
    assert_eq!(report.cable_type, CableType::Charger);
    assert_eq!(engine.hooks().chargers().as_slice(), &[CableType::Charger]);

    engine.bus_mut().unplug();
    completed(engine.run_cycle());
    assert_eq!(
        engine.hooks().chargers().as_slice(),
        &[CableType::Charger, CableType::None]
    );
}

#[test]
fn dock_refreshes_charger_when_vbus_toggles() {
    let mut engine = engine();
    let report = attach(&mut engine, [0, 0], 0x1A, false);
    assert_eq!(report.cable_type, CableType::Dock);
    assert_eq!(
        engine.hooks().calls.as_slice(),
        &[Call::Dock(DockMode::DeskDock), Call::Charger(CableType::None)]
    );

    attach(&mut engine, [0, 0], 0x1A, true);
    assert_eq!(engine.hooks().count(Call::Dock(DockMode::DeskDock)), 1);
    assert_eq!(
        engine.hooks().chargers().as_slice(),
        &[CableType::None, CableType::Dock]
    );

    engine.bus_mut().unplug();
    completed(engine.run_cycle());
    assert_eq!(engine.hooks().count(Call::Dock(DockMode::Detached)), 1);
    assert_eq!(engine.hooks().count(Call::Charger(CableType::None)), 2);
}

#[test]
fn failing_charger_callback_fails_safe_to_none() {
    let mut engine = engine();
    engine.hooks_mut().fail_charger = true;

    let report = attach(&mut engine, [device1::SDP, 0], ADC_OPEN, true);

    assert_eq!(report.forced, Some(CableType::None));
    assert_eq!(engine.cable_type(), CableType::None);
    assert_eq!(
        engine.hooks().calls.as_slice(),
        &[Call::Charger(CableType::Usb(UsbPort::Sdp))],
        "remaining attach steps must be skipped"
    );
    assert!(
        engine
            .telemetry()
            .oldest_first()
            .any(|record| record.event
                == MuicEventKind::Error(MuicError::CallbackFailure(Callback::Charger)))
    );

    engine.hooks_mut().fail_charger = false;
    engine.hooks_mut().clear();
    engine.bus_mut().unplug();
    completed(engine.run_cycle());

    assert_eq!(
        engine.hooks().calls.as_slice(),
        &[Call::Charger(CableType::None)],
        "no USB event for a route that was never set"
    );
}

#[test]
fn plain_charger_is_released_before_otg_or_uart_attach() {
    let next = [
        (
            CableType::Otg,
            [device1::OTG, 0],
            0x00,
            Call::Usb(UsbEvent::OtgHostAttached),
        ),
        (
            CableType::Uart,
            [device1::UART, 0],
            0x16,
            Call::UartPath(ProcessorPath::Ap),
        ),
    ];

    for (expected, device, adc, attach_call) in next {
        let mut engine = engine();
        attach(&mut engine, [device1::DCP, 0], ADC_OPEN, true);
        engine.hooks_mut().clear();

        let report = attach(&mut engine, device, adc, false);
        assert_eq!(report.cable_type, expected);

        let calls = engine.hooks().calls.as_slice();
        let released = calls
            .iter()
            .position(|call| *call == Call::Charger(CableType::None))
            .unwrap_or_else(|| panic!("charger kept after ta -> {expected}: {calls:?}"));
        let attached = calls
            .iter()
            .position(|call| *call == attach_call)
            .unwrap_or_else(|| panic!("{expected} attach missing: {calls:?}"));
        assert!(released < attached, "{expected}: {calls:?}");
        assert_eq!(engine.hooks().chargers().as_slice(), &[CableType::None]);
    }
}

#[test]
fn usb_detach_completes_when_charger_callback_fails() {
    let mut engine = engine();
    attach(&mut engine, [device1::SDP, 0], ADC_OPEN, true);
    engine.hooks_mut().clear();
    engine.hooks_mut().fail_charger = true;

    engine.bus_mut().unplug();
    let report = completed(engine.run_cycle());

    assert_eq!(report.cable_type, CableType::None);
    assert_eq!(
        engine.hooks().calls.as_slice(),
        &[
            Call::Charger(CableType::None),
            Call::Usb(UsbEvent::CableDetached),
        ]
    );
    assert_eq!(engine.paths().route, SwitchRoute::Open);
    assert_eq!(engine.bus().reg(Register::ManualSw1), manual_sw1::OPEN);
    assert!(
        engine
            .telemetry()
            .oldest_first()
            .any(|record| record.event
                == MuicEventKind::Error(MuicError::CallbackFailure(Callback::Charger)))
    );
}
