use plama_types::ProcessStatus;

// ── Parsing ─────────────────────────────────────────────────────

#[test]
fn parse_known_values_case_insensitively() {
    assert_eq!(ProcessStatus::parse("ON"), ProcessStatus::On);
    assert_eq!(ProcessStatus::parse(" lag "), ProcessStatus::Lag);
    assert_eq!(ProcessStatus::parse("Error"), ProcessStatus::Error);
    assert_eq!(ProcessStatus::parse("old"), ProcessStatus::Old);
    assert_eq!(ProcessStatus::parse("off"), ProcessStatus::Off);
    assert_eq!(ProcessStatus::parse(""), ProcessStatus::Unset);
}

#[test]
fn unknown_values_are_preserved() {
    let status = ProcessStatus::parse("Warming");
    assert!(!status.is_known());
    assert_eq!(status.to_string(), "warming");
}

#[test]
fn serde_uses_field_value() {
    let json = serde_json::to_string(&ProcessStatus::Lag).unwrap();
    assert_eq!(json, "\"lag\"");
    let back: ProcessStatus = serde_json::from_str("\"ERROR\"").unwrap();
    assert_eq!(back, ProcessStatus::Error);
}

// ── Transitions ─────────────────────────────────────────────────

#[test]
fn handshake_path_is_allowed() {
    use ProcessStatus::*;
    assert!(Off.can_transition_to(&On));
    assert!(On.can_transition_to(&Lag));
    assert!(Lag.can_transition_to(&Lag));
    assert!(Lag.can_transition_to(&On));
    assert!(Lag.can_transition_to(&Error));
    assert!(On.can_transition_to(&Off));
    assert!(Error.can_transition_to(&On));
}

#[test]
fn idle_agent_cannot_jump_to_lag() {
    use ProcessStatus::*;
    assert!(!Off.can_transition_to(&Lag));
    assert!(!Off.can_transition_to(&Error));
}

#[test]
fn busy_states() {
    assert!(ProcessStatus::On.is_busy());
    assert!(ProcessStatus::Lag.is_busy());
    assert!(!ProcessStatus::Off.is_busy());
    assert!(!ProcessStatus::Error.is_busy());
}
