//! Scenario Format Tests
//!
//! Scenarios are data; these tests pin the TOML and JSON shapes that
//! scenario files are written in.

use causal_core::{Instruction, ProcessId, Scenario};

const TWO_PROCESS_TOML: &str = r#"
processes = 2

[snapshot]
initiator = 1
after = "y"

[[script]]
process = 0
instructions = [
    { kind = "send", label = "x", to = 1, peer_label = "z" },
]

[[script]]
process = 1
instructions = [
    { kind = "internal", label = "y" },
    { kind = "receive", label = "z", peer_label = "x" },
]
"#;

#[test]
fn parses_toml_scenario() {
    let scenario: Scenario = toml::from_str(TWO_PROCESS_TOML).unwrap();

    assert_eq!(scenario.processes, 2);
    assert_eq!(
        scenario.snapshot.as_ref().map(|t| t.initiator),
        Some(ProcessId(1))
    );
    assert_eq!(
        scenario.script_for(ProcessId(0)).unwrap().instructions,
        vec![Instruction::send("x", ProcessId(1), "z")]
    );
    assert!(scenario.validate().is_ok());
}

#[test]
fn reference_survives_json() {
    let scenario = Scenario::reference();
    let encoded = serde_json::to_string(&scenario).unwrap();
    assert!(encoded.contains(r#""kind":"receive""#));

    let decoded: Scenario = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, scenario);
}

#[test]
fn unknown_instruction_kind_is_rejected() {
    let bad = r#"
processes = 1

[[script]]
process = 0
instructions = [{ kind = "teleport", label = "q" }]
"#;
    assert!(toml::from_str::<Scenario>(bad).is_err());
}
