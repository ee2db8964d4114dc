//! The session engine must not depend on any terminal crate

use architectural_enforcement::{find_in_production, workspace_root};

const TERMINAL_CRATES: &[&str] = &["ratatui", "crossterm"];

#[test]
fn test_core_manifest_has_no_terminal_crates() {
    let manifest = std::fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest");

    for name in TERMINAL_CRATES {
        let declared = manifest
            .lines()
            .any(|line| line.trim_start().starts_with(name));
        assert!(!declared, "conductor/core depends on {name}");
    }
}

#[test]
fn test_core_sources_do_not_use_terminal_crates() {
    let src = workspace_root().join("conductor/core/src");
    for name in TERMINAL_CRATES {
        let violations = find_in_production(&src, &format!("{name}::"));
        assert!(
            violations.is_empty(),
            "terminal code in core:\n{}",
            violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        );
    }
}
