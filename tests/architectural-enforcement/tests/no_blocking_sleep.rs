//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code must not block a thread with `std::thread::sleep`.
//! Word pacing goes through the reveal clock, frame limiting through
//! `tokio::time::sleep`.

use architectural_enforcement::{find_in_production, workspace_root};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let root = workspace_root();
    let mut violations = Vec::new();
    for dir in ["conductor/core/src", "conductor/cli/src", "tui/src"] {
        violations.extend(find_in_production(&root.join(dir), "thread::sleep"));
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking sleep calls found in production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse the reveal clock or tokio::time instead.");

        panic!(
            "\nFound {} sleep violation(s) in production code.",
            violations.len()
        );
    }
}
