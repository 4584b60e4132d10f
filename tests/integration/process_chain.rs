//! Process transport: one OS process per generation

use super::cli::run;

fn process(expression: &str) -> std::process::Output {
    run(&["--transport", "process", expression])
}

#[test]
fn test_process_chain_converts() {
    for (infix, postfix) in [
        ("a - b - c", "a b - c -"),
        ("( a + b ) * c", "a b + c *"),
        ("ab + c", "ab c +"),
        ("a + b * c", "a b c * +"),
    ] {
        let output = process(infix);
        assert!(output.status.success(), "{}", infix);
        assert_eq!(String::from_utf8_lossy(&output.stdout), format!("{}\n", postfix));
    }
}

#[test]
fn test_process_chain_single_token() {
    let output = process("x");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x\n");
}

#[test]
fn test_process_chain_spawns_one_generation_per_step() {
    let output = run(&["--transport", "process", "--verbose", "a * b"]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let started = stderr.matches("worker started").count();
    assert_eq!(started, 4, "{}", stderr);
}

#[test]
fn test_process_chain_failure_is_reported_once() {
    let output = process("( a + b");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.lines().count(), 1, "{}", stderr);
    assert!(stderr.contains("generation 5"), "{}", stderr);
    assert!(stderr.contains("without matching `)`"), "{}", stderr);
}

/// A worker's stdout stays open until it exits, so a parent only sees the
/// result after its child has finished.
#[test]
fn test_process_chain_child_finishes_before_parent_relays() {
    let output = run(&["--transport", "process", "--verbose", "a * b"]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let position = |message: &str, generation: &str| {
        stderr
            .lines()
            .position(|line| line.contains(message) && line.contains(generation))
            .unwrap_or_else(|| panic!("no `{}` for {}:\n{}", message, generation, stderr))
    };
    let child_finished = position("worker finished", "generation=2");
    let parent_relays = position("relaying result", "generation=1");
    assert!(child_finished < parent_relays, "{}", stderr);
}
