use std::process::Command;

fn run_headless(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_transit_sim"))
        .args(args)
        .env("RUST_LOG", "warn,transit_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the simulation runs in headless mode without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_headless(&["--ticks", "400"]);

    assert!(
        output.status.success(),
        "Simulation failed to run in headless mode. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that passenger statistics are logged
#[test]
fn test_simulation_statistics_logged() {
    let output = run_headless(&["--ticks", "400"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for key in ["Passengers spawned:", "Passengers departed:", "Left behind:", "Hubs:"] {
        assert!(stderr.contains(key), "Missing '{}' statistic", key);
    }
}

/// Turning transit off mid-run tears the hub down cleanly
#[test]
fn test_simulation_survives_disable() {
    let output = run_headless(&["--ticks", "300", "--disable-at", "150"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Transit disabled"), "Teardown was not logged");
    assert!(stderr.contains("Hubs: 0"), "Hub survived teardown");
}
