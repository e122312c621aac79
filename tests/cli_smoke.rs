use std::process::Command;

#[test]
fn help_displays_overview() {
    let binary = env!("CARGO_BIN_EXE_stock-dashboard");
    let output = Command::new(binary)
        .arg("--help")
        .output()
        .expect("invoke stock-dashboard --help");

    assert!(output.status.success(), "help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Mock stock analysis dashboard service"),
        "expected overview text in help output"
    );
}

#[test]
fn screen_prints_a_page_of_results() {
    let binary = env!("CARGO_BIN_EXE_stock-dashboard");
    let output = Command::new(binary)
        .args(["screen", "--count", "40", "--seed", "7", "--page-size", "5"])
        .output()
        .expect("invoke stock-dashboard screen");

    assert!(output.status.success(), "screen command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("matching of 40 records"),
        "expected pagination footer, got:\n{stdout}"
    );
}

#[test]
fn summary_reports_recommendation_buckets() {
    let binary = env!("CARGO_BIN_EXE_stock-dashboard");
    let output = Command::new(binary)
        .args(["summary", "--count", "60", "--seed", "7"])
        .output()
        .expect("invoke stock-dashboard summary");

    assert!(output.status.success(), "summary command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Market summary (60 stocks)"));
    assert!(stdout.contains("strong buy"));
}
