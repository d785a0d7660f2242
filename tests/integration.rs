use std::{
    env, fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn run_bin(args: &[&str]) -> Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_wattlens"));

    Command::new(bin)
        .args(args)
        .output()
        .expect("failed to execute command")
}

fn assert_success(args: &[&str]) -> String {
    let output = run_bin(args);

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );

    stdout_str.to_string()
}

fn setup_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);

    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    test_dir
}

fn write_inputs(test_dir: &Path) {
    let config_contents = String::new()
        + "[weekday]\n"
        + "readings = \"meter-report.csv\"\n"
        + "timestamp_column = \"date\"\n"
        + "\n"
        + "[outliers]\n"
        + "forecast = \"forecast.csv\"\n"
        + "observed = \"observed.csv\"\n"
        + "window_start = \"2000-01-02\"\n"
        + "window_end = \"2000-01-05\"\n"
        + "preview_rows = 3\n"
        + "\n"
        + "[chart]\n"
        + "width = 640\n"
        + "height = 480\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    // 2016-01-04 is a Monday.
    let readings = String::new()
        + "date,consumption\n"
        + "2016-01-04,10\n"
        + "2016-01-05,5\n"
        + "2016-01-11,20\n"
        + "2016-01-18,30\n"
        + "2016-01-19,\n";
    fs::write(test_dir.join("meter-report.csv"), readings).expect("failed to write readings");

    let forecast = String::new()
        + "ds,trend,yhat_lower,yhat_upper,yhat\n"
        + "2000-01-01,0,5,15,10\n"
        + "2000-01-02,0,5,15,10\n"
        + "2000-01-03,0,5,15,10\n"
        + "2000-01-04,0,5,15,10\n"
        + "2000-01-05,0,5,15,10\n"
        + "2000-01-06,0,5,15,10\n";
    fs::write(test_dir.join("forecast.csv"), forecast).expect("failed to write forecast");

    let observed = String::new()
        + "ds,y\n"
        + "2000-01-01,10\n"
        + "2000-01-02,20\n"
        + "2000-01-03,15\n"
        + "2000-01-04,1\n"
        + "1999-12-31,7\n";
    fs::write(test_dir.join("observed.csv"), observed).expect("failed to write observed");
}

#[test]
fn basic_workflow() {
    // Glob metacharacters in the directory name must not affect clean.
    let test_dir = setup_dir("basic_workflow [x]");
    write_inputs(&test_dir);

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let stdout = assert_success(&["--work-dir", test_dir_str, "weekday"]);
    let lines: Vec<_> = stdout.lines().collect();
    assert!(lines[1].starts_with("Monday"), "unexpected report:\n{stdout}");
    assert!(lines[2].starts_with("Tuesday"), "unexpected report:\n{stdout}");

    let report = fs::read_to_string(test_dir.join("weekday-report.csv"))
        .expect("failed to read weekday report");
    let rows: Vec<_> = report.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("Monday,0,20.0,10.0,3"));
    assert!(rows[2].starts_with("Tuesday,1,5.0,NaN,1"));
    assert!(test_dir.join("weekday-chart.svg").is_file());

    let stdout = assert_success(&["--work-dir", test_dir_str, "outliers"]);
    assert_eq!(stdout.lines().count(), 4, "unexpected preview:\n{stdout}");

    let outliers = fs::read_to_string(test_dir.join("outliers-report.csv"))
        .expect("failed to read outliers report");
    let outlier_col: Vec<_> = outliers
        .lines()
        .skip(1)
        .map(|line| line.rsplit(',').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(outlier_col, ["", "20.0", "", "1.0", "", ""]);
    assert!(test_dir.join("outliers-chart.svg").is_file());

    // Same input, same output.
    assert_success(&["--work-dir", test_dir_str, "outliers"]);
    let rerun = fs::read_to_string(test_dir.join("outliers-report.csv"))
        .expect("failed to read outliers report");
    assert_eq!(rerun, outliers);

    assert_success(&["--work-dir", test_dir_str, "clean"]);
    assert!(!test_dir.join("weekday-report.csv").exists());
    assert!(!test_dir.join("weekday-chart.svg").exists());
    assert!(!test_dir.join("outliers-report.csv").exists());
    assert!(!test_dir.join("outliers-chart.svg").exists());
    assert!(test_dir.join("meter-report.csv").exists());
    assert!(test_dir.join("forecast.csv").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn missing_section_fails() {
    let test_dir = setup_dir("missing_section_fails");
    fs::write(test_dir.join("config.toml"), "").expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--work-dir", test_dir_str, "weekday"]);
    assert!(!output.status.success());

    let output = run_bin(&["--work-dir", test_dir_str, "outliers"]);
    assert!(!output.status.success());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn empty_window_writes_nothing() {
    let test_dir = setup_dir("empty_window_writes_nothing");
    write_inputs(&test_dir);

    let config_contents = String::new()
        + "[outliers]\n"
        + "forecast = \"forecast.csv\"\n"
        + "observed = \"observed.csv\"\n"
        + "window_start = \"2010-01-01\"\n";
    fs::write(test_dir.join("config.toml"), config_contents).expect("failed to write config file");

    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--work-dir", test_dir_str, "outliers"]);
    assert!(!output.status.success());
    assert!(!test_dir.join("outliers-report.csv").exists());
    assert!(!test_dir.join("outliers-chart.svg").exists());

    fs::remove_dir_all(&test_dir).ok();
}
