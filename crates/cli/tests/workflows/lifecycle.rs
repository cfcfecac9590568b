//! Startup, shutdown and exit-code behavior

use crate::common::WatchCommand;
use anyhow::Result;
use nix::sys::signal::Signal;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_no_argument_prints_usage_and_exits_1() -> Result<()> {
    let dir = TempDir::new()?;
    let result = WatchCommand::new(dir.path()).execute()?;

    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stdout("Usage:"));
    assert!(result.contains_stdout("pathwatch"));
    assert!(!result.contains_stdout("PID "));
    Ok(())
}

#[test]
fn test_missing_path_exits_with_enoent() -> Result<()> {
    let dir = TempDir::new()?;
    let missing = dir.path().join("does-not-exist");

    let result = WatchCommand::new(dir.path()).arg_path(&missing).execute()?;

    assert_eq!(result.exit_code, nix::errno::Errno::ENOENT as i32);
    assert!(result.contains_stderr("inotify_add_watch \""));
    assert!(result.contains_stderr(&missing.display().to_string()));
    assert!(result.contains_stderr("(0x2) - No such file or directory"));

    // The channel was opened, so it is still closed on the way out
    assert!(result.contains_stdout("Closing inotify file descriptor 0x"));
    assert!(!result.contains_stdout("Closing inotify watch descriptor"));
    assert!(!result.contains_stdout("PID "));
    Ok(())
}

#[test]
fn test_sigint_stops_cleanly() -> Result<()> {
    let dir = TempDir::new()?;
    let watch = WatchCommand::new(dir.path()).arg_path(dir.path()).spawn()?;

    assert!(watch.banner.contains(&format!("monitoring \"{}\"", dir.path().display())));
    assert!(watch.banner.contains("with inotify file descriptor 0x"));
    assert!(watch.banner.contains("and inotify watch descriptor 0x1."));

    let result = watch.stop_with(Signal::SIGINT)?;

    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.contains_stdout("\nReceived signal.\n"));

    let lines: Vec<&str> = result.stdout.lines().collect();
    let tail = &lines[lines.len() - 2..];
    assert_eq!(tail[0], "Closing inotify watch descriptor 0x1.");
    assert!(tail[1].starts_with("Closing inotify file descriptor 0x"));
    Ok(())
}

#[test]
fn test_sigterm_stops_cleanly() -> Result<()> {
    let dir = TempDir::new()?;
    let watch = WatchCommand::new(dir.path()).arg_path(dir.path()).spawn()?;

    let result = watch.stop_with(Signal::SIGTERM)?;

    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);
    assert!(result.contains_stdout("Received signal."));
    assert!(result.contains_stdout("Closing inotify watch descriptor 0x1."));
    assert!(result.contains_stdout("Closing inotify file descriptor 0x"));
    Ok(())
}

#[test]
fn test_dot_watches_working_directory() -> Result<()> {
    let dir = TempDir::new()?;
    let watch = WatchCommand::new(dir.path()).args(&["."]).spawn()?;

    let cwd = fs::canonicalize(dir.path())?;
    assert!(
        watch.banner.contains(&format!("\"{}\"", cwd.display()))
            || watch.banner.contains(&format!("\"{}\"", dir.path().display())),
        "banner: {}",
        watch.banner
    );

    let result = watch.stop_with(Signal::SIGINT)?;
    assert!(result.success());
    Ok(())
}

#[test]
fn test_lost_watch_reports_cleanup_failure() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("victim.txt");
    fs::write(&file, b"x")?;

    let watch = WatchCommand::new(dir.path()).arg_path(&file).spawn()?;
    fs::remove_file(&file)?;
    let result = watch.stop_with(Signal::SIGINT)?;

    // The kernel already dropped the watch, so detaching it fails
    assert!(result.contains_stdout("IN_DELETE_SELF"));
    assert!(result.contains_stdout("IN_IGNORED"));
    assert_eq!(result.exit_code, nix::errno::Errno::EINVAL as i32);
    assert!(result.contains_stderr("inotify_rm_watch 0x1: (0x16)"));
    assert!(result.contains_stdout("Closing inotify file descriptor 0x"));
    Ok(())
}

#[test]
fn test_invalid_buffer_records_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let result = WatchCommand::new(dir.path())
        .args(&["--buffer-records", "0"])
        .arg_path(dir.path())
        .execute()?;

    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("pathwatch:"));
    assert!(result.contains_stderr("buffer_records"));
    assert!(!result.contains_stdout("PID "));
    Ok(())
}

#[test]
fn test_unreadable_config_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let config = dir.path().join("pathwatch.toml");
    fs::write(&config, "format = \"yaml\"\n")?;

    let result = WatchCommand::new(dir.path())
        .args(&["--config"])
        .arg_path(&config)
        .arg_path(dir.path())
        .execute()?;

    assert_eq!(result.exit_code, 1);
    assert!(result.contains_stderr("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_log_file_receives_diagnostics() -> Result<()> {
    let dir = TempDir::new()?;
    let log = dir.path().join("logs").join("pathwatch.log");
    let watched = dir.path().join("watched");
    fs::create_dir(&watched)?;

    let watch = WatchCommand::new(dir.path())
        .args(&["--log-level", "info", "--log-file"])
        .arg_path(&log)
        .arg_path(&watched)
        .spawn()?;
    let result = watch.stop_with(Signal::SIGINT)?;

    assert!(result.success());
    let contents = fs::read_to_string(&log)?;
    assert!(contents.contains("watch attached"));
    // Nothing from the subscriber leaks onto the event stream
    assert!(!result.contains_stdout("INFO"));
    Ok(())
}
