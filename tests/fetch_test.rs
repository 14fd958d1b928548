//! Fetch runs against a fake downloader script.
//!
//! The script understands the same argument layout as the real tool
//! (`URL -f FMT -o TEMPLATE --no-check-certificate`) and picks its
//! behaviour from the URL.

#![cfg(unix)]

use adscope::media::{DownloadOutcome, DownloaderConfig, MediaError, MediaFetcher, TaskSpec};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn fake_downloader(dir: &Path, pid_file: &Path) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
url="$1"
out=""
while [ "$#" -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
target=$(printf '%s' "$out" | sed 's/%(ext)s/mp4/')
case "$url" in
  *fail*)
    echo "ERROR: Unsupported URL: $url" >&2
    exit 1
    ;;
  *silent*)
    exit 0
    ;;
  *linger*)
    printf 'finished video' > "$target"
    sleep 30 &
    echo $! > "{pid_file}"
    exit 0
    ;;
  *hang*)
    printf 'partial' > "$target.part"
    sleep 120 &
    echo $! > "{pid_file}"
    wait
    ;;
esac
printf 'fake video bytes for %s' "$url" > "$target"
"#,
        pid_file = pid_file.display()
    );
    let path = dir.join("fake-yt-dlp");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct Harness {
    _tools: tempfile::TempDir,
    out: tempfile::TempDir,
    pid_file: PathBuf,
    fetcher: MediaFetcher,
}

fn harness(timeout: Duration) -> Harness {
    let tools = tempfile::tempdir().unwrap();
    let pid_file = tools.path().join("grandchild.pid");
    let program = fake_downloader(tools.path(), &pid_file);
    let fetcher = MediaFetcher::new(DownloaderConfig {
        program: program.to_string_lossy().into_owned(),
        timeout,
        ..Default::default()
    });
    Harness {
        _tools: tools,
        out: tempfile::tempdir().unwrap(),
        pid_file,
        fetcher,
    }
}

/// Whether `pid` is a live (non-zombie) process.
fn is_alive(pid: i32) -> bool {
    let stat = match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat,
        Err(_) if Path::new("/proc/self").exists() => return false,
        Err(_) => return unsafe { libc::kill(pid, 0) } == 0,
    };
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

#[tokio::test]
async fn downloads_each_task_and_lists_directory() {
    let h = harness(Duration::from_secs(30));
    let specs = vec![
        TaskSpec::new("01_David", "https://fb.me/one"),
        TaskSpec::new("02_Maria", "https://fb.me/two"),
    ];

    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.succeeded(), 2);
    for (task, spec) in report.outcomes.iter().zip(&specs) {
        assert_eq!(task.name, spec.name);
        match &task.outcome {
            DownloadOutcome::Success { path, size } => {
                assert_eq!(path, &h.out.path().join(format!("{}.mp4", spec.name)));
                assert_eq!(*size, std::fs::metadata(path).unwrap().len());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    let names: Vec<&str> = report.manifest.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["01_David.mp4", "02_Maria.mp4"]);
    let expected = "fake video bytes for https://fb.me/one".len() as u64;
    assert_eq!(report.manifest[0].size, expected);
}

#[tokio::test]
async fn failure_keeps_stderr_and_does_not_stop_run() {
    let h = harness(Duration::from_secs(30));
    let specs = vec![
        TaskSpec::new("broken", "https://fb.me/fail"),
        TaskSpec::new("fine", "https://fb.me/ok"),
    ];

    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();

    assert_eq!(report.outcomes[0].name, "broken");
    match &report.outcomes[0].outcome {
        DownloadOutcome::Failed { reason } => {
            assert_eq!(reason, "ERROR: Unsupported URL: https://fb.me/fail")
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.outcomes[1].outcome.is_success());
    assert_eq!(report.manifest.len(), 1);
    assert_eq!(report.manifest[0].name, "fine.mp4");
}

#[tokio::test]
async fn timeout_kills_process_group_and_removes_partial_files() {
    let h = harness(Duration::from_secs(1));
    let specs = vec![
        TaskSpec::new("slow", "https://fb.me/hang"),
        TaskSpec::new("after", "https://fb.me/ok"),
    ];

    let started = Instant::now();
    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(30));

    assert_eq!(
        report.outcomes[0].outcome,
        DownloadOutcome::TimedOut { after_secs: 1 }
    );
    assert!(report.outcomes[1].outcome.is_success());
    assert!(!h.out.path().join("slow.mp4.part").exists());
    let names: Vec<&str> = report.manifest.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["after.mp4"]);

    let pid: i32 = std::fs::read_to_string(&h.pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while is_alive(pid) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!is_alive(pid), "grandchild {} survived the timeout", pid);
}

#[tokio::test]
async fn lingering_helper_does_not_turn_success_into_timeout() {
    let h = harness(Duration::from_secs(2));
    let specs = vec![TaskSpec::new("clip", "https://fb.me/linger")];

    let started = Instant::now();
    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(20));

    match &report.outcomes[0].outcome {
        DownloadOutcome::Success { path, size } => {
            assert_eq!(path, &h.out.path().join("clip.mp4"));
            assert_eq!(*size, "finished video".len() as u64);
        }
        other => panic!("expected success, got {:?}", other),
    }
    let names: Vec<&str> = report.manifest.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["clip.mp4"]);

    let pid: i32 = std::fs::read_to_string(&h.pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while is_alive(pid) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!is_alive(pid), "helper {} outlived the downloader", pid);
}

#[tokio::test]
async fn success_without_file_is_failure() {
    let h = harness(Duration::from_secs(30));
    let specs = vec![TaskSpec::new("ghost", "https://fb.me/silent")];

    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();
    assert!(matches!(
        &report.outcomes[0].outcome,
        DownloadOutcome::Failed { reason } if reason.contains("produced no file")
    ));
    assert!(report.manifest.is_empty());
}

#[tokio::test]
async fn refuses_to_overwrite_existing_file() {
    let h = harness(Duration::from_secs(30));
    std::fs::write(h.out.path().join("clip.mp4"), b"original").unwrap();

    let specs = vec![TaskSpec::new("clip", "https://fb.me/ok")];
    let report = h.fetcher.run(&specs, h.out.path()).await.unwrap();

    assert!(matches!(
        &report.outcomes[0].outcome,
        DownloadOutcome::Failed { reason } if reason.contains("clip.mp4")
    ));
    assert_eq!(
        std::fs::read(h.out.path().join("clip.mp4")).unwrap(),
        b"original"
    );
    assert_eq!(report.manifest.len(), 1);
}

#[tokio::test]
async fn missing_downloader_fails_every_task() {
    let out = tempfile::tempdir().unwrap();
    let fetcher = MediaFetcher::new(DownloaderConfig {
        program: "/nonexistent/adscope-downloader".to_string(),
        ..Default::default()
    });
    let specs = vec![
        TaskSpec::new("a", "https://fb.me/a"),
        TaskSpec::new("b", "https://fb.me/b"),
    ];

    let report = fetcher.run(&specs, out.path()).await.unwrap();
    assert_eq!(report.outcomes.len(), 2);
    for task in &report.outcomes {
        assert!(matches!(
            &task.outcome,
            DownloadOutcome::Failed { reason } if reason.starts_with("failed to start")
        ));
    }
}

#[tokio::test]
async fn creates_nested_output_directory() {
    let h = harness(Duration::from_secs(30));
    let nested = h.out.path().join("real_facebook_creatives").join("batch1");

    let report = h
        .fetcher
        .run(&[TaskSpec::new("x", "https://fb.me/x")], &nested)
        .await
        .unwrap();
    assert!(nested.is_dir());
    assert_eq!(report.manifest.len(), 1);
}

#[tokio::test]
async fn empty_task_list_only_lists_directory() {
    let h = harness(Duration::from_secs(30));
    std::fs::write(h.out.path().join("old.mp4"), b"1234").unwrap();
    std::fs::create_dir(h.out.path().join("subdir")).unwrap();

    let report = h.fetcher.run(&[], h.out.path()).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(report.manifest.len(), 1);
    assert_eq!(report.manifest[0].name, "old.mp4");
    assert_eq!(report.manifest[0].size, 4);
}

#[tokio::test]
async fn unusable_output_directory_is_fatal() {
    let h = harness(Duration::from_secs(30));
    let file = h.out.path().join("not-a-dir");
    std::fs::write(&file, b"").unwrap();

    let err = h
        .fetcher
        .run(&[TaskSpec::new("x", "https://fb.me/x")], &file.join("sub"))
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::CreateDir { .. }));
}
