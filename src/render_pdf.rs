//! PDF rendering via the external `wkhtmltopdf` process.
//!
//! The renderer is spawned directly (no shell) with a fixed argument vector.
//! Its stdout and stderr are drained on background threads into one ordered
//! log, and the process is killed once the configured timeout elapses.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::arguments::{Arguments, build_arguments};
use crate::config::{PdfSettings, absolutize};
use crate::outcome::{RenderOutcome, RenderStatus};
use crate::tool::ToolLocator;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long output is still collected after the renderer has exited.
const EXIT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs the renderer for one HTML page.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    locator: ToolLocator,
    working_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(locator: ToolLocator, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            locator,
            working_dir: working_dir.into(),
        }
    }

    /// Render `html_file` to `output_file`.
    ///
    /// Creates the output directory if needed, then runs the renderer. Every
    /// failure is reported through the returned outcome:
    ///
    /// - [`RenderStatus::ToolNotFound`] when no executable resolves
    /// - [`RenderStatus::IoFailure`] when the output directory cannot be
    ///   created or the process cannot be started
    /// - [`RenderStatus::ToolTimedOut`] when `pdf.timeout` elapses; the
    ///   process is killed and any partial output file removed
    /// - [`RenderStatus::ToolNonZeroExit`] with the exit code otherwise
    pub fn invoke(&self, html_file: &Path, output_file: &Path, pdf: &PdfSettings) -> RenderOutcome {
        let started_at = Instant::now();
        let html_file = absolutize(html_file, &self.working_dir);
        let output_file = absolutize(output_file, &self.working_dir);

        let executable = match self
            .locator
            .locate(pdf.renderer_path.as_deref(), &self.working_dir)
        {
            Ok(path) => path,
            Err(err) => {
                error!(
                    target = "markdown_pdf::render_pdf",
                    op = "render_pdf::invoke",
                    result = "tool_not_found",
                    error = %err,
                    "Renderer executable not found"
                );
                return RenderOutcome::failure(RenderStatus::ToolNotFound, err.to_string());
            }
        };

        if let Some(out_dir) = output_file.parent() {
            if let Err(err) = fs::create_dir_all(out_dir) {
                error!(
                    target = "markdown_pdf::render_pdf",
                    op = "render_pdf::invoke",
                    result = "error",
                    error_code = "create_output_dir",
                    error = %err,
                    "Failed to create output directory"
                );
                return RenderOutcome::failure(
                    RenderStatus::IoFailure,
                    format!(
                        "failed to create output directory '{}': {err}",
                        out_dir.display()
                    ),
                );
            }
        }

        let args = build_arguments(&html_file, &output_file, pdf);
        debug!(
            target = "markdown_pdf::render_pdf",
            op = "render_pdf::invoke",
            executable = %executable.display(),
            "Run html to pdf converter: {} {}",
            executable.display(),
            args
        );

        let outcome = match execute(&executable, &args, pdf.timeout) {
            Execution::Exited { status, output } => exit_outcome(status, output),
            Execution::TimedOut { output } => {
                remove_partial_output(&output_file);
                RenderOutcome::failure(
                    RenderStatus::ToolTimedOut,
                    format!(
                        "renderer did not finish within {}s and was terminated",
                        pdf.timeout.as_secs_f64()
                    ),
                )
                .with_output(output)
            }
            Execution::Failed { error, output } => RenderOutcome::failure(
                RenderStatus::IoFailure,
                format!("failed to run '{}': {error}", executable.display()),
            )
            .with_output(output),
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if outcome.is_success() {
            info!(
                target = "markdown_pdf::render_pdf",
                op = "render_pdf::invoke",
                result = "success",
                elapsed_ms,
                output_file = %output_file.display(),
                "PDF rendered"
            );
        } else {
            warn!(
                target = "markdown_pdf::render_pdf",
                op = "render_pdf::invoke",
                result = "error",
                elapsed_ms,
                status = ?outcome.status,
                exit_code = outcome.exit_code,
                "Renderer invocation failed"
            );
        }

        outcome
    }
}

fn exit_outcome(status: ExitStatus, output: String) -> RenderOutcome {
    match status.code() {
        Some(0) => RenderOutcome::success(output),
        Some(code) => RenderOutcome::failure(
            RenderStatus::ToolNonZeroExit,
            format!("Error creating pdf document. Exit code: {code}"),
        )
        .with_exit_code(code)
        .with_output(output),
        None => RenderOutcome::failure(
            RenderStatus::ToolNonZeroExit,
            format!("renderer terminated without an exit code ({status})"),
        )
        .with_output(output),
    }
}

fn remove_partial_output(output_file: &Path) {
    match fs::remove_file(output_file) {
        Ok(()) => debug!(
            target = "markdown_pdf::render_pdf",
            path = %output_file.display(),
            "Removed partial output after timeout"
        ),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            target = "markdown_pdf::render_pdf",
            path = %output_file.display(),
            error = %err,
            "Failed to remove partial output after timeout"
        ),
    }
}

#[derive(Debug)]
enum Execution {
    Exited { status: ExitStatus, output: String },
    TimedOut { output: String },
    Failed { error: std::io::Error, output: String },
}

/// Spawn `program`, collect its combined output and wait at most `timeout`.
fn execute(program: &Path, args: &Arguments, timeout: Duration) -> Execution {
    let mut child = match Command::new(program)
        .args(args.as_slice())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(error) => {
            return Execution::Failed {
                error,
                output: String::new(),
            };
        }
    };

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone());
    }
    drop(tx);

    // Readers are never joined: a grandchild may hold the pipes open after
    // the renderer itself is gone.
    let deadline = Instant::now() + timeout;
    let mut lines = Vec::new();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                drain(&rx, &mut lines, deadline.min(Instant::now() + EXIT_DRAIN_GRACE));
                return Execution::Exited {
                    status,
                    output: lines.join("\n"),
                };
            }
            Ok(None) => {}
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                lines.extend(rx.try_iter());
                return Execution::Failed {
                    error,
                    output: lines.join("\n"),
                };
            }
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            lines.extend(rx.try_iter());
            return Execution::TimedOut {
                output: lines.join("\n"),
            };
        }

        receive(&rx, &mut lines);
    }
}

/// Wait up to one poll interval for output.
fn receive(rx: &Receiver<String>, lines: &mut Vec<String>) {
    match rx.recv_timeout(POLL_INTERVAL) {
        Ok(line) => {
            lines.push(line);
            lines.extend(rx.try_iter());
        }
        Err(RecvTimeoutError::Timeout) => {}
        Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
    }
}

/// Collect output until every writer has closed its pipe or `until` passes.
fn drain(rx: &Receiver<String>, lines: &mut Vec<String>, until: Instant) {
    loop {
        let remaining = until.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(line) => lines.push(line),
            Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                lines.extend(rx.try_iter());
                return;
            }
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn make_executable(path: &Path) {
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("set perms");
    }

    fn write_script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-wkhtmltopdf");
        fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
        make_executable(&path);
        path
    }

    fn renderer(dir: &TempDir) -> PdfRenderer {
        PdfRenderer::new(ToolLocator::new().with_path_var(""), dir.path())
    }

    fn pdf_settings(script: PathBuf) -> PdfSettings {
        PdfSettings {
            renderer_path: Some(script),
            ..PdfSettings::default()
        }
    }

    #[test]
    #[serial]
    fn success_writes_output_and_collects_log() {
        let dir = TempDir::new().expect("temp dir");
        let args_log = dir.path().join("args.log");
        let script = write_script(
            &dir,
            &format!(
                r#"printf '%s\n' "$@" > "{args}"
echo "Loading pages (1/6)"
echo "Printing pages (6/6)" >&2
for last; do :; done
printf '%%PDF-1.4 fake' > "$last"
"#,
                args = args_log.display()
            ),
        );

        let html = dir.path().join("in.html");
        fs::write(&html, "<p>hi</p>").expect("write html");
        let output = dir.path().join("nested/out/doc.pdf");

        let outcome = renderer(&dir).invoke(&html, &output, &pdf_settings(script));

        assert_eq!(outcome.status, RenderStatus::Success, "{outcome:?}");
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.output.contains("Loading pages (1/6)"), "{}", outcome.output);
        assert!(outcome.output.contains("Printing pages (6/6)"), "{}", outcome.output);
        assert_eq!(fs::read(&output).expect("pdf written"), b"%PDF-1.4 fake");

        let args = fs::read_to_string(&args_log).expect("args log");
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args.first(), Some(&"--image-dpi"));
        assert_eq!(args[args.len() - 3], "page");
        assert_eq!(args[args.len() - 2], html.to_str().expect("utf-8 path"));
        assert_eq!(args[args.len() - 1], output.to_str().expect("utf-8 path"));
    }

    #[test]
    #[serial]
    fn non_zero_exit_carries_code_and_output() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "echo \"boom\" >&2\nexit 42\n");

        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf_settings(script),
        );

        assert_eq!(outcome.status, RenderStatus::ToolNonZeroExit);
        assert_eq!(outcome.exit_code, Some(42));
        assert!(outcome.output.contains("boom"), "stderr not captured: {}", outcome.output);
        assert!(outcome.message.as_deref().unwrap_or_default().contains("42"));
    }

    #[test]
    #[serial]
    fn timeout_kills_the_process() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "echo started\nexec sleep 30\n");
        let pdf = PdfSettings {
            timeout: Duration::from_millis(300),
            ..pdf_settings(script)
        };

        let started_at = Instant::now();
        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf,
        );

        assert_eq!(outcome.status, RenderStatus::ToolTimedOut);
        assert_eq!(outcome.exit_code, None);
        assert!(
            started_at.elapsed() < Duration::from_secs(10),
            "timeout did not fire promptly: {:?}",
            started_at.elapsed()
        );
        assert!(!dir.path().join("out.pdf").exists());
    }

    #[test]
    #[serial]
    fn background_helper_holding_pipes_does_not_outlive_timeout() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "echo done\nsleep 20 &\nexit 0\n");
        let pdf = PdfSettings {
            timeout: Duration::from_secs(1),
            ..pdf_settings(script)
        };

        let started_at = Instant::now();
        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf,
        );

        assert_eq!(outcome.status, RenderStatus::Success, "{outcome:?}");
        assert!(outcome.output.contains("done"), "{}", outcome.output);
        assert!(
            started_at.elapsed() < Duration::from_secs(5),
            "waited on the background helper: {:?}",
            started_at.elapsed()
        );
    }

    #[test]
    #[serial]
    fn output_drain_after_exit_is_bounded_under_long_timeout() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "sleep 20 &\nexit 0\n");

        let started_at = Instant::now();
        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf_settings(script),
        );

        assert!(outcome.is_success(), "{outcome:?}");
        assert!(
            started_at.elapsed() < EXIT_DRAIN_GRACE + Duration::from_secs(5),
            "waited on the background helper: {:?}",
            started_at.elapsed()
        );
    }

    #[test]
    #[serial]
    fn unexecutable_renderer_is_an_io_failure() {
        let dir = TempDir::new().expect("temp dir");
        let script = dir.path().join("not-executable");
        fs::write(&script, "#!/bin/sh\nexit 0\n").expect("write script");

        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf_settings(script.clone()),
        );

        assert_eq!(outcome.status, RenderStatus::IoFailure);
        let message = outcome.message.expect("message");
        assert!(message.contains("not-executable"), "got: {message}");
    }

    #[test]
    fn missing_renderer_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &PdfSettings::default(),
        );

        assert_eq!(outcome.status, RenderStatus::ToolNotFound);
        let message = outcome.message.expect("message");
        for name in ToolLocator::executable_names() {
            assert!(message.contains(&name), "{name} missing from: {message}");
        }
        assert!(!dir.path().join("out.pdf").exists());
    }

    #[test]
    #[serial]
    fn output_order_is_preserved_per_stream() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "for i in 1 2 3 4 5; do echo \"line $i\"; done\n");

        let outcome = renderer(&dir).invoke(
            &dir.path().join("in.html"),
            &dir.path().join("out.pdf"),
            &pdf_settings(script),
        );

        assert!(outcome.is_success(), "{outcome:?}");
        assert_eq!(outcome.output, "line 1\nline 2\nline 3\nline 4\nline 5");
    }
}
