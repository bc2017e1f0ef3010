//! Bounded invocation of external media tools.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::MediaError;

/// Longest stderr tail carried into an error message.
const STDERR_TAIL: usize = 512;

/// Run `bin` with `args`, failing on spawn error, timeout or non-zero exit.
///
/// The child is killed if the returned future is dropped.
pub(crate) async fn run<I, A>(
    tool: &'static str,
    bin: &Path,
    args: I,
    limit: Duration,
) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let mut command = Command::new(bin);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(tool, bin = %bin.display(), "running media tool");

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| MediaError::Timeout { tool, after: limit })?
        .map_err(|e| MediaError::Tool {
            tool,
            detail: format!("spawn: {e}"),
        })?;

    if !output.status.success() {
        return Err(MediaError::Tool {
            tool,
            detail: format!("{}: {}", output.status, stderr_tail(&output.stderr)),
        });
    }
    Ok(output)
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let mut start = text.len().saturating_sub(STDERR_TAIL);
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_tail_is_bounded() {
        let long = "x".repeat(STDERR_TAIL * 2);
        assert_eq!(stderr_tail(long.as_bytes()).len(), STDERR_TAIL);
        assert_eq!(stderr_tail(b"  short \n"), "short");
    }

    #[tokio::test]
    async fn missing_binary_is_tool_error() {
        let err = run(
            "ffprobe",
            Path::new("/nonexistent/vidvault-no-such-tool"),
            ["-version"],
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::Tool { tool: "ffprobe", .. }));
    }
}
