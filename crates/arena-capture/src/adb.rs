use crate::{FrameSource, InputDevice};
use anyhow::{bail, Context, Result};
use arena_state::Point;
use image::DynamicImage;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_ADB_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Android device reached through the `adb` command-line tool.
///
/// Screenshots come from `exec-out screencap -p`; input goes through
/// `shell input`.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_path: PathBuf,
    device_id: Option<String>,
    timeout: Duration,
}

impl AdbDevice {
    pub fn new(adb_path: impl Into<PathBuf>, device_id: Option<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            device_id,
            timeout: DEFAULT_ADB_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Log the `adb devices` listing. Never fails; a missing device shows
    /// up later as capture errors.
    pub fn check_connection(&self) {
        match self.run(&["devices".to_string()]) {
            Ok(out) => {
                let listing = String::from_utf8_lossy(&out);
                let attached = listing
                    .lines()
                    .skip(1)
                    .filter(|l| l.trim_end().ends_with("device"))
                    .count();
                info!("adb sees {} attached device(s)", attached);
                debug!("adb devices:\n{}", listing.trim());
                if attached == 0 {
                    warn!("No device attached; captures will fail until one connects");
                }
            }
            Err(e) => warn!("Could not query adb devices: {:#}", e),
        }
    }

    /// Full argument list for `adb`, with the device selector prepended.
    fn args(&self, rest: &[String]) -> Vec<String> {
        let mut args = Vec::with_capacity(rest.len() + 2);
        if let Some(id) = &self.device_id {
            args.push("-s".to_string());
            args.push(id.clone());
        }
        args.extend(rest.iter().cloned());
        args
    }

    fn screencap_args() -> Vec<String> {
        ["exec-out", "screencap", "-p"].map(String::from).to_vec()
    }

    fn tap_args(at: Point) -> Vec<String> {
        vec![
            "shell".into(),
            "input".into(),
            "tap".into(),
            at.x.to_string(),
            at.y.to_string(),
        ]
    }

    fn swipe_args(from: Point, to: Point, duration: Duration) -> Vec<String> {
        vec![
            "shell".into(),
            "input".into(),
            "swipe".into(),
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration.as_millis().to_string(),
        ]
    }

    /// Run adb and return its stdout. Kills the child if it outlives the timeout.
    fn run(&self, rest: &[String]) -> Result<Vec<u8>> {
        let args = self.args(rest);
        debug!("{} {}", self.adb_path.display(), args.join(" "));

        let mut child = Command::new(&self.adb_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.adb_path.display()))?;

        // Drain both pipes on threads so a large screenshot or a chatty
        // error stream cannot fill a pipe and stall the child.
        let stdout = drain(child.stdout.take().context("adb stdout not captured")?);
        let stderr = drain(child.stderr.take().context("adb stderr not captured")?);

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().context("Failed to poll adb")? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                bail!("adb {} timed out after {:?}", rest.join(" "), self.timeout);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout).context("Failed to read adb output")?;
        let stderr = collect(stderr).context("Failed to read adb error output")?;

        if !status.success() {
            bail!(
                "adb {} failed ({}): {}",
                rest.join(" "),
                status,
                String::from_utf8_lossy(&stderr).trim()
            );
        }

        Ok(stdout)
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).map(|_| buf)
    })
}

fn collect(handle: Drain) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("pipe reader panicked"))?
        .map_err(Into::into)
}

impl FrameSource for AdbDevice {
    fn capture(&mut self) -> Result<DynamicImage> {
        let png = self.run(&Self::screencap_args())?;
        if png.is_empty() {
            bail!("screencap returned no data");
        }
        image::load_from_memory(&png).context("Failed to decode screencap PNG")
    }

    fn describe(&self) -> String {
        match &self.device_id {
            Some(id) => format!("adb device {}", id),
            None => "default adb device".to_string(),
        }
    }
}

impl InputDevice for AdbDevice {
    fn tap(&mut self, at: Point) -> Result<()> {
        self.run(&Self::tap_args(at))
            .with_context(|| format!("Tap at {} failed", at))?;
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<()> {
        self.run(&Self::swipe_args(from, to, duration))
            .with_context(|| format!("Swipe {} -> {} failed", from, to))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_without_device() {
        let adb = AdbDevice::new("adb", None);
        assert_eq!(
            adb.args(&AdbDevice::screencap_args()),
            vec!["exec-out", "screencap", "-p"]
        );
    }

    #[test]
    fn test_args_with_device() {
        let adb = AdbDevice::new("adb", Some("emulator-5554".into()));
        assert_eq!(
            adb.args(&AdbDevice::tap_args(Point::new(360, 500))),
            vec!["-s", "emulator-5554", "shell", "input", "tap", "360", "500"]
        );
    }

    #[test]
    fn test_swipe_args() {
        let args = AdbDevice::swipe_args(
            Point::new(150, 1100),
            Point::new(200, 900),
            Duration::from_millis(500),
        );
        assert_eq!(
            args,
            vec!["shell", "input", "swipe", "150", "1100", "200", "900", "500"]
        );
    }

    #[test]
    fn test_missing_binary_is_an_error() {
        let mut adb = AdbDevice::new("/nonexistent/adb", None).with_timeout(Duration::from_secs(1));
        assert!(adb.capture().is_err());
        assert!(adb.tap(Point::new(1, 1)).is_err());
        // Logs only.
        adb.check_connection();
    }

    #[test]
    fn test_describe() {
        assert_eq!(AdbDevice::new("adb", None).describe(), "default adb device");
        assert_eq!(
            AdbDevice::new("adb", Some("abc".into())).describe(),
            "adb device abc"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_stderr_does_not_stall() {
        let adb = AdbDevice::new("sh", None).with_timeout(Duration::from_secs(20));
        let out = adb
            .run(&[
                "-c".to_string(),
                "head -c 1000000 /dev/zero >&2; echo ok".to_string(),
            ])
            .unwrap();
        assert_eq!(out, b"ok\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_reports_stderr() {
        let adb = AdbDevice::new("sh", None);
        let err = adb
            .run(&["-c".to_string(), "echo no device >&2; exit 3".to_string()])
            .unwrap_err();
        assert!(format!("{:#}", err).contains("no device"));
    }
}
