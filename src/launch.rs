//! Hand files, folders and links to the operating system.

use std::ffi::{OsStr, OsString};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::{MsgReaderError, Result};

/// Link schemes that may be handed to the OS, compared case-insensitively.
const ALLOWED_LINK_PREFIXES: [&str; 3] = ["http://", "https://", "mailto:"];

/// Something that can open a path or URL with the user's default handler.
pub trait Launcher {
    /// Start opening `target`. Returns once the handler is launched, not when it exits.
    fn open(&self, target: &OsStr) -> std::io::Result<()>;
}

/// Opens targets with the platform's default handler through [`opener`], or
/// with a configured command.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    command: Option<String>,
}

impl SystemLauncher {
    /// Use `command` (program plus optional arguments, whitespace-separated)
    /// instead of the platform opener. Blank commands are ignored.
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }

    /// The configured command with `target` as its last argument, if one is set.
    fn configured_command(&self, target: &OsStr) -> Option<Command> {
        let mut parts = self.command.as_deref()?.split_whitespace();
        let mut cmd = Command::new(parts.next()?);
        cmd.args(parts).arg(target);
        Some(cmd)
    }
}

impl Launcher for SystemLauncher {
    fn open(&self, target: &OsStr) -> std::io::Result<()> {
        let Some(mut cmd) = self.configured_command(target) else {
            // never goes through a shell, so `&` or `|` in a link stays literal
            return opener::open(target).map_err(std::io::Error::other);
        };

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(pid = child.id(), target = ?target, "Launched configured opener");

        // Reap the opener in the background so it does not linger as a zombie.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Open `target` with `launcher`, mapping failures to [`MsgReaderError::Launch`].
pub fn launch(launcher: &impl Launcher, target: impl Into<OsString>) -> Result<()> {
    let target = target.into();
    launcher
        .open(&target)
        .map_err(|source| MsgReaderError::Launch {
            target: target.to_string_lossy().into_owned(),
            source,
        })?;
    info!(target = ?target, "Opened");
    Ok(())
}

/// Accept only `http://`, `https://` and `mailto:` links.
pub fn check_link(url: &str) -> Result<()> {
    let allowed = ALLOWED_LINK_PREFIXES.iter().any(|prefix| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    });
    if allowed {
        Ok(())
    } else {
        Err(MsgReaderError::LinkRejected(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        opened: RefCell<Vec<OsString>>,
    }

    impl Launcher for Recorder {
        fn open(&self, target: &OsStr) -> std::io::Result<()> {
            self.opened.borrow_mut().push(target.to_os_string());
            Ok(())
        }
    }

    struct Broken;

    impl Launcher for Broken {
        fn open(&self, _target: &OsStr) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no opener"))
        }
    }

    #[test]
    fn test_allowed_links() {
        assert!(check_link("https://example.com").is_ok());
        assert!(check_link("http://example.com/a?b=c").is_ok());
        assert!(check_link("mailto:someone@example.com").is_ok());
        assert!(check_link("HTTPS://EXAMPLE.COM").is_ok());
        assert!(check_link("MailTo:x@y.z").is_ok());
    }

    #[test]
    fn test_rejected_links() {
        for url in [
            "file:///etc/passwd",
            "javascript:alert(1)",
            "ftp://example.com",
            "",
            "http:/",
            " https://example.com",
            "data:text/html,hi",
        ] {
            assert!(
                matches!(check_link(url), Err(MsgReaderError::LinkRejected(_))),
                "{url:?} accepted"
            );
        }
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert!(check_link("héllo wörld").is_err());
    }

    #[test]
    fn test_launch_records_target() {
        let recorder = Recorder::default();
        launch(&recorder, "/tmp/scratch").unwrap();
        assert_eq!(recorder.opened.borrow().as_slice(), [OsString::from("/tmp/scratch")]);
    }

    #[test]
    fn test_launch_failure_is_reported() {
        let err = launch(&Broken, "/tmp/file.pdf").unwrap_err();
        match err {
            MsgReaderError::Launch { target, .. } => assert_eq!(target, "/tmp/file.pdf"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_command_uses_platform_opener() {
        let launcher = SystemLauncher::new(Some("   ".into()));
        assert!(launcher.command.is_none());
        assert!(launcher.configured_command(OsStr::new("/tmp/a.pdf")).is_none());
        assert!(SystemLauncher::default()
            .configured_command(OsStr::new("/tmp/a.pdf"))
            .is_none());
    }

    #[test]
    fn test_configured_command_arguments() {
        let launcher = SystemLauncher::new(Some("firefox --new-tab".into()));
        let cmd = launcher
            .configured_command(OsStr::new("https://example.com"))
            .unwrap();
        assert_eq!(cmd.get_program(), "firefox");
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, ["--new-tab", "https://example.com"]);
    }

    #[test]
    fn test_link_with_shell_metacharacters_is_one_target() {
        let url = "https://example.com/a?x=1&calc.exe&y=2|whoami";
        check_link(url).unwrap();

        let recorder = Recorder::default();
        launch(&recorder, url).unwrap();
        assert_eq!(recorder.opened.borrow().as_slice(), [OsString::from(url)]);

        let launcher = SystemLauncher::new(Some("browser".into()));
        let cmd = launcher.configured_command(OsStr::new(url)).unwrap();
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args, [url]);
    }
}
