//! Desktop notification senders

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use curfew_host_api::{CommandRunner, CommandSpec, NotificationSender};

/// App identity used for Windows toasts. PowerShell's own AUMID is always
/// registered, so toasts raised under it are not silently dropped.
pub const TOAST_APP_ID: &str =
    r"{1AC14E77-02E7-4E5D-B744-2EB1AE5198B7}\WindowsPowerShell\v1.0\powershell.exe";

/// Quote a string as an AppleScript string literal
pub fn applescript_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Quote a string as a PowerShell single-quoted literal
pub fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The AppleScript `display notification` statement
pub fn applescript_notification(title: &str, message: &str) -> String {
    format!(
        "display notification {} with title {}",
        applescript_quote(message),
        applescript_quote(title)
    )
}

/// PowerShell script raising a two-line toast
pub fn powershell_toast_script(title: &str, message: &str) -> String {
    [
        "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] | Out-Null".to_string(),
        "$template = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02)".to_string(),
        "$text = $template.GetElementsByTagName('text')".to_string(),
        format!(
            "$text.Item(0).AppendChild($template.CreateTextNode({})) | Out-Null",
            powershell_quote(title)
        ),
        format!(
            "$text.Item(1).AppendChild($template.CreateTextNode({})) | Out-Null",
            powershell_quote(message)
        ),
        "$toast = [Windows.UI.Notifications.ToastNotification]::new($template)".to_string(),
        format!(
            "[Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier({}).Show($toast)",
            powershell_quote(TOAST_APP_ID)
        ),
    ]
    .join("; ")
}

/// Linux: `notify-send`
pub struct LinuxNotifier {
    runner: Arc<dyn CommandRunner>,
}

impl LinuxNotifier {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl NotificationSender for LinuxNotifier {
    async fn dispatch_notification(&self, title: &str, message: &str) {
        let spec = CommandSpec::new("notify-send").args(["--", title, message]);
        match self.runner.run_checked(&spec).await {
            Ok(_) => debug!(title, "Notification shown"),
            Err(e) => warn!(error = %e, "Failed to show notification"),
        }
    }
}

/// macOS: `osascript -e 'display notification ...'`
pub struct MacosNotifier {
    runner: Arc<dyn CommandRunner>,
}

impl MacosNotifier {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl NotificationSender for MacosNotifier {
    async fn dispatch_notification(&self, title: &str, message: &str) {
        let spec = CommandSpec::new("osascript")
            .arg("-e")
            .arg(applescript_notification(title, message));
        match self.runner.run_checked(&spec).await {
            Ok(_) => debug!(title, "Notification shown"),
            Err(e) => warn!(error = %e, "Failed to show notification"),
        }
    }
}

/// Windows: PowerShell toast, falling back to `msg *`
pub struct WindowsNotifier {
    runner: Arc<dyn CommandRunner>,
}

impl WindowsNotifier {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl NotificationSender for WindowsNotifier {
    async fn dispatch_notification(&self, title: &str, message: &str) {
        let toast = CommandSpec::new("powershell").args([
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            powershell_toast_script(title, message),
        ]);
        let err = match self.runner.run_checked(&toast).await {
            Ok(_) => {
                debug!(title, "Toast shown");
                return;
            }
            Err(e) => e,
        };
        warn!(error = %err, "Toast failed, falling back to msg");

        let fallback = CommandSpec::new("msg").args(["*".to_string(), format!("{}: {}", title, message)]);
        if let Err(e) = self.runner.run_checked(&fallback).await {
            warn!(error = %e, "Failed to show notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curfew_host_api::{ScriptedOutcome, ScriptedRunner};

    #[test]
    fn applescript_escaping() {
        assert_eq!(applescript_quote("plain"), "\"plain\"");
        assert_eq!(
            applescript_quote(r#"say "hi" \ bye"#),
            r#""say \"hi\" \\ bye""#
        );
        assert_eq!(
            applescript_notification("Shutdown Reminder", "It's late"),
            r#"display notification "It's late" with title "Shutdown Reminder""#
        );
    }

    #[test]
    fn powershell_escaping() {
        assert_eq!(powershell_quote("it's"), "'it''s'");
        let script = powershell_toast_script("T", "don't \"wait\"");
        assert!(script.contains("CreateTextNode('don''t \"wait\"')"));
        assert!(script.contains("CreateToastNotifier('{1AC14E77"));
    }

    #[tokio::test]
    async fn linux_passes_text_as_arguments() {
        let runner = ScriptedRunner::new();
        let notifier = LinuxNotifier::new(Arc::new(runner.clone()));

        notifier
            .dispatch_notification("Shutdown Reminder", "$(rm -rf ~); `x`")
            .await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "notify-send");
        assert_eq!(
            calls[0].args,
            vec!["--", "Shutdown Reminder", "$(rm -rf ~); `x`"]
        );
    }

    #[tokio::test]
    async fn macos_builds_osascript_call() {
        let runner = ScriptedRunner::new();
        let notifier = MacosNotifier::new(Arc::new(runner.clone()));

        notifier.dispatch_notification("Title", "Body").await;

        let calls = runner.calls();
        assert_eq!(calls[0].program, "osascript");
        assert_eq!(calls[0].args[0], "-e");
        assert_eq!(
            calls[0].args[1],
            r#"display notification "Body" with title "Title""#
        );
    }

    #[tokio::test]
    async fn windows_falls_back_to_msg() {
        let toast_line = CommandSpec::new("powershell")
            .args([
                "-NoProfile".to_string(),
                "-NonInteractive".to_string(),
                "-Command".to_string(),
                powershell_toast_script("Title", "Body"),
            ])
            .to_string();
        let runner = ScriptedRunner::new().on(&toast_line, ScriptedOutcome::Exit(1));
        let notifier = WindowsNotifier::new(Arc::new(runner.clone()));

        notifier.dispatch_notification("Title", "Body").await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].program, "msg");
        assert_eq!(calls[1].args, vec!["*", "Title: Body"]);
    }

    #[tokio::test]
    async fn windows_toast_success_skips_fallback() {
        let runner = ScriptedRunner::new();
        let notifier = WindowsNotifier::new(Arc::new(runner.clone()));

        notifier.dispatch_notification("Title", "Body").await;
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn failures_never_propagate() {
        let runner = ScriptedRunner::new().on(
            "notify-send -- Title Body",
            ScriptedOutcome::SpawnError,
        );
        let notifier = LinuxNotifier::new(Arc::new(runner.clone()));

        // Returns unit regardless
        notifier.dispatch_notification("Title", "Body").await;
        assert_eq!(runner.calls().len(), 1);
    }
}
