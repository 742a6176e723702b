use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Append-only sink for user-facing status text.
pub trait Progress: Send + Sync {
    fn print_info(&self, message: &str);
    fn print_warn(&self, message: &str);
}

/// Discards everything.
pub struct NullProgress;

impl Progress for NullProgress {
    fn print_info(&self, _message: &str) {}
    fn print_warn(&self, _message: &str) {}
}

/// Writes styled status lines to stderr.
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn print_info(&self, message: &str) {
        eprintln!("  {message}");
    }

    fn print_warn(&self, message: &str) {
        eprintln!("  {} {message}", Style::new().yellow().bold().apply_to("WARNING:"));
    }
}

/// Routes status text through a running spinner so lines don't tear it.
pub struct SpinnerProgress {
    pb: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(pb: ProgressBar) -> Self {
        Self { pb }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.pb
    }
}

impl Progress for SpinnerProgress {
    fn print_info(&self, message: &str) {
        self.pb.println(format!("  {message}"));
    }

    fn print_warn(&self, message: &str) {
        self.pb.println(format!(
            "  {} {message}",
            Style::new().yellow().bold().apply_to("WARNING:")
        ));
    }
}

pub fn stage_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} {msg}")
            .expect("invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

pub fn finish_spinner(pb: &ProgressBar, success: bool) {
    if success {
        pb.finish_with_message(format!("✓ {}", pb.message()));
    } else {
        pb.finish_with_message(format!("✗ {}", pb.message()));
    }
}
