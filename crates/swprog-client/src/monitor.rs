//! Terminal rendering for the `swprog` monitor.
//!
//! Pure: turns progress events into text for stdout and reports when an update
//! run finishes. The binary owns all I/O.

use swprog_protocol::{ByteOrder, ProgressEvent, RecoveryStatus, SourceType};

/// Columns in the progress bar.
pub const BAR_LEN: usize = 60;

const RESET: &str = "\x1b[0m";
const SUCCESS_COLOR: &str = "\x1b[1;32;40m";
const FAILURE_COLOR: &str = "\x1b[4;31;40m";

#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorOptions {
    pub quiet: bool,
    pub color: bool,
    pub byte_order: ByteOrder,
}

/// Output for one event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Set when the event closes an update run (SUCCESS or FAILURE).
    pub finished: Option<RecoveryStatus>,
}

/// Tracks one update run at a time: idle until START/RUN, then renders steps
/// until SUCCESS or FAILURE, then idle again.
#[derive(Debug)]
pub struct Monitor {
    opts: MonitorOptions,
    waiting: bool,
    cur_step: u32,
}

impl Monitor {
    pub fn new(opts: MonitorOptions) -> Self {
        Self {
            opts,
            waiting: true,
            cur_step: 0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn on_progress(&mut self, ev: &ProgressEvent) -> Rendered {
        let mut out = Rendered::default();
        let status = ev.recovery_status();

        if self.waiting && matches!(status, Some(RecoveryStatus::Start | RecoveryStatus::Run)) {
            out.text.push_str(&format!(
                "\n\nUpdate started !\nInterface: {}\n\n",
                interface_label(ev.source)
            ));
            self.cur_step = 0;
            self.waiting = false;
        }

        if ev.infolen > 0 {
            out.text.push_str(&format!("INFO : {}\r", ev.info));
        }

        if !self.waiting && ev.cur_step > 0 {
            if !self.opts.quiet {
                if ev.cur_step != self.cur_step && self.cur_step != 0 {
                    out.text.push('\n');
                }
                let total = ev.dwl_bytes_total(self.opts.byte_order);
                out.text.push_str(&format!(
                    "[ {} ] {} of {} {}% ({}), dwl {}% of {} bytes\r",
                    progress_bar(ev.cur_percent, BAR_LEN),
                    ev.cur_step,
                    ev.nsteps,
                    ev.cur_percent,
                    ev.cur_image,
                    ev.dwl_percent,
                    total
                ));
            }
            self.cur_step = ev.cur_step;
        }

        match status {
            Some(s @ (RecoveryStatus::Success | RecoveryStatus::Failure)) => {
                if self.opts.color {
                    out.text.push_str(if s == RecoveryStatus::Success {
                        SUCCESS_COLOR
                    } else {
                        FAILURE_COLOR
                    });
                }
                out.text.push_str(&format!("\n{} !\n", s.as_str()));
                if self.opts.color {
                    out.text.push_str(RESET);
                }
                out.finished = Some(s);
                self.waiting = true;
            }
            Some(RecoveryStatus::Done) => out.text.push_str("\nDONE.\n\n"),
            _ => {}
        }

        out
    }
}

/// `len` columns: `=` for the completed share, `-` for the rest. Percent is
/// clamped to 100.
pub fn progress_bar(percent: u32, len: usize) -> String {
    let filled = len * percent.min(100) as usize / 100;
    let mut bar = "=".repeat(filled);
    bar.push_str(&"-".repeat(len - filled));
    bar
}

fn interface_label(source: u32) -> &'static str {
    match SourceType::from_ordinal(source) {
        Some(SourceType::Suricatta) => "BACKEND",
        Some(other) => other.as_str(),
        None => swprog_protocol::UNKNOWN_NAME,
    }
}
