mod report;
mod style;

pub use report::{
    format_reset_in, progress_line, render_report, write_failure, ReportSection, BAR_WIDTH,
};
pub use style::UsageLevel;
