pub mod report_day;

pub use report_day::{previous_business_day, ReportDates};
