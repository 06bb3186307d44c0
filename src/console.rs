// Console related functions and styling
// (c) 2024 Ross Younger

use indicatif::ProgressStyle;

// 11111111111111111111111111111111111111111111111111111111111111111111111111111111
// ⠋ Test 12 [00:00:41]
// ⠋ Next test at 03:04:05 PM [00:01:12]
// 11111111111111111111111111111111111111111111111111111111111111111111111111111111

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} [{elapsed_precise:.dim}]";

pub(crate) fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
