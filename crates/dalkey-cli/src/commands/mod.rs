pub mod cache;
pub mod install;
pub mod remove;
pub mod upgrade;

use std::time::Duration;

/// Short human duration: "412ms" or "3.2s".
pub fn format_duration(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
