//! Normalizes the heterogeneous progress notations of the external tools
//! into percent-complete events.
//!
//! Five notations are recognized, tried in order per line:
//!
//! 1. `progress: NN%` / `Progress: NN%` / `process: NN%` (extraction and
//!    merge tools)
//! 2. a trailing `% complete`
//! 3. a parenthesized `(NN%) ` (audio specialist)
//! 4. a latched `Duration: HH:MM:SS.cc` followed by `time=` lines (general
//!    transcoder; percent = current/duration)
//! 5. a bare leading decimal `^\d+\.\d` (transport-stream muxer)
//!
//! Consecutive duplicate lines are suppressed before matching. Every
//! consumed line lands in the accumulated log regardless of whether it
//! carried progress.

use regex::Regex;

/// One normalized progress observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// Percent complete in [0, 100].
    pub percent: f32,
    /// True when the tool reported 0%, which callers display as an
    /// indeterminate marker rather than an empty bar.
    pub indeterminate: bool,
}

impl ProgressEvent {
    fn at(percent: f32) -> Self {
        let percent = percent.clamp(0.0, 100.0);
        Self {
            percent,
            indeterminate: percent == 0.0,
        }
    }
}

/// Stateful line-by-line progress parser for one tool invocation.
#[derive(Debug)]
pub struct ProgressParser {
    prev_line: String,
    duration_secs: f64,
    log: String,
    bare_decimal: Regex,
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressParser {
    pub fn new() -> Self {
        Self {
            prev_line: String::new(),
            duration_secs: 0.0,
            log: String::new(),
            bare_decimal: Regex::new(r"^\d+\.\d").expect("static regex"),
        }
    }

    /// Consume one raw output line, returning a progress event when the
    /// line matches any recognized notation.
    pub fn consume_line(&mut self, line: &str) -> Option<ProgressEvent> {
        if line.is_empty() || line == self.prev_line {
            return None;
        }
        self.prev_line = line.to_string();
        self.log.push_str(line);
        self.log.push('\n');

        if let Some(pct) = parse_prefixed_percent(line) {
            return Some(ProgressEvent::at(pct));
        }
        if let Some(pct) = parse_percent_complete(line) {
            return Some(ProgressEvent::at(pct));
        }
        if let Some(pct) = parse_parenthesized(line) {
            return Some(ProgressEvent::at(pct));
        }
        if line.contains("Duration:") {
            self.duration_secs = parse_duration_secs(line);
            return None;
        }
        if line.contains("time=") {
            if self.duration_secs != 0.0 {
                let current = parse_time_secs(line);
                return Some(ProgressEvent::at(
                    (current / self.duration_secs * 100.0) as f32,
                ));
            }
            return None;
        }
        if self.bare_decimal.is_match(line) {
            let numeric: String = line
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if let Ok(pct) = numeric.parse::<f32>() {
                return Some(ProgressEvent::at(pct));
            }
        }

        None
    }

    /// The log accumulated so far.
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Consume the parser, returning the full log.
    pub fn into_log(self) -> String {
        self.log
    }
}

/// `progress: NN%` / `Progress: NN%` / `process: NN%`.
fn parse_prefixed_percent(line: &str) -> Option<f32> {
    if !(line.contains("progress: ") || line.contains("Progress: ") || line.contains("process: "))
    {
        return None;
    }
    let after = &line[line.find(": ")? + 2..];
    let value = &after[..after.find('%')?];
    value.trim().parse().ok()
}

/// A trailing `% complete` with the number at line start.
fn parse_percent_complete(line: &str) -> Option<f32> {
    if !line.contains("% complete") {
        return None;
    }
    let value = &line[..line.find('%')?];
    value.trim().parse().ok()
}

/// A parenthesized `(NN%) `.
fn parse_parenthesized(line: &str) -> Option<f32> {
    if !line.contains("%) ") {
        return None;
    }
    let after = &line[line.find('(')? + 1..];
    let value = &after[..after.find('%')?];
    value.trim().parse().ok()
}

/// Seconds from a `Duration: HH:MM:SS.cc,` header line. 0.0 when
/// unparseable.
fn parse_duration_secs(line: &str) -> f64 {
    let Some(colon) = line.find(':') else {
        return 0.0;
    };
    let rest = &line[colon + 2..];
    let Some(comma) = rest.find(',') else {
        return 0.0;
    };
    parse_hms(&rest[..comma])
}

/// Seconds from a `time=HH:MM:SS.cc ` fragment. 0.0 when unparseable.
fn parse_time_secs(line: &str) -> f64 {
    let Some(eq) = line.find("time=") else {
        return 0.0;
    };
    let rest = &line[eq + "time=".len()..];
    let value = rest.split(' ').next().unwrap_or("");
    parse_hms(value)
}

/// Parse `HH:MM:SS(.frac)` or a bare seconds value.
fn parse_hms(value: &str) -> f64 {
    let parts: Vec<&str> = value.split(':').collect();
    match parts.len() {
        3 => {
            let h: f64 = parts[0].trim().parse().unwrap_or(0.0);
            let m: f64 = parts[1].trim().parse().unwrap_or(0.0);
            let s: f64 = parts[2].trim().parse().unwrap_or(0.0);
            h * 3600.0 + m * 60.0 + s
        }
        1 => parts[0].trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_tool_prefix() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("Progress: 42%").unwrap();
        assert_eq!(ev.percent, 42.0);
        assert!(!ev.indeterminate);

        let ev = p.consume_line("progress: 43%").unwrap();
        assert_eq!(ev.percent, 43.0);

        let ev = p.consume_line("process: 44%").unwrap();
        assert_eq!(ev.percent, 44.0);
    }

    #[test]
    fn percent_complete_suffix() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("12.5% complete").unwrap();
        assert_eq!(ev.percent, 12.5);
    }

    #[test]
    fn parenthesized_percent() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("analyze (33%) frame 1200").unwrap();
        assert_eq!(ev.percent, 33.0);
    }

    #[test]
    fn duration_then_time_ratio() {
        let mut p = ProgressParser::new();
        assert!(p
            .consume_line("  Duration: 00:02:00.00, start: 0.000000, bitrate: 1500 kb/s")
            .is_none());
        let ev = p
            .consume_line("frame=  720 fps= 24 q=28.0 size=1024kB time=00:00:30.00 bitrate=...")
            .unwrap();
        assert_eq!(ev.percent, 25.0);
    }

    #[test]
    fn time_without_duration_is_ignored() {
        let mut p = ProgressParser::new();
        assert!(p.consume_line("frame= 10 time=00:00:05.00").is_none());
    }

    #[test]
    fn bare_decimal_for_muxer() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("3.5").unwrap();
        assert_eq!(ev.percent, 3.5);
        // An integer without a decimal point is not progress.
        assert!(p.consume_line("42").is_none());
    }

    #[test]
    fn duplicate_consecutive_lines_suppressed() {
        let mut p = ProgressParser::new();
        assert!(p.consume_line("Progress: 10%").is_some());
        assert!(p.consume_line("Progress: 10%").is_none());
        assert!(p.consume_line("Progress: 11%").is_some());
        // Only two distinct lines reach the log.
        assert_eq!(p.log().lines().count(), 2);
    }

    #[test]
    fn zero_percent_is_indeterminate() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("Progress: 0%").unwrap();
        assert_eq!(ev.percent, 0.0);
        assert!(ev.indeterminate);
    }

    #[test]
    fn percent_clamped_to_valid_range() {
        let mut p = ProgressParser::new();
        let ev = p.consume_line("Progress: 104%").unwrap();
        assert_eq!(ev.percent, 100.0);
    }

    #[test]
    fn unrecognized_lines_only_logged() {
        let mut p = ProgressParser::new();
        assert!(p.consume_line("Track 1: extracting to 'video0.h264'").is_none());
        assert!(p.log().contains("Track 1"));
    }

    #[test]
    fn empty_lines_skipped() {
        let mut p = ProgressParser::new();
        assert!(p.consume_line("").is_none());
        assert!(p.log().is_empty());
    }
}
