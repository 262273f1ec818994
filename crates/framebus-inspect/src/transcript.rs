//! Transcript screening.
//!
//! A transcript is JSON Lines, one raw inbound notification per line:
//!
//! ```text
//! {"origin": "https://ads.example.net", "data": "{\"type\":\"init.dfp\",\"data\":{}}"}
//! {"origin": "https://evil.example",    "data": {"type": "init.dfp"}}
//! ```
//!
//! `data` is normally the raw string exactly as the channel delivered it.
//! A non-string `data` is re-serialized to JSON first, which is handy when
//! writing transcripts by hand.

use std::fmt;
use std::io::{BufRead, Write};

use anyhow::Context as _;
use framebus_core::infrastructure::FrameHandle;
use framebus_core::{Admitted, InboundMessage, MessageBus, Rejection};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One line of a transcript.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptLine {
    pub origin: String,
    pub data: Value,
}

impl TranscriptLine {
    /// The payload as the channel would have delivered it.
    pub fn raw_data(&self) -> String {
        match &self.data {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Parses one transcript line.  Blank lines yield `None`.
pub fn parse_line(text: &str) -> anyhow::Result<Option<TranscriptLine>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let line = serde_json::from_str(text).context("expected {\"origin\": ..., \"data\": ...}")?;
    Ok(Some(line))
}

/// Formats a screening verdict the way the CLI prints it.
pub fn verdict_text(verdict: &Result<Admitted, Rejection>) -> String {
    match verdict {
        Ok(admitted) => format!(
            "admitted {} ns={}",
            admitted.envelope.kind, admitted.namespace
        ),
        Err(rejection) => format!("rejected {rejection}"),
    }
}

/// Counts per verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub admitted: usize,
    pub rejected_origin: usize,
    pub rejected_malformed: usize,
    pub rejected_namespace: usize,
    pub rejected_not_listening: usize,
    pub unreadable: usize,
}

impl Summary {
    fn record(&mut self, verdict: &Result<Admitted, Rejection>) {
        match verdict {
            Ok(_) => self.admitted += 1,
            Err(Rejection::Origin) => self.rejected_origin += 1,
            Err(Rejection::Malformed) => self.rejected_malformed += 1,
            Err(Rejection::Namespace) => self.rejected_namespace += 1,
            Err(Rejection::NotListening) => self.rejected_not_listening += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_origin
            + self.rejected_malformed
            + self.rejected_namespace
            + self.rejected_not_listening
    }

    pub fn total(&self) -> usize {
        self.admitted + self.rejected() + self.unreadable
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines: {} admitted, {} rejected (origin={}, malformed={}, namespace={}, not-listening={}), {} unreadable",
            self.total(),
            self.admitted,
            self.rejected(),
            self.rejected_origin,
            self.rejected_malformed,
            self.rejected_namespace,
            self.rejected_not_listening,
            self.unreadable
        )
    }
}

/// Screens every line of `input` against `bus`, writing one verdict per
/// non-blank line to `out`, followed by the summary.
///
/// Unreadable lines are reported with their 1-based line number and do not
/// stop the run.
///
/// # Errors
///
/// Returns an error only if reading `input` or writing `out` fails.
pub fn screen_transcript<R, W>(
    bus: &MessageBus<FrameHandle>,
    input: R,
    mut out: W,
) -> anyhow::Result<Summary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = Summary::default();

    for (index, line) in input.lines().enumerate() {
        let number = index + 1;
        let text = line.with_context(|| format!("failed to read transcript line {number}"))?;

        let entry = match parse_line(&text) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                summary.unreadable += 1;
                writeln!(out, "line {number}: error: {e:#}")?;
                continue;
            }
        };

        let message = InboundMessage::new(entry.raw_data(), entry.origin, None);
        let verdict = bus.inspect(&message);
        debug!(line = number, origin = %message.origin, verdict = %verdict_text(&verdict));
        summary.record(&verdict);
        writeln!(out, "line {number}: {}", verdict_text(&verdict))?;
    }

    writeln!(out, "{summary}")?;
    Ok(summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use framebus_core::infrastructure::{FrameHub, LocalEventBus};
    use framebus_core::BusConfig;
    use std::sync::Arc;

    fn bus(config: &BusConfig) -> MessageBus<FrameHandle> {
        let hub = FrameHub::new();
        let frame = hub.open(config.self_origin.clone());
        MessageBus::from_config(Arc::new(frame), Arc::new(LocalEventBus::new()), config).unwrap()
    }

    fn dfp_config() -> BusConfig {
        BusConfig {
            self_origin: "https://www.example.com".to_string(),
            allowed_origins: vec!["ads.example.net".to_string()],
            namespaces: vec!["dfp".to_string()],
        }
    }

    fn run(transcript: &str) -> (Summary, String) {
        run_with(&dfp_config(), transcript)
    }

    fn run_with(config: &BusConfig, transcript: &str) -> (Summary, String) {
        let mut out = Vec::new();
        let summary = screen_transcript(&bus(config), transcript.as_bytes(), &mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_line_skips_blank_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_line_rejects_missing_fields() {
        assert!(parse_line(r#"{"origin":"x"}"#).is_err());
    }

    #[test]
    fn test_raw_data_keeps_strings_verbatim() {
        let line = parse_line(r#"{"origin":"o","data":"{\"type\":\"a.dfp\"}"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.raw_data(), r#"{"type":"a.dfp"}"#);
    }

    #[test]
    fn test_raw_data_serializes_objects() {
        let line = parse_line(r#"{"origin":"o","data":{"type":"a.dfp"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(line.raw_data(), r#"{"type":"a.dfp"}"#);
    }

    #[test]
    fn test_screen_transcript_reports_each_verdict() {
        // Arrange
        let transcript = r#"{"origin":"https://ads.example.net","data":"{\"type\":\"init.dfp\"}"}
{"origin":"https://evil.example","data":"{\"type\":\"init.dfp\"}"}

{"origin":"https://ads.example.net","data":"{broken"}
{"origin":"https://ads.example.net","data":{"type":"init.gtm"}}
this is not json
"#;

        // Act
        let (summary, output) = run(transcript);

        // Assert
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "line 1: admitted init.dfp ns=dfp");
        assert_eq!(lines[1], "line 2: rejected origin");
        assert_eq!(lines[2], "line 4: rejected malformed");
        assert_eq!(lines[3], "line 5: rejected namespace");
        assert!(lines[4].starts_with("line 6: error:"));
        assert_eq!(
            summary,
            Summary {
                admitted: 1,
                rejected_origin: 1,
                rejected_malformed: 1,
                rejected_namespace: 1,
                rejected_not_listening: 0,
                unreadable: 1,
            }
        );
        assert_eq!(
            lines[5],
            "5 lines: 1 admitted, 3 rejected (origin=1, malformed=1, namespace=1, not-listening=0), 1 unreadable"
        );
    }

    #[test]
    fn test_self_origin_and_null_are_admitted() {
        let transcript = r#"{"origin":"https://www.example.com","data":"{\"type\":\"a.dfp\"}"}
{"origin":"null","data":"{\"type\":\"ping.postMessage\"}"}
"#;

        let (summary, output) = run(transcript);

        assert_eq!(summary.admitted, 2);
        assert!(output.contains("line 2: admitted ping.postMessage ns=postMessage"));
    }

    #[test]
    fn test_bus_without_namespaces_rejects_everything() {
        // Arrange: no namespaces, so the bus never attaches to the channel
        let config = BusConfig {
            namespaces: Vec::new(),
            ..dfp_config()
        };
        let transcript = r#"{"origin":"https://www.example.com","data":"{\"type\":\"ping.postMessage\"}"}
{"origin":"https://ads.example.net","data":"{\"type\":\"init.dfp\"}"}
"#;

        // Act
        let (summary, output) = run_with(&config, transcript);

        // Assert
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "line 1: rejected not-listening");
        assert_eq!(lines[1], "line 2: rejected not-listening");
        assert_eq!(summary.admitted, 0);
        assert_eq!(summary.rejected_not_listening, 2);
        assert_eq!(summary.rejected(), 2);
    }

    #[test]
    fn test_empty_transcript_prints_only_summary() {
        let (summary, output) = run("");
        assert_eq!(summary.total(), 0);
        assert_eq!(output.lines().count(), 1);
    }
}
