//! Line-oriented event rendering.
//!
//! Each input line is decoded into an event (falling back to a plain-text
//! event when it does not parse), tagged, checked against the drop list,
//! and written as one output line. A line that fails to render is logged
//! and skipped; the stream keeps flowing.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use driftlog_codec::Codec;
use driftlog_event::{Event, Map, Value, json};
use tracing::{debug, warn};

use crate::config::RenderConfig;
use crate::error::RenderError;

/// Counters for one pass over the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Non-blank lines read.
    pub read: u64,
    /// Lines written.
    pub written: u64,
    /// Events cancelled by a drop tag.
    pub dropped: u64,
    /// Events that failed to render.
    pub failed: u64,
}

/// Decodes, tags, and re-renders events line by line.
#[derive(Debug)]
pub struct Renderer {
    input: Box<dyn Codec>,
    output: Box<dyn Codec>,
    mapping: Option<BTreeMap<String, String>>,
    tags: Vec<String>,
    drop_tags: Vec<String>,
}

impl Renderer {
    /// Build a renderer from loaded configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            input: config.input.codec.build(None),
            output: config.output.codec.build(config.output.format.clone()),
            mapping: config.output.mapping.clone(),
            tags: config.tags.clone(),
            drop_tags: config.drop_tags.clone(),
        }
    }

    /// Decode one line into a tagged event, cancelled if it carries a
    /// drop tag. Blank lines yield `None`.
    pub fn decode(&self, line: &str) -> Option<Event> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }

        let mut event = self.input.decode(line);
        for tag in &self.tags {
            event.tag(tag);
        }
        if event
            .tags()
            .iter()
            .any(|tag| self.drop_tags.iter().any(|drop| drop.as_str() == *tag))
        {
            event.cancel();
        }
        Some(event)
    }

    /// Render one event as an output line.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if a format string or the output codec
    /// fails for this event.
    pub fn render(&self, event: &Event) -> Result<String, RenderError> {
        let Some(mapping) = &self.mapping else {
            return Ok(self.output.encode(event)?);
        };

        let mut body = Map::new();
        for (key, template) in mapping {
            body.insert(key.clone(), Value::from(event.sprintf(template)?));
        }
        Ok(json::encode_object(&body)?)
    }

    /// Render every line of `reader` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if reading or writing fails. Events
    /// that fail to render are counted in [`RunStats::failed`] instead.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<RunStats, RenderError> {
        let mut stats = RunStats::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let Some(event) = self.decode(&line) else {
                continue;
            };
            stats.read = stats.read.saturating_add(1);

            if event.is_cancelled() {
                debug!(line_number = index.saturating_add(1), "event dropped by tag");
                stats.dropped = stats.dropped.saturating_add(1);
                continue;
            }

            match self.render(&event) {
                Ok(rendered) => {
                    writeln!(writer, "{rendered}")?;
                    stats.written = stats.written.saturating_add(1);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        line_number = index.saturating_add(1),
                        "failed to render event, skipping"
                    );
                    stats.failed = stats.failed.saturating_add(1);
                }
            }
        }
        writer.flush()?;
        Ok(stats)
    }
}
