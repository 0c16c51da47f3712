//! Split descriptors
//!
//! A split is one unit of parallel consumption: a topic partition and a
//! half-open offset range `[start_offset, end_offset)`. Splits arrive as
//! four string properties produced by an external planner.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tributary_core::{Error, Result};

/// Property holding the topic name
pub const TOPIC: &str = "topic";
/// Property holding the partition number
pub const PARTITION: &str = "partition";
/// Property holding the inclusive start offset
pub const START_OFFSET: &str = "start_offset";
/// Property holding the exclusive end offset
pub const END_OFFSET: &str = "end_offset";

/// Topic partition and offset range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitDescriptor {
    /// Topic name
    pub topic: String,
    /// Partition number
    pub partition: i32,
    /// First offset, inclusive
    pub start_offset: i64,
    /// Last offset, exclusive
    pub end_offset: i64,
}

impl SplitDescriptor {
    /// Create a descriptor, rejecting a range whose end precedes its start
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        start_offset: i64,
        end_offset: i64,
    ) -> Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(Error::missing_config(TOPIC));
        }
        if end_offset < start_offset {
            return Err(Error::invalid_input(format!(
                "split end offset {} precedes start offset {}",
                end_offset, start_offset
            )));
        }
        Ok(Self {
            topic,
            partition,
            start_offset,
            end_offset,
        })
    }

    /// Parse and validate the four split properties
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let topic = required(properties, TOPIC)?;
        let partition = parse_field(properties, PARTITION)?;
        let start_offset = parse_field(properties, START_OFFSET)?;
        let end_offset = parse_field(properties, END_OFFSET)?;
        Self::new(topic, partition, start_offset, end_offset)
    }

    /// Serialize back to split properties
    pub fn to_properties(&self) -> HashMap<String, String> {
        HashMap::from([
            (TOPIC.to_string(), self.topic.clone()),
            (PARTITION.to_string(), self.partition.to_string()),
            (START_OFFSET.to_string(), self.start_offset.to_string()),
            (END_OFFSET.to_string(), self.end_offset.to_string()),
        ])
    }

    /// Number of offsets covered
    pub fn len(&self) -> u64 {
        self.end_offset.abs_diff(self.start_offset)
    }

    /// Whether the range covers no offsets
    pub fn is_empty(&self) -> bool {
        self.end_offset == self.start_offset
    }
}

impl fmt::Display for SplitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}[{}..{})",
            self.topic, self.partition, self.start_offset, self.end_offset
        )
    }
}

fn required<'a>(properties: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    properties
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::MissingConfiguration {
            key: key.to_string(),
            location: "split properties".to_string(),
        })
}

fn parse_field<T>(properties: &HashMap<String, String>, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = required(properties, key)?;
    raw.trim()
        .parse()
        .map_err(|e| Error::invalid_input(format!("split field '{}'='{}': {}", key, raw, e)))
}
