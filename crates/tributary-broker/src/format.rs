//! Payload formats and value deserializer selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::props;
use tributary_core::{Error, PropertyBag, Result};

/// String codec used for keys and text payloads
pub const STRING_DESERIALIZER: &str = "org.apache.kafka.common.serialization.StringDeserializer";
/// Schema-registry codec used for Avro and Protobuf payloads
pub const SCHEMA_REGISTRY_DESERIALIZER: &str =
    "com.amazonaws.services.schemaregistry.deserializers.GlueSchemaRegistryKafkaDeserializer";

/// Encoding of topic values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// JSON text
    Json,
    /// Delimited text
    Csv,
    /// Avro via schema registry
    Avro,
    /// Protobuf via schema registry
    Protobuf,
    /// Opaque text
    String,
}

impl PayloadFormat {
    /// Canonical lowercase name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Avro => "avro",
            Self::Protobuf => "protobuf",
            Self::String => "string",
        }
    }

    /// Value deserializer class for this format
    pub const fn value_deserializer(self) -> &'static str {
        match self {
            Self::Json | Self::Csv | Self::String => STRING_DESERIALIZER,
            Self::Avro | Self::Protobuf => SCHEMA_REGISTRY_DESERIALIZER,
        }
    }

    /// Set the value deserializer and any codec-specific properties
    pub fn apply_value_deserializer(self, properties: &mut PropertyBag) {
        properties.set(props::VALUE_DESERIALIZER, self.value_deserializer());
        match self {
            Self::Avro => {
                properties.set(props::AVRO_RECORD_TYPE, "GENERIC_RECORD");
            }
            Self::Protobuf => {
                properties.set(props::PROTOBUF_MESSAGE_TYPE, "DYNAMIC_MESSAGE");
            }
            Self::Json | Self::Csv | Self::String => {}
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "avro" => Ok(Self::Avro),
            "protobuf" => Ok(Self::Protobuf),
            "string" | "text" => Ok(Self::String),
            _ => Err(Error::UnsupportedPayloadFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tributary_core::ErrorCode;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("JSON".parse::<PayloadFormat>().unwrap(), PayloadFormat::Json);
        assert_eq!(" Avro ".parse::<PayloadFormat>().unwrap(), PayloadFormat::Avro);
        assert_eq!("text".parse::<PayloadFormat>().unwrap(), PayloadFormat::String);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "parquet".parse::<PayloadFormat>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedPayloadFormat);
        assert!(err.to_string().contains("parquet"));
    }

    #[test]
    fn test_text_formats_use_string_codec() {
        for format in [PayloadFormat::Json, PayloadFormat::Csv, PayloadFormat::String] {
            let mut properties = PropertyBag::new();
            format.apply_value_deserializer(&mut properties);
            assert_eq!(properties.get(props::VALUE_DESERIALIZER), Some(STRING_DESERIALIZER));
            assert_eq!(properties.len(), 1);
        }
    }

    #[test]
    fn test_schema_registry_formats() {
        let mut properties = PropertyBag::new();
        PayloadFormat::Avro.apply_value_deserializer(&mut properties);
        assert_eq!(
            properties.get(props::VALUE_DESERIALIZER),
            Some(SCHEMA_REGISTRY_DESERIALIZER)
        );
        assert_eq!(properties.get(props::AVRO_RECORD_TYPE), Some("GENERIC_RECORD"));
        assert!(!properties.contains_key(props::PROTOBUF_MESSAGE_TYPE));

        let mut properties = PropertyBag::new();
        PayloadFormat::Protobuf.apply_value_deserializer(&mut properties);
        assert_eq!(
            properties.get(props::PROTOBUF_MESSAGE_TYPE),
            Some("DYNAMIC_MESSAGE")
        );
        assert!(!properties.contains_key(props::AVRO_RECORD_TYPE));
    }
}
