use std::{error::Error, fmt};

use arcpath_core::LevelGrid;
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "arcpath";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "arcpath:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Level grid captured as a single-line string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LevelSnapshot {
    /// Length of the longest row.
    pub(crate) columns: u32,
    /// Number of rows.
    pub(crate) rows: u32,
    /// Textual rows of the level.
    pub(crate) grid: LevelGrid,
}

impl LevelSnapshot {
    /// Captures the provided grid.
    pub(crate) fn capture(grid: &LevelGrid) -> Result<Self, LayoutTransferError> {
        let dimensions = format!("{}x{}", grid.width(), grid.height());
        let columns = u32::try_from(grid.width())
            .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.clone()))?;
        let rows = u32::try_from(grid.height())
            .map_err(|_| LayoutTransferError::InvalidDimensions(dimensions.clone()))?;
        if columns == 0 || rows == 0 {
            return Err(LayoutTransferError::InvalidDimensions(dimensions));
        }
        Ok(Self {
            columns,
            rows,
            grid: grid.clone(),
        })
    }

    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            level: self.grid.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.columns, self.rows
        ))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        let matches = usize::try_from(columns).is_ok_and(|c| c == decoded.level.width())
            && usize::try_from(rows).is_ok_and(|r| r == decoded.level.height());
        if !matches {
            return Err(LayoutTransferError::DimensionMismatch {
                declared: dimensions.to_owned(),
                actual: format!("{}x{}", decoded.level.width(), decoded.level.height()),
            });
        }

        Ok(Self {
            columns,
            rows,
            grid: decoded.level,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableSnapshot {
    level: LevelGrid,
}

/// Errors that can occur while encoding or decoding level snapshots.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed or were empty.
    InvalidDimensions(String),
    /// The declared dimensions disagree with the decoded level.
    DimensionMismatch {
        /// Dimensions written in the header.
        declared: String,
        /// Dimensions of the decoded rows.
        actual: String,
    },
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "snapshot was empty"),
            Self::MissingPrefix => write!(f, "snapshot is missing the prefix"),
            Self::MissingVersion => write!(f, "snapshot is missing the version"),
            Self::MissingDimensions => write!(f, "snapshot is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "snapshot is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "snapshot prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "snapshot version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::DimensionMismatch { declared, actual } => {
                write!(f, "snapshot declares {declared} but holds a {actual} level")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode snapshot payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process snapshot payload: {error}")
            }
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;
    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
