use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::BehaviorKind;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_behavior(value: &str) -> Result<BehaviorKind> {
    match value {
        "attentive" => Ok(BehaviorKind::Attentive),
        "inattentive" => Ok(BehaviorKind::Inattentive),
        "sleeping" => Ok(BehaviorKind::Sleeping),
        "hand_raised" => Ok(BehaviorKind::HandRaised),
        "using_phone" => Ok(BehaviorKind::UsingPhone),
        other => Err(anyhow!("unknown behavior label {other}")),
    }
}

pub fn encoding_to_blob(encoding: &[f64]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(encoding.len() * 8);
    for value in encoding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

pub fn encoding_from_blob(blob: &[u8]) -> Result<Vec<f64>> {
    if blob.len() % 8 != 0 {
        bail!("face encoding blob has invalid length {}", blob.len());
    }
    Ok(blob
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            f64::from_le_bytes(bytes)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_blob_round_trip() {
        let encoding: Vec<f64> = (0..128).map(|i| i as f64 / 128.0).collect();
        let blob = encoding_to_blob(&encoding);
        assert_eq!(blob.len(), 128 * 8);
        assert_eq!(encoding_from_blob(&blob).unwrap(), encoding);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let blob = encoding_to_blob(&[1.0, 2.0]);
        assert!(encoding_from_blob(&blob[..9]).is_err());
    }
}
