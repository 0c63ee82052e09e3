//! `/states/all` payload parsing.
//!
//! OpenSky sends each state vector as a positional JSON array. Records are
//! shape-checked here and turned into named `StateVector`s; anything that
//! does not fit is a `MalformedResponse`, never a panic.
//!
//! Positions used: 0 icao24, 1 callsign, 2 origin_country, 3 time_position,
//! 5 longitude, 6 latitude, 7 baro_altitude.

use serde_json::Value;

use crate::types::{FeedError, Result, StateResponse, StateVector};

/// Minimum number of entries a record needs for the positions we read.
pub const MIN_RECORD_LEN: usize = 8;

const IDX_ICAO: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_COUNTRY: usize = 2;
const IDX_TIME_POSITION: usize = 3;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_ALTITUDE: usize = 7;

/// Parse a raw response body.
pub fn parse_states(body: &str) -> Result<StateResponse> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FeedError::MalformedResponse(format!("invalid JSON: {e}")))?;
    parse_states_value(&value)
}

/// Parse an already-decoded response.
///
/// A missing `states` key is malformed; `"states": null` is how the API says
/// "no aircraft" and yields an empty list.
pub fn parse_states_value(value: &Value) -> Result<StateResponse> {
    let obj = value
        .as_object()
        .ok_or_else(|| FeedError::MalformedResponse("top level is not an object".into()))?;

    let states = obj
        .get("states")
        .ok_or_else(|| FeedError::MalformedResponse("missing \"states\" field".into()))?;

    let time = obj.get("time").and_then(Value::as_i64);

    let records = match states {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_record(i, item))
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(FeedError::MalformedResponse(
                "\"states\" is not an array".into(),
            ))
        }
    };

    Ok(StateResponse {
        time,
        states: records,
    })
}

fn parse_record(index: usize, item: &Value) -> Result<StateVector> {
    let fields = item
        .as_array()
        .ok_or_else(|| malformed(index, "record is not an array"))?;
    if fields.len() < MIN_RECORD_LEN {
        return Err(malformed(
            index,
            &format!("expected at least {MIN_RECORD_LEN} fields, got {}", fields.len()),
        ));
    }

    Ok(StateVector {
        icao24: required_str(index, fields, IDX_ICAO, "icao24")?,
        callsign: optional_str(index, fields, IDX_CALLSIGN, "callsign")?,
        origin_country: required_str(index, fields, IDX_COUNTRY, "origin_country")?,
        time_position: optional_int(index, fields, IDX_TIME_POSITION, "time_position")?,
        longitude: optional_f64(index, fields, IDX_LONGITUDE, "longitude")?,
        latitude: optional_f64(index, fields, IDX_LATITUDE, "latitude")?,
        baro_altitude: optional_f64(index, fields, IDX_ALTITUDE, "baro_altitude")?,
    })
}

fn malformed(index: usize, what: &str) -> FeedError {
    FeedError::MalformedResponse(format!("state #{index}: {what}"))
}

fn required_str(index: usize, fields: &[Value], pos: usize, name: &str) -> Result<String> {
    fields[pos]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(index, &format!("{name} must be a string")))
}

fn optional_str(index: usize, fields: &[Value], pos: usize, name: &str) -> Result<Option<String>> {
    match &fields[pos] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err(malformed(index, &format!("{name} must be a string or null"))),
    }
}

fn optional_int(index: usize, fields: &[Value], pos: usize, name: &str) -> Result<Option<i64>> {
    match &fields[pos] {
        Value::Null => Ok(None),
        v => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| malformed(index, &format!("{name} must be an integer or null"))),
    }
}

fn optional_f64(index: usize, fields: &[Value], pos: usize, name: &str) -> Result<Option<f64>> {
    match &fields[pos] {
        Value::Null => Ok(None),
        v => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(index, &format!("{name} must be a number or null"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
