use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::features::EncodeError;

/// Layout of the `datetime-local` input the form submits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub const FIELD_DATE: &str = "date";
pub const FIELD_POWER_LEVEL_START: &str = "powerLevelStart";
pub const FIELD_BATTERY_CAPACITY: &str = "batteryCapacity";
pub const FIELD_CHARGER_TYPE: &str = "chargerType";
pub const FIELD_CHARGING_POWER: &str = "chargingPower";
pub const FIELD_TEMPERATURE: &str = "temperature";

/// Where the car was plugged in. The first four variants are the categories
/// the model was trained on; anything else is carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParkingType {
    Airport,
    CityParkingLot,
    MiniChargingStation,
    OfficeSpace,
    Other(String),
}

impl ParkingType {
    pub const KNOWN: [ParkingType; 4] = [
        ParkingType::Airport,
        ParkingType::CityParkingLot,
        ParkingType::MiniChargingStation,
        ParkingType::OfficeSpace,
    ];

    /// Exact, case-sensitive match against the trained labels.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Airport" => ParkingType::Airport,
            "city parking lot" => ParkingType::CityParkingLot,
            "mini charging station" => ParkingType::MiniChargingStation,
            "office space" => ParkingType::OfficeSpace,
            other => ParkingType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ParkingType::Airport => "Airport",
            ParkingType::CityParkingLot => "city parking lot",
            ParkingType::MiniChargingStation => "mini charging station",
            ParkingType::OfficeSpace => "office space",
            ParkingType::Other(label) => label,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ParkingType::Other(_))
    }
}

/// One charging session as submitted by the form, already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSessionInput {
    pub timestamp: NaiveDateTime,
    pub power_level_start: f64,
    pub battery_capacity: f64,
    pub charger_type: ParkingType,
    pub charging_power: f64,
    pub temperature: f64,
}

impl ChargingSessionInput {
    /// Build from raw name -> string fields (form body or flattened JSON).
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, EncodeError> {
        let date = required(fields, FIELD_DATE)?;
        let timestamp = NaiveDateTime::parse_from_str(date, TIMESTAMP_FORMAT).map_err(|source| {
            EncodeError::InvalidTimestamp {
                value: date.to_string(),
                source,
            }
        })?;

        Ok(Self {
            timestamp,
            power_level_start: number(fields, FIELD_POWER_LEVEL_START)?,
            battery_capacity: number(fields, FIELD_BATTERY_CAPACITY)?,
            charger_type: ParkingType::from_label(required(fields, FIELD_CHARGER_TYPE)?),
            charging_power: number(fields, FIELD_CHARGING_POWER)?,
            temperature: number(fields, FIELD_TEMPERATURE)?,
        })
    }
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    name: &'static str,
) -> Result<&'a str, EncodeError> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or(EncodeError::MissingField(name))
}

fn number(fields: &HashMap<String, String>, name: &'static str) -> Result<f64, EncodeError> {
    let raw = required(fields, name)?;
    let invalid = || EncodeError::InvalidNumber {
        field: name,
        value: raw.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid() -> HashMap<String, String> {
        fields(&[
            ("date", "2024-03-04T09:00"),
            ("powerLevelStart", "20"),
            ("batteryCapacity", "60"),
            ("chargerType", "office space"),
            ("chargingPower", "11"),
            ("temperature", "18"),
        ])
    }

    #[test]
    fn parses_valid_fields() {
        let input = ChargingSessionInput::from_fields(&valid()).unwrap();
        assert_eq!(input.timestamp.to_string(), "2024-03-04 09:00:00");
        assert_eq!(input.power_level_start, 20.0);
        assert_eq!(input.charger_type, ParkingType::OfficeSpace);
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert_eq!(ParkingType::from_label("Airport"), ParkingType::Airport);
        assert_eq!(
            ParkingType::from_label("airport"),
            ParkingType::Other("airport".to_string())
        );
        for known in ParkingType::KNOWN.iter() {
            assert_eq!(&ParkingType::from_label(known.label()), known);
        }
    }

    #[test]
    fn tolerates_whitespace_around_numbers() {
        let mut f = valid();
        f.insert("temperature".into(), " -3.5 ".into());
        let input = ChargingSessionInput::from_fields(&f).unwrap();
        assert_eq!(input.temperature, -3.5);
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let mut f = valid();
        f.insert("chargingPower".into(), "NaN".into());
        let err = ChargingSessionInput::from_fields(&f).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::InvalidNumber { field: "chargingPower", .. }
        ));
    }

    #[test]
    fn reports_missing_field() {
        let mut f = valid();
        f.remove("batteryCapacity");
        let err = ChargingSessionInput::from_fields(&f).unwrap_err();
        assert!(matches!(err, EncodeError::MissingField("batteryCapacity")));
    }

    #[test]
    fn rejects_seconds_in_timestamp() {
        let mut f = valid();
        f.insert("date".into(), "2024-03-04T09:00:30".into());
        let err = ChargingSessionInput::from_fields(&f).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidTimestamp { .. }));
    }
}
