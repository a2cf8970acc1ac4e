use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{ChargingSessionInput, ParkingType};

pub const N_FEATURES: usize = 11;

/// Column names in the order the regressor was fit on.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "day_of_week",
    "hour_of_day",
    "battery_level_start",
    "battery_capacity",
    "charging_power",
    "is_workday",
    "temperature",
    "parking_type_Airport",
    "parking_type_city parking lot",
    "parking_type_mini charging station",
    "parking_type_office space",
];

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("missing form field `{0}`")]
    MissingField(&'static str),
    #[error("invalid date `{value}`, expected YYYY-MM-DDTHH:MM: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("field `{field}` is not a number: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

/// Single model input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub day_of_week: u32,
    pub hour_of_day: u32,
    pub battery_level_start: f64,
    pub battery_capacity: f64,
    pub charging_power: f64,
    pub is_workday: u8,
    pub temperature: f64,
    #[serde(rename = "parking_type_Airport")]
    pub parking_type_airport: u8,
    #[serde(rename = "parking_type_city parking lot")]
    pub parking_type_city_parking_lot: u8,
    #[serde(rename = "parking_type_mini charging station")]
    pub parking_type_mini_charging_station: u8,
    #[serde(rename = "parking_type_office space")]
    pub parking_type_office_space: u8,
}

impl FeatureVector {
    pub fn zeros() -> Self {
        Self {
            day_of_week: 0,
            hour_of_day: 0,
            battery_level_start: 0.0,
            battery_capacity: 0.0,
            charging_power: 0.0,
            is_workday: 0,
            temperature: 0.0,
            parking_type_airport: 0,
            parking_type_city_parking_lot: 0,
            parking_type_mini_charging_station: 0,
            parking_type_office_space: 0,
        }
    }

    /// Values in `FEATURE_COLUMNS` order.
    pub fn to_row(&self) -> [f64; N_FEATURES] {
        [
            self.day_of_week as f64,
            self.hour_of_day as f64,
            self.battery_level_start,
            self.battery_capacity,
            self.charging_power,
            self.is_workday as f64,
            self.temperature,
            self.parking_type_airport as f64,
            self.parking_type_city_parking_lot as f64,
            self.parking_type_mini_charging_station as f64,
            self.parking_type_office_space as f64,
        ]
    }

    pub fn parking_indicators(&self) -> [u8; 4] {
        [
            self.parking_type_airport,
            self.parking_type_city_parking_lot,
            self.parking_type_mini_charging_station,
            self.parking_type_office_space,
        ]
    }
}

impl From<&ChargingSessionInput> for FeatureVector {
    fn from(input: &ChargingSessionInput) -> Self {
        let day_of_week = input.timestamp.weekday().num_days_from_monday();
        let hot = |p: ParkingType| u8::from(input.charger_type == p);

        Self {
            day_of_week,
            hour_of_day: input.timestamp.hour(),
            battery_level_start: input.power_level_start,
            battery_capacity: input.battery_capacity,
            charging_power: input.charging_power,
            is_workday: u8::from(day_of_week < 5),
            temperature: input.temperature,
            parking_type_airport: hot(ParkingType::Airport),
            parking_type_city_parking_lot: hot(ParkingType::CityParkingLot),
            parking_type_mini_charging_station: hot(ParkingType::MiniChargingStation),
            parking_type_office_space: hot(ParkingType::OfficeSpace),
        }
    }
}

/// Raw form fields -> model row.
///
/// An unrecognised `chargerType` is not an error: the row gets an all-zero
/// parking block, same as the frame the model was trained from.
pub fn encode(fields: &HashMap<String, String>) -> Result<FeatureVector, EncodeError> {
    let input = ChargingSessionInput::from_fields(fields)?;
    if !input.charger_type.is_known() {
        tracing::warn!(
            "unrecognised chargerType {:?}; parking indicators left at zero",
            input.charger_type.label()
        );
    }
    Ok(FeatureVector::from(&input))
}

/// Two digits after the decimal point, whatever the magnitude.
pub fn format_prediction(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(date: &str, charger: &str) -> HashMap<String, String> {
        [
            ("date", date),
            ("powerLevelStart", "20"),
            ("batteryCapacity", "60"),
            ("chargerType", charger),
            ("chargingPower", "11"),
            ("temperature", "18"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn monday_morning_office_space() {
        let fv = encode(&session("2024-03-04T09:00", "office space")).unwrap();
        assert_eq!(fv.day_of_week, 0);
        assert_eq!(fv.hour_of_day, 9);
        assert_eq!(fv.is_workday, 1);
        assert_eq!(fv.battery_level_start, 20.0);
        assert_eq!(fv.battery_capacity, 60.0);
        assert_eq!(fv.charging_power, 11.0);
        assert_eq!(fv.temperature, 18.0);
        assert_eq!(fv.parking_indicators(), [0, 0, 0, 1]);
    }

    #[test]
    fn weekend_is_not_workday() {
        // 2024-03-09 is a Saturday, 2024-03-10 a Sunday
        let sat = encode(&session("2024-03-09T23:59", "Airport")).unwrap();
        assert_eq!((sat.day_of_week, sat.hour_of_day, sat.is_workday), (5, 23, 0));
        let sun = encode(&session("2024-03-10T00:00", "Airport")).unwrap();
        assert_eq!((sun.day_of_week, sun.hour_of_day, sun.is_workday), (6, 0, 0));
    }

    #[test]
    fn workday_flag_follows_weekday_for_a_whole_week() {
        for day in 4..=10 {
            let date = format!("2024-03-{:02}T12:30", day);
            let fv = encode(&session(&date, "Airport")).unwrap();
            assert!(fv.day_of_week <= 6);
            assert!(fv.hour_of_day <= 23);
            assert_eq!(fv.is_workday == 1, fv.day_of_week <= 4, "date {}", date);
        }
    }

    #[test]
    fn each_known_category_sets_exactly_one_indicator() {
        for (i, p) in ParkingType::KNOWN.iter().enumerate() {
            let fv = encode(&session("2024-03-04T09:00", p.label())).unwrap();
            let ind = fv.parking_indicators();
            assert_eq!(ind.iter().map(|&x| x as u32).sum::<u32>(), 1);
            assert_eq!(ind[i], 1, "category {}", p.label());
        }
    }

    #[test]
    fn unknown_category_zero_fills() {
        let fv = encode(&session("2024-03-04T09:00", "Unknown")).unwrap();
        assert_eq!(fv.parking_indicators(), [0, 0, 0, 0]);
        let fv = encode(&session("2024-03-04T09:00", "Office Space")).unwrap();
        assert_eq!(fv.parking_indicators(), [0, 0, 0, 0]);
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = encode(&session("not-a-date", "Airport")).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidTimestamp { .. }));
        assert!(err.to_string().contains("not-a-date"));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let mut f = session("2024-03-04T09:00", "Airport");
        f.insert("powerLevelStart".into(), "twenty".into());
        let err = encode(&f).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::InvalidNumber { field: "powerLevelStart", .. }
        ));
    }

    #[test]
    fn encoding_is_deterministic() {
        let f = session("2024-12-25T17:45", "city parking lot");
        assert_eq!(encode(&f).unwrap(), encode(&f).unwrap());
    }

    #[test]
    fn row_follows_column_order() {
        let fv = encode(&session("2024-03-04T09:00", "office space")).unwrap();
        assert_eq!(
            fv.to_row(),
            [0.0, 9.0, 20.0, 60.0, 11.0, 1.0, 18.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn serialized_keys_match_columns() {
        let value = serde_json::to_value(FeatureVector::zeros()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), N_FEATURES);
        for col in FEATURE_COLUMNS {
            assert!(obj.contains_key(col), "missing {}", col);
        }
    }

    #[test]
    fn prediction_has_two_decimals() {
        assert_eq!(format_prediction(7.0), "7.00");
        assert_eq!(format_prediction(3.14159), "3.14");
        assert_eq!(format_prediction(-0.5), "-0.50");
        assert_eq!(format_prediction(1234.567), "1234.57");
    }
}
