use std::collections::HashMap;

use serde::Deserialize;

use crate::graphql::RawAppliance;

/// Fan RPM reported at 0% output.
const FAN_MIN: f64 = 500.0;
/// Fan RPM reported at 100% output.
const FAN_MAX: f64 = 2000.0;

/// Sensor categories reported by a Mila appliance, using the API's
/// GraphQL enum spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[non_exhaustive]
pub enum SensorKind {
    FanSpeed,
    Aqi,
    Pm1,
    Pm2_5,
    Pm10,
    Voc,
    Humidity,
    Temperature,
    Co2,
    Co,
}

impl SensorKind {
    /// Every kind the appliance query asks for.
    pub const ALL: [SensorKind; 10] = [
        SensorKind::FanSpeed,
        SensorKind::Aqi,
        SensorKind::Pm1,
        SensorKind::Pm2_5,
        SensorKind::Pm10,
        SensorKind::Voc,
        SensorKind::Humidity,
        SensorKind::Temperature,
        SensorKind::Co2,
        SensorKind::Co,
    ];

    /// GraphQL spelling of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::FanSpeed => "FanSpeed",
            SensorKind::Aqi => "Aqi",
            SensorKind::Pm1 => "Pm1",
            SensorKind::Pm2_5 => "Pm2_5",
            SensorKind::Pm10 => "Pm10",
            SensorKind::Voc => "Voc",
            SensorKind::Humidity => "Humidity",
            SensorKind::Temperature => "Temperature",
            SensorKind::Co2 => "Co2",
            SensorKind::Co => "Co",
        }
    }
}

/// Room an appliance is assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[non_exhaustive]
pub struct Room {
    pub id: i64,
    pub kind: String,
}

/// Current operating state of an appliance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ApplianceState {
    pub actual_mode: String,
}

/// One Mila appliance with its latest sensor readings.
///
/// Recreated wholesale on every upstream fetch, never partially mutated.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Appliance {
    pub id: String,
    pub name: String,
    pub room: Room,
    pub state: ApplianceState,
    /// Latest value per sensor kind; kinds without a recent reading are
    /// absent from the map.
    pub sensors: HashMap<SensorKind, f64>,
    /// Fan output normalized to 0–100 in steps of 10, `None` when the
    /// appliance reported no fan-speed sample.
    pub fan_speed_percent: Option<u8>,
}

impl Appliance {
    /// Reshapes a wire appliance: sensor list keyed by kind, fan RPM
    /// normalized to a percentage.
    pub(crate) fn from_raw(raw: RawAppliance) -> Self {
        let sensors: HashMap<SensorKind, f64> = raw
            .sensors
            .into_iter()
            .filter_map(|sensor| sensor.latest.map(|reading| (sensor.kind, reading.value)))
            .collect();

        let fan_speed_percent = sensors
            .get(&SensorKind::FanSpeed)
            .map(|rpm| fan_percentage(*rpm));

        Self {
            id: raw.id,
            name: raw.name,
            room: raw.room,
            state: raw.state,
            sensors,
            fan_speed_percent,
        }
    }
}

/// Normalizes a raw fan RPM to a 0–100 percentage in steps of 10.
///
/// Piecewise-linear over `[FAN_MIN, FAN_MAX]`: at or below the minimum → 0,
/// at or above the maximum → 100, in between → linear interpolation rounded
/// to the nearest multiple of 10.
pub(crate) fn fan_percentage(rpm: f64) -> u8 {
    if rpm <= FAN_MIN {
        return 0;
    }
    if rpm >= FAN_MAX {
        return 100;
    }
    (((rpm - FAN_MIN) / (FAN_MAX - FAN_MIN) * 10.0).round() * 10.0) as u8
}

/// Quantizes a requested fan speed to the device's control granularity
/// (nearest multiple of 10).
pub(crate) fn quantize_fan_speed(fan_speed: u8) -> u8 {
    ((f64::from(fan_speed) / 10.0).round() * 10.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_percentage_fixed_points() {
        assert_eq!(fan_percentage(500.0), 0);
        assert_eq!(fan_percentage(1250.0), 50);
        assert_eq!(fan_percentage(2000.0), 100);
    }

    #[test]
    fn test_fan_percentage_clamps_out_of_range() {
        assert_eq!(fan_percentage(0.0), 0);
        assert_eq!(fan_percentage(420.0), 0);
        assert_eq!(fan_percentage(2500.0), 100);
    }

    #[test]
    fn test_fan_percentage_steps_of_ten_and_monotonic() {
        let mut previous = 0;
        let mut rpm = 501.0;
        while rpm < 2000.0 {
            let percent = fan_percentage(rpm);
            assert_eq!(percent % 10, 0, "not a multiple of 10 at {rpm} rpm");
            assert!(percent >= previous, "decreased at {rpm} rpm");
            previous = percent;
            rpm += 7.0;
        }
    }

    #[test]
    fn test_quantize_fan_speed() {
        assert_eq!(quantize_fan_speed(77), 80);
        assert_eq!(quantize_fan_speed(74), 70);
        assert_eq!(quantize_fan_speed(75), 80);
        assert_eq!(quantize_fan_speed(0), 0);
        assert_eq!(quantize_fan_speed(100), 100);
    }

    #[test]
    fn test_from_raw_reshapes_sensors() {
        let raw: RawAppliance = serde_json::from_value(serde_json::json!({
            "id": "m-1",
            "name": "Bedroom",
            "room": { "id": 42, "kind": "Bedroom" },
            "state": { "actualMode": "Automagic" },
            "sensors": [
                { "kind": "FanSpeed", "latest": { "instant": "2024-01-01T00:00:00Z", "value": 1250.0 } },
                { "kind": "Aqi", "latest": { "instant": "2024-01-01T00:00:00Z", "value": 12.0 } },
                { "kind": "Co2", "latest": null }
            ]
        }))
        .unwrap();

        let appliance = Appliance::from_raw(raw);

        assert_eq!(appliance.sensors.get(&SensorKind::FanSpeed), Some(&1250.0));
        assert_eq!(appliance.sensors.get(&SensorKind::Aqi), Some(&12.0));
        assert!(!appliance.sensors.contains_key(&SensorKind::Co2));
        assert_eq!(appliance.fan_speed_percent, Some(50));
        assert_eq!(appliance.room.id, 42);
        assert_eq!(appliance.state.actual_mode, "Automagic");
    }

    #[test]
    fn test_from_raw_without_fan_speed_reading() {
        let raw: RawAppliance = serde_json::from_value(serde_json::json!({
            "id": "m-2",
            "name": "Office",
            "room": { "id": 7, "kind": "Office" },
            "state": { "actualMode": "Manual" },
            "sensors": []
        }))
        .unwrap();

        let appliance = Appliance::from_raw(raw);

        assert_eq!(appliance.fan_speed_percent, None);
        assert!(appliance.sensors.is_empty());
    }
}
