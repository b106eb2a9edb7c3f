// Telemetry schema: documented field names and the raw sample keys backing them

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::LapQueryError;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldKind {
    #[default]
    Scalar,
    Array,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Name used in queries
    pub name: String,
    /// Key of the field in the raw sample bag
    pub raw_key: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl FieldDefinition {
    pub fn new(name: &str, raw_key: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            raw_key: raw_key.to_string(),
            kind,
            unit: None,
            description: String::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySchema {
    pub fields: Vec<FieldDefinition>,
}

// (name, raw key, kind, unit, description)
const BUILTIN_FIELDS: &[(&str, &str, FieldKind, Option<&str>, &str)] = &[
    ("Speed", "speed", FieldKind::Scalar, Some("m/s"), "GPS vehicle speed"),
    ("RPM", "engine_rpm", FieldKind::Scalar, Some("revs/min"), "Engine rpm"),
    ("Gear", "gear", FieldKind::Scalar, None, "-1=reverse 0=neutral 1..n=current gear"),
    ("Throttle", "throttle", FieldKind::Scalar, Some("%"), "0=off throttle to 1=full throttle"),
    ("Brake", "brake", FieldKind::Scalar, Some("%"), "0=brake released to 1=max pedal force"),
    ("Clutch", "clutch", FieldKind::Scalar, Some("%"), "0=disengaged to 1=fully engaged"),
    ("SteeringWheelAngle", "steering_angle", FieldKind::Scalar, Some("rad"), "Steering wheel angle"),
    ("FuelLevel", "fuel_level", FieldKind::Scalar, Some("l"), "Liters of fuel remaining"),
    ("FuelLevelPct", "fuel_level_pct", FieldKind::Scalar, Some("%"), "Percent fuel remaining"),
    ("FuelUsePerHour", "fuel_use_per_hour", FieldKind::Scalar, Some("kg/h"), "Engine fuel used instantaneous"),
    ("Lap", "lap", FieldKind::Scalar, None, "Laps started count"),
    ("LapCompleted", "lap_completed", FieldKind::Scalar, None, "Laps completed count"),
    ("LapDist", "lap_dist", FieldKind::Scalar, Some("m"), "Meters traveled from S/F this lap"),
    ("LapDistPct", "lap_dist_pct", FieldKind::Scalar, Some("%"), "Percentage distance around lap"),
    ("LapCurrentLapTime", "lap_current_time", FieldKind::Scalar, Some("s"), "Estimate of players current lap time"),
    ("LapLastLapTime", "lap_last_time", FieldKind::Scalar, Some("s"), "Players last lap time"),
    ("LapBestLapTime", "lap_best_time", FieldKind::Scalar, Some("s"), "Players best lap time"),
    ("OnPitRoad", "on_pit_road", FieldKind::Scalar, None, "Is the player car on pit road between the cones"),
    ("PlayerCarInPitStall", "in_pit_stall", FieldKind::Scalar, None, "Is the player car stopped in its pit stall"),
    ("AirTemp", "air_temp", FieldKind::Scalar, Some("C"), "Temperature of air at start/finish line"),
    ("TrackTempCrew", "track_temp", FieldKind::Scalar, Some("C"), "Temperature of track measured by crew around track"),
    ("WaterTemp", "water_temp", FieldKind::Scalar, Some("C"), "Engine coolant temp"),
    ("OilTemp", "oil_temp", FieldKind::Scalar, Some("C"), "Engine oil temperature"),
    ("LatAccel", "lat_accel", FieldKind::Scalar, Some("m/s^2"), "Lateral acceleration (including gravity)"),
    ("LongAccel", "lon_accel", FieldKind::Scalar, Some("m/s^2"), "Longitudinal acceleration (including gravity)"),
    ("YawRate", "yaw_rate", FieldKind::Scalar, Some("rad/s"), "Yaw rate"),
    ("CarIdxLapDistPct", "car_idx_lap_dist_pct", FieldKind::Array, Some("%"), "Percentage distance around lap by car index"),
    ("CarIdxPosition", "car_idx_position", FieldKind::Array, None, "Cars position in race by car index"),
    ("CarIdxLapCompleted", "car_idx_lap_completed", FieldKind::Array, None, "Laps completed by car index"),
    ("TireSurfaceTemps", "tire_surface_temps", FieldKind::Array, Some("C"), "Surface temperature of LF, RF, LR, RR"),
];

impl Default for TelemetrySchema {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TelemetrySchema {
    /// Fields every recorded session carries.
    pub fn builtin() -> Self {
        Self {
            fields: BUILTIN_FIELDS
                .iter()
                .map(|(name, raw_key, kind, unit, description)| FieldDefinition {
                    name: name.to_string(),
                    raw_key: raw_key.to_string(),
                    kind: *kind,
                    unit: unit.map(str::to_string),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    /// Load a schema from a JSON file of the form `{"fields": [...]}`.
    pub fn from_file(path: &Path) -> Result<Self, LapQueryError> {
        let file =
            std::fs::File::open(path).map_err(|e| LapQueryError::SchemaLoadError { source: e })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| LapQueryError::SchemaParseError { source: e })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}
