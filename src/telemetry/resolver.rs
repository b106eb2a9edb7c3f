use std::{collections::HashMap, fmt, sync::Arc};

use itertools::Itertools;
use log::debug;

use crate::LapQueryError;

use super::{FieldKind, Sample, SyntheticFields, TelemetrySchema, Value};

/// Reads one field out of a sample.
pub type Extractor = Arc<dyn Fn(&Sample) -> Value + Send + Sync>;

/// Fields computed by the trackers rather than reported by the sim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticField {
    LastPitLap,
    EstimatedSpeed,
    TrackPrecipitation,
    RepairsRemaining,
    OptionalRepairsRemaining,
    LapFuelUsed,
    StintLap,
}

impl SyntheticField {
    pub const ALL: [SyntheticField; 7] = [
        SyntheticField::LastPitLap,
        SyntheticField::EstimatedSpeed,
        SyntheticField::TrackPrecipitation,
        SyntheticField::RepairsRemaining,
        SyntheticField::OptionalRepairsRemaining,
        SyntheticField::LapFuelUsed,
        SyntheticField::StintLap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SyntheticField::LastPitLap => "PlayerCarLastPitLap",
            SyntheticField::EstimatedSpeed => "EstimatedSpeed",
            SyntheticField::TrackPrecipitation => "TrackPrecipitation",
            SyntheticField::RepairsRemaining => "RepairLeft",
            SyntheticField::OptionalRepairsRemaining => "OptRepairLeft",
            SyntheticField::LapFuelUsed => "LapFuelUsed",
            SyntheticField::StintLap => "StintLap",
        }
    }

    pub fn read(&self, fields: &SyntheticFields) -> f64 {
        match self {
            SyntheticField::LastPitLap => fields.last_pit_lap,
            SyntheticField::EstimatedSpeed => fields.estimated_speed,
            SyntheticField::TrackPrecipitation => fields.track_precipitation,
            SyntheticField::RepairsRemaining => fields.repairs_remaining,
            SyntheticField::OptionalRepairsRemaining => fields.optional_repairs_remaining,
            SyntheticField::LapFuelUsed => fields.lap_fuel_used,
            SyntheticField::StintLap => fields.stint_lap,
        }
        .unwrap_or(0.)
    }
}

/// Maps documented field names to extractors. Built once and shared by reference with
/// every compilation; it is never mutated afterwards.
pub struct VariableResolver {
    variables: HashMap<String, Extractor>,
}

impl VariableResolver {
    pub fn new(schema: &TelemetrySchema) -> Result<Self, LapQueryError> {
        let mut variables: HashMap<String, Extractor> = HashMap::new();

        for field in SyntheticField::ALL {
            variables.insert(
                field.name().to_string(),
                Arc::new(move |sample: &Sample| Value::Scalar(field.read(&sample.synthetic))),
            );
        }

        for field in &schema.fields {
            if variables.contains_key(&field.name) {
                return Err(LapQueryError::DuplicateField {
                    name: field.name.clone(),
                });
            }
            let raw_key = field.raw_key.clone();
            let extractor: Extractor = match field.kind {
                FieldKind::Scalar => {
                    Arc::new(move |sample: &Sample| Value::Scalar(sample.raw_f64(&raw_key)))
                }
                FieldKind::Array => {
                    Arc::new(move |sample: &Sample| Value::List(sample.raw_list(&raw_key)))
                }
            };
            variables.insert(field.name.clone(), extractor);
        }

        debug!("Variable resolver built with {} fields", variables.len());
        Ok(Self { variables })
    }

    pub fn resolve(&self, name: &str) -> Result<Extractor, LapQueryError> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| LapQueryError::VariableNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).sorted().collect()
    }
}

impl fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableResolver")
            .field("variables", &self.field_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::FieldDefinition;

    fn resolver() -> VariableResolver {
        VariableResolver::new(&TelemetrySchema::builtin()).unwrap()
    }

    #[test]
    fn test_resolves_raw_field_by_documented_name() {
        let extract = resolver().resolve("FuelLevel").unwrap();
        let sample = Sample::new(0., 1.).with_field("fuel_level", 42.5);
        assert_eq!(extract(&sample), Value::Scalar(42.5));
    }

    #[test]
    fn test_resolves_boolean_field_as_number() {
        let extract = resolver().resolve("OnPitRoad").unwrap();
        let sample = Sample::new(0., 1.).with_field("on_pit_road", true);
        assert_eq!(extract(&sample), Value::Scalar(1.));
    }

    #[test]
    fn test_resolves_array_field_as_list() {
        let extract = resolver().resolve("CarIdxPosition").unwrap();
        let sample = Sample::new(0., 1.).with_field("car_idx_position", vec![2., 1., 3.]);
        assert_eq!(extract(&sample), Value::List(vec![2., 1., 3.]));
    }

    #[test]
    fn test_resolves_synthetic_fields() {
        let resolver = resolver();
        let sample = Sample::new(0., 1.).with_synthetic(SyntheticFields {
            last_pit_lap: Some(12.),
            lap_fuel_used: Some(2.25),
            ..Default::default()
        });
        assert_eq!(
            resolver.resolve("PlayerCarLastPitLap").unwrap()(&sample),
            Value::Scalar(12.)
        );
        assert_eq!(
            resolver.resolve("LapFuelUsed").unwrap()(&sample),
            Value::Scalar(2.25)
        );
        assert_eq!(
            resolver.resolve("TrackPrecipitation").unwrap()(&sample),
            Value::Scalar(0.)
        );
    }

    #[test]
    fn test_unknown_variable_names_the_field() {
        match resolver().resolve("Speeed") {
            Err(LapQueryError::VariableNotFound { name }) => assert_eq!(name, "Speeed"),
            other => panic!("Expected VariableNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_documented_name_differs_from_raw_key() {
        let resolver = resolver();
        assert!(resolver.contains("FuelLevel"));
        assert!(!resolver.contains("fuel_level"));
    }

    #[test]
    fn test_schema_cannot_shadow_synthetic_field() {
        let schema = TelemetrySchema {
            fields: vec![FieldDefinition::new(
                "LapFuelUsed",
                "lap_fuel_used",
                FieldKind::Scalar,
            )],
        };
        match VariableResolver::new(&schema) {
            Err(LapQueryError::DuplicateField { name }) => assert_eq!(name, "LapFuelUsed"),
            other => panic!("Expected DuplicateField, got {:?}", other),
        }
    }

    #[test]
    fn test_field_names_are_sorted() {
        let resolver = resolver();
        let names = resolver.field_names();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert!(names.contains(&"Speed"));
        assert!(names.contains(&"EstimatedSpeed"));
    }
}
