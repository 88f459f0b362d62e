//! Catalog record model: an open document plus its resolved armament.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

/// Document key of a single armament block.
pub const FLAT_ARMAMENT_KEY: &str = "armamento";
/// Prefix of the document keys holding labeled setups (`setup_1`, `setup_2`, ...).
pub const SETUP_KEY_PREFIX: &str = "setup_";

pub const NAME_FIELD: &str = "nombre";
pub const NATION_FIELD: &str = "nacion";

/// Coerce a document value into a number.
///
/// JSON numbers and numeric strings are accepted; anything else, including
/// non-finite values, counts as absent. Rating filters, averages and rankings
/// all go through here.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// A single ammunition entry of a weapon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ammunition {
    pub nombre: String,
    pub tipo: String,
    /// Penetration in mm by distance, point-blank first.
    #[serde(default)]
    pub penetracion_mm: Vec<f64>,
    #[serde(default)]
    pub masa_total: Option<f64>,
    #[serde(default)]
    pub velocidad_bala: Option<f64>,
    #[serde(default)]
    pub masa_explosivo: Option<f64>,
}

impl Ammunition {
    pub fn zero_range_penetration(&self) -> Option<f64> {
        self.penetracion_mm.first().copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Weapon {
    #[serde(default)]
    pub municiones: Vec<Ammunition>,
}

/// Weapons of one loadout, keyed by weapon name.
pub type ArmamentGroup = BTreeMap<String, Weapon>;

/// The two shapes a vehicle's weapons can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Armament {
    Flat(ArmamentGroup),
    Setups(BTreeMap<String, ArmamentGroup>),
}

impl Armament {
    /// Resolve the armament shape of a document.
    ///
    /// Returns `Ok(None)` when the document carries no armament at all.
    pub fn from_document(body: &Map<String, Value>) -> Result<Option<Self>, AppError> {
        let flat = body.get(FLAT_ARMAMENT_KEY);
        let setups: Vec<(&String, &Value)> = body
            .iter()
            .filter(|(key, _)| key.starts_with(SETUP_KEY_PREFIX))
            .collect();

        match (flat, setups.is_empty()) {
            (None, true) => Ok(None),
            (Some(_), false) => Err(AppError::InvalidInput(format!(
                "Record carries both '{}' and setup blocks",
                FLAT_ARMAMENT_KEY
            ))),
            (Some(value), true) => Ok(Some(Armament::Flat(parse_group(
                FLAT_ARMAMENT_KEY,
                value,
            )?))),
            (None, false) => {
                let mut groups = BTreeMap::new();
                for (label, value) in setups {
                    groups.insert(label.clone(), parse_group(label, value)?);
                }
                Ok(Some(Armament::Setups(groups)))
            }
        }
    }

    /// Every ammunition entry reachable through any group and weapon.
    pub fn ammunition(&self) -> impl Iterator<Item = &Ammunition> + '_ {
        let groups: Vec<&ArmamentGroup> = match self {
            Armament::Flat(group) => vec![group],
            Armament::Setups(setups) => setups.values().collect(),
        };
        groups
            .into_iter()
            .flat_map(|group| group.values())
            .flat_map(|weapon| weapon.municiones.iter())
    }

    /// Highest zero-range penetration across all ammunition, if any has data.
    pub fn max_zero_range_penetration(&self) -> Option<f64> {
        self.ammunition()
            .filter_map(Ammunition::zero_range_penetration)
            .reduce(f64::max)
    }
}

fn parse_group(label: &str, value: &Value) -> Result<ArmamentGroup, AppError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AppError::InvalidInput(format!("Malformed armament '{}': {}", label, e)))
}

/// A stored vehicle.
#[derive(Debug, Clone)]
pub struct CatalogRecord {
    pub id: String,
    pub body: Map<String, Value>,
    pub armament: Option<Armament>,
}

impl CatalogRecord {
    /// Build a record from a stored document.
    ///
    /// Documents written before validation existed may carry a broken armament;
    /// such a record keeps its other fields and is treated as unarmed.
    pub fn from_stored(id: String, body: Map<String, Value>) -> Self {
        let armament = match Armament::from_document(&body) {
            Ok(armament) => armament,
            Err(e) => {
                tracing::debug!("Record {} has unusable armament: {}", id, e);
                None
            }
        };
        Self { id, body, armament }
    }

    /// Check a document that is about to enter the catalog.
    ///
    /// Exactly one of the flat armament block or one-or-more setups must be present.
    pub fn validate_document(body: &Map<String, Value>) -> Result<(), AppError> {
        match Armament::from_document(body)? {
            Some(_) => Ok(()),
            None => Err(AppError::InvalidInput(format!(
                "Record must carry either '{}' or at least one '{}*' block",
                FLAT_ARMAMENT_KEY, SETUP_KEY_PREFIX
            ))),
        }
    }

    /// Numeric value of a field, or `None` when absent or not a number.
    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.body.get(field).and_then(coerce_numeric)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.text(NAME_FIELD)
    }

    pub fn nation(&self) -> Option<&str> {
        self.text(NATION_FIELD)
    }

    pub fn max_penetration(&self) -> Option<f64> {
        self.armament
            .as_ref()
            .and_then(Armament::max_zero_range_penetration)
    }
}

impl Serialize for CatalogRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            id: &'a str,
            #[serde(flatten)]
            body: &'a Map<String, Value>,
        }

        View {
            id: &self.id,
            body: &self.body,
        }
        .serialize(serializer)
    }
}

/// Drop client-supplied identifiers; the store owns record ids.
pub fn strip_identifiers(mut body: Map<String, Value>) -> Map<String, Value> {
    body.remove("id");
    body.remove("_id");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn shell(name: &str, pens: &[f64]) -> Value {
        json!({ "nombre": name, "tipo": "APHE", "penetracion_mm": pens })
    }

    #[test]
    fn test_coerce_numeric_policy() {
        assert_eq!(coerce_numeric(&json!(4.3)), Some(4.3));
        assert_eq!(coerce_numeric(&json!(7)), Some(7.0));
        assert_eq!(coerce_numeric(&json!(" 5.7 ")), Some(5.7));
        assert_eq!(coerce_numeric(&json!("n/a")), None);
        assert_eq!(coerce_numeric(&json!("NaN")), None);
        assert_eq!(coerce_numeric(&json!(true)), None);
        assert_eq!(coerce_numeric(&json!(null)), None);
        assert_eq!(coerce_numeric(&json!([1])), None);
    }

    #[test]
    fn test_flat_armament_is_resolved() {
        let body = doc(json!({
            "nombre": "Tiger H1",
            "armamento": { "8.8 cm KwK 36": { "municiones": [shell("PzGr 39", &[165.0, 160.0])] } }
        }));
        let armament = Armament::from_document(&body).unwrap().unwrap();
        assert!(matches!(armament, Armament::Flat(_)));
        assert_eq!(armament.max_zero_range_penetration(), Some(165.0));
    }

    #[test]
    fn test_setups_are_collected_across_labels() {
        let body = doc(json!({
            "setup_1": { "gun": { "municiones": [shell("A", &[120.0])] } },
            "setup_2": { "gun": { "municiones": [shell("B", &[180.0]), shell("C", &[95.0])] } }
        }));
        let armament = Armament::from_document(&body).unwrap().unwrap();
        match &armament {
            Armament::Setups(setups) => assert_eq!(setups.len(), 2),
            other => panic!("expected setups, got {:?}", other),
        }
        assert_eq!(armament.ammunition().count(), 3);
        assert_eq!(armament.max_zero_range_penetration(), Some(180.0));
    }

    #[test]
    fn test_both_armament_forms_are_rejected() {
        let body = doc(json!({
            "armamento": {},
            "setup_1": {}
        }));
        assert!(matches!(
            Armament::from_document(&body),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_document_requires_an_armament() {
        let body = doc(json!({ "nombre": "Empty" }));
        assert!(matches!(
            CatalogRecord::validate_document(&body),
            Err(AppError::InvalidInput(_))
        ));

        let armed = doc(json!({ "armamento": { "gun": { "municiones": [] } } }));
        assert!(CatalogRecord::validate_document(&armed).is_ok());
    }

    #[test]
    fn test_stored_record_with_broken_armament_is_unarmed() {
        let body = doc(json!({
            "nombre": "Broken",
            "armamento": { "gun": { "municiones": "not-a-list" } }
        }));
        let record = CatalogRecord::from_stored("r1".into(), body);
        assert!(record.armament.is_none());
        assert_eq!(record.max_penetration(), None);
        assert_eq!(record.name(), Some("Broken"));
    }

    #[test]
    fn test_empty_penetration_sequences_contribute_nothing() {
        let body = doc(json!({
            "armamento": { "mg": { "municiones": [shell("ball", &[])] } }
        }));
        let record = CatalogRecord::from_stored("r2".into(), body);
        assert!(record.armament.is_some());
        assert_eq!(record.max_penetration(), None);
    }

    #[test]
    fn test_serialized_record_exposes_id_and_fields() {
        let record = CatalogRecord::from_stored(
            "abc".into(),
            doc(json!({ "nombre": "T-34", "rating_realista": 3.7 })),
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["nombre"], "T-34");
        assert_eq!(value["rating_realista"], 3.7);
    }

    #[test]
    fn test_strip_identifiers() {
        let body = strip_identifiers(doc(json!({ "id": "x", "_id": "y", "nombre": "M4" })));
        assert_eq!(body.len(), 1);
        assert!(body.contains_key("nombre"));
    }
}
