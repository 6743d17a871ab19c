use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A durable-medical-equipment order extracted from a physician note.
///
/// Serialized with PascalCase keys, which is the wire format the order-intake
/// service expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Order {
    pub device: String,
    /// Only meaningful for oxygen tanks.
    pub liters: String,
    pub usage: String,
    pub diagnosis: String,
    pub ordering_provider: String,
    pub patient_name: String,
    pub dob: String,
}

impl Order {
    /// Maps a JSON object onto an order, matching keys without regard to case.
    ///
    /// Scalars other than strings are stringified, `null` becomes the empty
    /// string and unknown keys are ignored. Returns `None` when `value` is not
    /// an object.
    pub fn from_json_value_case_insensitive(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut order = Order::default();

        for (key, raw) in object {
            let slot = match key.to_ascii_lowercase().as_str() {
                "device" => &mut order.device,
                "liters" => &mut order.liters,
                "usage" => &mut order.usage,
                "diagnosis" => &mut order.diagnosis,
                "orderingprovider" => &mut order.ordering_provider,
                "patientname" => &mut order.patient_name,
                "dob" => &mut order.dob,
                _ => continue,
            };
            *slot = scalar_to_string(raw);
        }

        Some(order)
    }

    pub fn liters_applies(&self) -> bool {
        self.device.to_ascii_lowercase().contains("oxygen")
    }

    pub fn is_empty(&self) -> bool {
        *self == Order::default()
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// One input note together with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub name: String,
    pub text: String,
}

impl Note {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cpap_order() -> Order {
        Order {
            device: "CPAP Machine".to_string(),
            liters: String::new(),
            usage: "Nightly during sleep".to_string(),
            diagnosis: "Obstructive Sleep Apnea".to_string(),
            ordering_provider: "Dr. Smith".to_string(),
            patient_name: "John Doe".to_string(),
            dob: "1980-01-15".to_string(),
        }
    }

    #[test]
    fn test_order_serializes_with_pascal_case_keys() {
        let value = serde_json::to_value(cpap_order()).unwrap();

        assert_eq!(
            value,
            json!({
                "Device": "CPAP Machine",
                "Liters": "",
                "Usage": "Nightly during sleep",
                "Diagnosis": "Obstructive Sleep Apnea",
                "OrderingProvider": "Dr. Smith",
                "PatientName": "John Doe",
                "Dob": "1980-01-15"
            })
        );

        let parsed: Order = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, cpap_order());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let order: Order = serde_json::from_str(r#"{"Device": "Walker"}"#).unwrap();
        assert_eq!(order.device, "Walker");
        assert!(order.liters.is_empty());
        assert!(order.patient_name.is_empty());
    }

    #[test]
    fn test_case_insensitive_mapping() {
        let value = json!({
            "device": "Oxygen Tank",
            "LITERS": 2.5,
            "orderingProvider": "Dr. Brown",
            "patientname": "Bob Johnson",
            "DOB": null,
            "extra": "ignored"
        });

        let order = Order::from_json_value_case_insensitive(&value).unwrap();
        assert_eq!(order.device, "Oxygen Tank");
        assert_eq!(order.liters, "2.5");
        assert_eq!(order.ordering_provider, "Dr. Brown");
        assert_eq!(order.patient_name, "Bob Johnson");
        assert_eq!(order.dob, "");
        assert!(order.liters_applies());
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(Order::from_json_value_case_insensitive(&json!(["Device"])).is_none());
        assert!(Order::from_json_value_case_insensitive(&json!("CPAP")).is_none());
    }

    #[test]
    fn test_liters_applies_only_to_oxygen() {
        assert!(!cpap_order().liters_applies());
        assert!(Order::default().is_empty());
    }
}
