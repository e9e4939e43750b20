//! Static reference records used for hydration.
//!
//! Field aliases accept the ESI response shapes (`system_id`, `type_id`, ...).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarSystem {
    #[serde(alias = "system_id")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub security_status: f64,
    pub constellation_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constellation {
    #[serde(alias = "constellation_id")]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub region_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(alias = "type_id")]
    pub id: u64,
    pub group_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub published: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_esi_shapes() {
        let system: SolarSystem = serde_json::from_str(
            r#"{"system_id":30000142,"name":"Jita","security_status":0.9459,
                "constellation_id":20000020,"star_id":40009076}"#,
        )
        .unwrap();
        assert_eq!(system.id, 30000142);
        assert_eq!(system.constellation_id, 20000020);

        let item: Item =
            serde_json::from_str(r#"{"type_id":670,"group_id":29,"name":"Capsule","published":true}"#)
                .unwrap();
        assert_eq!(item.group_id, 29);
    }
}
