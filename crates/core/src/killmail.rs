//! Killmail event records as delivered by the feed.
//!
//! `constellation_id`, `region_id`, and the ship/weapon group ids are not
//! on the wire; they are filled in by hydration. Rule paths address these
//! records by PascalCase field names (`Victim.ShipTypeID`,
//! `Meta.TotalValue`, `Attackers.WeaponGroupID`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use killwatch_rules::{Node, Resolvable};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Killmail {
    #[serde(rename = "killmail_id")]
    pub id: u64,
    #[serde(rename = "killmail_hash", default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moon_id: Option<u64>,
    #[serde(default)]
    pub solar_system_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constellation_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_id: Option<u64>,
    #[serde(default)]
    pub killmail_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attackers: Vec<Attacker>,
    #[serde(default)]
    pub victim: Option<Victim>,
    #[serde(rename = "zkb", default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    #[serde(default)]
    pub alliance_id: Option<u64>,
    #[serde(default)]
    pub character_id: Option<u64>,
    #[serde(default)]
    pub corporation_id: Option<u64>,
    #[serde(default)]
    pub faction_id: Option<u64>,
    #[serde(default)]
    pub damage_taken: u64,
    /// Zero when the feed omits it.
    #[serde(default)]
    pub ship_type_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_group_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attacker {
    #[serde(default)]
    pub alliance_id: Option<u64>,
    #[serde(default)]
    pub character_id: Option<u64>,
    #[serde(default)]
    pub corporation_id: Option<u64>,
    #[serde(default)]
    pub faction_id: Option<u64>,
    #[serde(default)]
    pub damage_done: u64,
    #[serde(default)]
    pub final_blow: bool,
    #[serde(default)]
    pub security_status: f64,
    #[serde(default)]
    pub ship_type_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_group_id: Option<u64>,
    #[serde(default)]
    pub weapon_type_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_group_id: Option<u64>,
}

/// zKillboard metadata block (`zkb` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    #[serde(rename = "locationID")]
    pub location_id: Option<u64>,
    pub hash: String,
    #[serde(rename = "fittedValue")]
    pub fitted_value: f64,
    #[serde(rename = "totalValue")]
    pub total_value: f64,
    pub points: u64,
    pub npc: bool,
    pub solo: bool,
    pub awox: bool,
    pub esi: String,
    pub url: String,
}

impl Killmail {
    /// Decode a raw feed payload.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Resolvable for Killmail {
    fn field(&self, name: &str) -> Option<Node<'_>> {
        Some(match name {
            "ID" => Node::leaf(self.id),
            "Hash" => Node::leaf(self.hash.as_str()),
            "MoonID" => Node::optional(self.moon_id),
            "SolarSystemID" => Node::leaf(self.solar_system_id),
            "ConstellationID" => Node::optional(self.constellation_id),
            "RegionID" => Node::optional(self.region_id),
            "WarID" => Node::optional(self.war_id),
            "KillmailTime" => Node::optional(self.killmail_time.map(|t| t.to_rfc3339())),
            "Attackers" => Node::list(&self.attackers),
            "Victim" => Node::optional_record(self.victim.as_ref()),
            "Meta" => Node::optional_record(self.meta.as_ref()),
            _ => return None,
        })
    }

    fn opaque(&self) -> Value {
        snapshot(self)
    }
}

impl Resolvable for Victim {
    fn field(&self, name: &str) -> Option<Node<'_>> {
        Some(match name {
            "AllianceID" => Node::optional(self.alliance_id),
            "CharacterID" => Node::optional(self.character_id),
            "CorporationID" => Node::optional(self.corporation_id),
            "FactionID" => Node::optional(self.faction_id),
            "DamageTaken" => Node::leaf(self.damage_taken),
            "ShipTypeID" => Node::leaf(self.ship_type_id),
            "ShipGroupID" => Node::optional(self.ship_group_id),
            _ => return None,
        })
    }

    fn opaque(&self) -> Value {
        snapshot(self)
    }
}

impl Resolvable for Attacker {
    fn field(&self, name: &str) -> Option<Node<'_>> {
        Some(match name {
            "AllianceID" => Node::optional(self.alliance_id),
            "CharacterID" => Node::optional(self.character_id),
            "CorporationID" => Node::optional(self.corporation_id),
            "FactionID" => Node::optional(self.faction_id),
            "DamageDone" => Node::leaf(self.damage_done),
            "FinalBlow" => Node::leaf(self.final_blow),
            "SecurityStatus" => Node::leaf(self.security_status),
            "ShipTypeID" => Node::optional(self.ship_type_id),
            "ShipGroupID" => Node::optional(self.ship_group_id),
            "WeaponTypeID" => Node::optional(self.weapon_type_id),
            "WeaponGroupID" => Node::optional(self.weapon_group_id),
            _ => return None,
        })
    }

    fn opaque(&self) -> Value {
        snapshot(self)
    }
}

impl Resolvable for Meta {
    fn field(&self, name: &str) -> Option<Node<'_>> {
        Some(match name {
            "LocationID" => Node::optional(self.location_id),
            "Hash" => Node::leaf(self.hash.as_str()),
            "FittedValue" => Node::leaf(self.fitted_value),
            "TotalValue" => Node::leaf(self.total_value),
            "Points" => Node::leaf(self.points),
            "NPC" => Node::leaf(self.npc),
            "Solo" => Node::leaf(self.solo),
            "Awox" => Node::leaf(self.awox),
            "ESI" => Node::leaf(self.esi.as_str()),
            "URL" => Node::leaf(self.url.as_str()),
            _ => return None,
        })
    }

    fn opaque(&self) -> Value {
        snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use killwatch_rules::resolve;
    use serde_json::json;

    const PAYLOAD: &str = r#"{
        "killmail_id": 90000001,
        "killmail_time": "2020-06-01T12:00:00Z",
        "solar_system_id": 30000142,
        "attackers": [
            {"character_id": 95000001, "corporation_id": 98000001, "ship_type_id": 587,
             "weapon_type_id": 2873, "damage_done": 900, "final_blow": true, "security_status": -2.5},
            {"faction_id": 500001, "damage_done": 100, "security_status": 0.0}
        ],
        "victim": {"character_id": 95000002, "corporation_id": 98000002,
                   "ship_type_id": 670, "damage_taken": 1000},
        "zkb": {"locationID": 40009077, "hash": "abc123", "fittedValue": 10000.0,
                "totalValue": 15000.0, "points": 1, "npc": false, "solo": false, "awox": false}
    }"#;

    #[test]
    fn decode_feed_payload() {
        let km = Killmail::from_json(PAYLOAD.as_bytes()).unwrap();
        assert_eq!(km.id, 90000001);
        assert!(km.hash.is_empty());
        assert_eq!(km.attackers.len(), 2);
        assert_eq!(km.victim.as_ref().unwrap().ship_type_id, 670);
        let meta = km.meta.as_ref().unwrap();
        assert_eq!(meta.hash, "abc123");
        assert_eq!(meta.total_value, 15000.0);
        assert!(km.constellation_id.is_none());
    }

    #[test]
    fn partial_victim_decodes_with_zero_ship() {
        let km = Killmail::from_json(
            br#"{"killmail_id":1,"killmail_hash":"h","solar_system_id":30000142,"victim":{"character_id":3},"attackers":[]}"#,
        )
        .unwrap();
        let victim = km.victim.as_ref().unwrap();
        assert_eq!(victim.character_id, Some(3));
        assert_eq!(victim.ship_type_id, 0);

        let km = Killmail::from_json(br#"{"killmail_id":2,"victim":{"ship_type_id":670}}"#).unwrap();
        assert_eq!(km.solar_system_id, 0);
        assert_eq!(resolve("Victim.ShipTypeID", &km), vec![json!(670)]);
    }

    #[test]
    fn attacker_paths_fan_out_and_skip_missing() {
        let km = Killmail::from_json(PAYLOAD.as_bytes()).unwrap();
        assert_eq!(resolve("Attackers.ShipTypeID", &km), vec![json!(587)]);
        assert_eq!(resolve("Attackers.DamageDone", &km), vec![json!(900), json!(100)]);
        assert_eq!(resolve("Attackers.FactionID", &km), vec![json!(500001)]);
    }

    #[test]
    fn derived_fields_absent_until_hydrated() {
        let mut km = Killmail::from_json(PAYLOAD.as_bytes()).unwrap();
        assert!(resolve("RegionID", &km).is_empty());
        km.region_id = Some(10000002);
        assert_eq!(resolve("RegionID", &km), vec![json!(10000002)]);
    }

    #[test]
    fn missing_victim_resolves_empty() {
        let km = Killmail {
            id: 1,
            solar_system_id: 2,
            ..Default::default()
        };
        assert!(resolve("Victim.ShipTypeID", &km).is_empty());
        assert!(resolve("Meta.TotalValue", &km).is_empty());
    }

    #[test]
    fn unknown_paths_resolve_empty() {
        let km = Killmail::from_json(PAYLOAD.as_bytes()).unwrap();
        assert!(resolve("Victim.ShipTypeId", &km).is_empty());
        assert!(resolve("victim.ship_type_id", &km).is_empty());
    }
}
