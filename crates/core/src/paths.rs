//! Catalogue of the rule paths users are offered.
//!
//! Unknown paths are still accepted by the engine (they never match); the
//! catalogue only drives warnings and tooling.

use serde::Serialize;

use killwatch_rules::Comparator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathFormat {
    Id,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathCategory {
    Alliance,
    Corporation,
    Character,
    Faction,
    Regions,
    Constellations,
    Systems,
    Items,
    Groups,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PathSpec {
    pub path: &'static str,
    pub display: &'static str,
    pub format: PathFormat,
    pub category: Option<PathCategory>,
    pub comparators: &'static [Comparator],
}

const ID_CMPS: &[Comparator] = &[Comparator::Eq, Comparator::Neq, Comparator::In];
const NUM_CMPS: &[Comparator] = &[
    Comparator::Eq,
    Comparator::Gt,
    Comparator::Gte,
    Comparator::Lt,
    Comparator::Lte,
];
const BOOL_CMPS: &[Comparator] = &[Comparator::Eq];

const fn id(path: &'static str, display: &'static str, category: PathCategory) -> PathSpec {
    PathSpec {
        path,
        display,
        format: PathFormat::Id,
        category: Some(category),
        comparators: ID_CMPS,
    }
}

const fn number(path: &'static str, display: &'static str) -> PathSpec {
    PathSpec {
        path,
        display,
        format: PathFormat::Number,
        category: None,
        comparators: NUM_CMPS,
    }
}

const fn boolean(path: &'static str, display: &'static str) -> PathSpec {
    PathSpec {
        path,
        display,
        format: PathFormat::Boolean,
        category: None,
        comparators: BOOL_CMPS,
    }
}

pub const ALL_PATHS: &[PathSpec] = &[
    id("SolarSystemID", "Solar System", PathCategory::Systems),
    id("ConstellationID", "Constellation", PathCategory::Constellations),
    id("RegionID", "Region", PathCategory::Regions),
    boolean("Meta.NPC", "zKillboard NPC kill"),
    boolean("Meta.Solo", "zKillboard solo kill"),
    boolean("Meta.Awox", "zKillboard AWOX kill"),
    number("Meta.FittedValue", "Fitted value (ISK)"),
    number("Meta.TotalValue", "Total value (ISK)"),
    id("Victim.AllianceID", "Victim alliance", PathCategory::Alliance),
    id("Victim.CorporationID", "Victim corporation", PathCategory::Corporation),
    id("Victim.CharacterID", "Victim character", PathCategory::Character),
    id("Victim.FactionID", "Victim faction", PathCategory::Faction),
    id("Victim.ShipTypeID", "Victim ship", PathCategory::Items),
    id("Victim.ShipGroupID", "Victim ship group", PathCategory::Groups),
    id("Attackers.AllianceID", "Attacker alliance", PathCategory::Alliance),
    id("Attackers.CorporationID", "Attacker corporation", PathCategory::Corporation),
    id("Attackers.CharacterID", "Attacker character", PathCategory::Character),
    id("Attackers.FactionID", "Attacker faction", PathCategory::Faction),
    id("Attackers.ShipTypeID", "Attacker ship", PathCategory::Items),
    id("Attackers.ShipGroupID", "Attacker ship group", PathCategory::Groups),
    id("Attackers.WeaponTypeID", "Attacker weapon", PathCategory::Items),
    id("Attackers.WeaponGroupID", "Attacker weapon group", PathCategory::Groups),
];

pub fn lookup(path: &str) -> Option<&'static PathSpec> {
    ALL_PATHS.iter().find(|p| p.path == path)
}

pub fn is_known_path(path: &str) -> bool {
    lookup(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths() {
        assert!(is_known_path("Victim.ShipTypeID"));
        assert!(is_known_path("Meta.TotalValue"));
        assert!(!is_known_path("Victim.ShipTypeId"));
    }

    #[test]
    fn numeric_paths_allow_ordering() {
        let spec = lookup("Meta.TotalValue").unwrap();
        assert!(spec.comparators.contains(&Comparator::Gt));
        let spec = lookup("Victim.ShipTypeID").unwrap();
        assert!(!spec.comparators.iter().any(|c| c.is_ordering()));
    }

    #[test]
    fn paths_are_unique() {
        for (i, a) in ALL_PATHS.iter().enumerate() {
            assert!(ALL_PATHS[i + 1..].iter().all(|b| b.path != a.path), "{}", a.path);
        }
    }
}
