//! Best-effort enrichment of killmails with derived reference ids.

use std::collections::HashMap;

use tracing::debug;

use killwatch_core::{Killmail, UniverseService};

/// Fill in constellation, region and ship/weapon group ids.
///
/// Every lookup is independent: a failure leaves that field unset and
/// hydration carries on. Returns the number of failed lookups.
pub async fn hydrate(killmail: &mut Killmail, universe: &dyn UniverseService) -> usize {
    let mut failures = 0;

    if killmail.hash.is_empty() {
        if let Some(meta) = killmail.meta.as_ref().filter(|m| !m.hash.is_empty()) {
            killmail.hash = meta.hash.clone();
        }
    }

    // Zero ids are absent on the wire; there is nothing to look up.
    if killmail.solar_system_id != 0 {
        hydrate_location(killmail, universe, &mut failures).await;
    }

    let mut type_ids: Vec<u64> = Vec::new();
    if let Some(victim) = &killmail.victim {
        type_ids.push(victim.ship_type_id);
    }
    for attacker in &killmail.attackers {
        type_ids.extend(attacker.ship_type_id);
        type_ids.extend(attacker.weapon_type_id);
    }
    type_ids.retain(|id| *id != 0);

    // Each type id is looked up once per killmail.
    let mut resolved: HashMap<u64, Option<u64>> = HashMap::new();
    for type_id in type_ids {
        if resolved.contains_key(&type_id) {
            continue;
        }
        let group = match universe.item(type_id).await {
            Ok(item) => Some(item.group_id),
            Err(e) => {
                failures += 1;
                debug!(killmail_id = killmail.id, type_id, error = %e, "failed to look up item");
                None
            }
        };
        resolved.insert(type_id, group);
    }

    let lookup = |type_id: Option<u64>| type_id.and_then(|id| resolved.get(&id).copied().flatten());
    if let Some(victim) = killmail.victim.as_mut() {
        victim.ship_group_id = lookup(Some(victim.ship_type_id).filter(|id| *id != 0));
    }
    for attacker in killmail.attackers.iter_mut() {
        attacker.ship_group_id = lookup(attacker.ship_type_id);
        attacker.weapon_group_id = lookup(attacker.weapon_type_id);
    }

    failures
}

async fn hydrate_location(
    killmail: &mut Killmail,
    universe: &dyn UniverseService,
    failures: &mut usize,
) {
    match universe.solar_system(killmail.solar_system_id).await {
        Ok(system) => {
            killmail.constellation_id = Some(system.constellation_id);
            match universe.constellation(system.constellation_id).await {
                Ok(constellation) => killmail.region_id = Some(constellation.region_id),
                Err(e) => {
                    *failures += 1;
                    debug!(
                        killmail_id = killmail.id,
                        constellation_id = system.constellation_id,
                        error = %e,
                        "failed to look up constellation"
                    );
                }
            }
        }
        Err(e) => {
            *failures += 1;
            debug!(
                killmail_id = killmail.id,
                solar_system_id = killmail.solar_system_id,
                error = %e,
                "failed to look up solar system"
            );
        }
    }
}
