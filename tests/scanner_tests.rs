//! Tests for the building blocks: entity store, scan and eject, the ledger,
//! dock resolution and the jump drive

use std::f32::consts::FRAC_PI_2;

use transit_sim::simulation::{
    eject, scan, ConfigChange, ConfigService, DockSide, EntityId, EntityStore, JumpCommand,
    JumpDrive, JumpEvent, LocationResolver, Position, RegistrationLedger, Transform,
    TransitConfig,
};

fn spawn_flagged(store: &mut EntityStore, parent: EntityId, name: &str, mob: bool) -> EntityId {
    let id = store.spawn(parent, name, Transform::at(1.0, 0.0)).unwrap();
    store.get_mut(id).unwrap().mob = mob;
    id
}

#[test]
fn test_scan_follows_the_ejection_rules() {
    let mut store = EntityStore::new();
    let map = store.create_map("Map");
    let shuttle = store.spawn(map, "Shuttle", Transform::IDENTITY).unwrap();

    // A: transparent locker holding a mob
    let locker = spawn_flagged(&mut store, shuttle, "Locker", false);
    let mouse = spawn_flagged(&mut store, locker, "Mouse", true);
    // B: a mob carrying another mob, picked up whole
    let carrier = spawn_flagged(&mut store, shuttle, "Carrier", true);
    let _carried = spawn_flagged(&mut store, carrier, "Carried pet", true);
    // C: a token holder, skipped along with its pet
    let rider = spawn_flagged(&mut store, shuttle, "Rider", true);
    let _pet = spawn_flagged(&mut store, rider, "Rider pet", true);
    // D: blacklisted object
    let bomb = spawn_flagged(&mut store, shuttle, "Bomb", false);
    store.get_mut(bomb).unwrap().non_portable = true;
    // E: a plain fixture
    let fixture = spawn_flagged(&mut store, shuttle, "Fixture", false);

    let mut ledger = RegistrationLedger::new();
    assert!(ledger.grant(&mut store, rider, 0.0));

    let found: Vec<EntityId> = scan(&store, shuttle).iter().map(|c| c.entity).collect();
    assert_eq!(found, vec![mouse, carrier, bomb]);
    assert!(!found.contains(&fixture));

    // Scanning again yields the same order
    let again: Vec<EntityId> = scan(&store, shuttle).iter().map(|c| c.entity).collect();
    assert_eq!(found, again);
}

#[test]
fn test_scan_reports_offset_from_root() {
    let mut store = EntityStore::new();
    let map = store.create_map("Map");
    let shuttle = store.spawn(map, "Shuttle", Transform::at(100.0, 0.0)).unwrap();
    let crate_id = store.spawn(shuttle, "Crate", Transform::at(2.0, 3.0)).unwrap();
    let mob = store.spawn(crate_id, "Mouse", Transform::at(0.5, 0.0)).unwrap();
    store.get_mut(mob).unwrap().mob = true;

    let candidates = scan(&store, shuttle);
    assert_eq!(candidates.len(), 1);
    let relative = candidates[0].relative.position;
    assert!(relative.distance(&Position::new(2.5, 0.0, 3.0)) < 1e-5);
}

#[test]
fn test_eject_places_candidates_at_origin() {
    let mut store = EntityStore::new();
    let origin = store.create_map("Origin");
    let elsewhere = store.create_map("Elsewhere");
    let shuttle = store.spawn(elsewhere, "Shuttle", Transform::IDENTITY).unwrap();
    let mob = store.spawn(shuttle, "Mouse", Transform::at(1.0, 0.0)).unwrap();
    store.get_mut(mob).unwrap().mob = true;
    let fixture = store.spawn(shuttle, "Seat", Transform::IDENTITY).unwrap();

    let candidates = scan(&store, shuttle);
    let where_it_was = Transform::new(Position::new(10.0, 0.0, 0.0), FRAC_PI_2);
    let ejected = eject(&mut store, &candidates, origin, &where_it_was);

    assert_eq!(ejected, vec![mob]);
    let entity = store.get(mob).unwrap();
    assert_eq!(entity.parent, Some(origin));
    assert!(entity.local.position.distance(&Position::new(10.0, 0.0, -1.0)) < 1e-5);
    assert!((entity.local.rotation - FRAC_PI_2).abs() < 1e-5);

    assert_eq!(store.children_of(shuttle), &[fixture]);
}

#[test]
fn test_ledger_grant_and_revoke() {
    let mut store = EntityStore::new();
    let map = store.create_map("Hub");
    let actor = store.spawn(map, "Actor", Transform::IDENTITY).unwrap();
    let mut ledger = RegistrationLedger::new();

    assert!(ledger.grant(&mut store, actor, 3.0));
    assert!(!ledger.grant(&mut store, actor, 4.0));
    assert_eq!(store.get(actor).unwrap().transit_token.unwrap().granted_at, 3.0);
    assert!(ledger.holds(&store, actor));

    assert!(ledger.revoke(&mut store, actor));
    assert!(!ledger.revoke(&mut store, actor));
    assert!(!ledger.holds(&store, actor));
    assert_eq!(ledger.holder_count(), 0);
}

#[test]
fn test_ledger_sweep_only_revokes_departed() {
    let mut store = EntityStore::new();
    let hub = store.create_map("Hub");
    let space = store.create_map("Transit space");
    let platform = store.spawn(hub, "Platform", Transform::IDENTITY).unwrap();
    let waiting = store.spawn(platform, "Waiting", Transform::IDENTITY).unwrap();
    let gone = store.spawn(space, "Gone", Transform::IDENTITY).unwrap();
    let deleted = store.spawn(space, "Deleted", Transform::IDENTITY).unwrap();

    let mut ledger = RegistrationLedger::new();
    for actor in [waiting, gone, deleted] {
        ledger.grant(&mut store, actor, 0.0);
    }
    store.delete(deleted);

    let revoked = ledger.sweep_departed(&mut store, hub);
    assert_eq!(revoked, vec![gone]);
    assert!(ledger.holds(&store, waiting));
    assert_eq!(ledger.holders().collect::<Vec<_>>(), vec![waiting]);
}

#[test]
fn test_resolver_finds_hub_and_docks() {
    let mut store = EntityStore::new();
    let station = store.create_map("Station");
    let station_dock = store.spawn(station, "Station dock", Transform::at(5.0, 0.0)).unwrap();
    store.mark_dock_point(station_dock).unwrap();

    let no_hubs: Vec<EntityId> = Vec::new();
    let resolver = LocationResolver::new(&store, &no_hubs);
    assert!(resolver.find_hub().is_none());
    assert!(resolver.find_dock_point(DockSide::Hub).is_none());
    assert_eq!(resolver.find_dock_point(DockSide::Destination), Some(station_dock));

    let hub = store.create_map("Hub");
    store.get_mut(hub).unwrap().hub_marker = true;
    let platform = store.spawn(hub, "Platform", Transform::at(1.0, 1.0)).unwrap();
    let hub_dock = store.spawn(platform, "Hub dock", Transform::at(2.0, 0.0)).unwrap();
    store.mark_dock_point(hub_dock).unwrap();

    let hubs = vec![hub];
    let resolver = LocationResolver::new(&store, &hubs);
    assert_eq!(resolver.find_hub(), Some(hub));

    let target = resolver.resolve(DockSide::Hub).unwrap();
    assert_eq!(target.dock, hub_dock);
    assert_eq!(target.map, hub);
    assert!(target.transform.position.distance(&Position::new(3.0, 0.0, 1.0)) < 1e-5);
    assert_eq!(resolver.find_dock_point_on(station), Some(station_dock));
}

#[test]
fn test_resolver_uses_first_of_several_hubs() {
    let mut store = EntityStore::new();
    let first = store.create_map("Hub A");
    let second = store.create_map("Hub B");
    for hub in [first, second] {
        store.get_mut(hub).unwrap().hub_marker = true;
    }

    let hubs = vec![second, first];
    assert_eq!(LocationResolver::new(&store, &hubs).find_hub(), Some(second));

    // Falls through to the next live hub
    store.delete(second);
    assert_eq!(LocationResolver::new(&store, &hubs).find_hub(), Some(first));

    // A registered map that lost its marker doesn't count
    store.get_mut(first).unwrap().hub_marker = false;
    assert!(LocationResolver::new(&store, &hubs).find_hub().is_none());
}

#[test]
fn test_deleting_map_removes_its_docks() {
    let mut store = EntityStore::new();
    let station = store.create_map("Station");
    let dock = store.spawn(station, "Dock", Transform::IDENTITY).unwrap();
    store.mark_dock_point(dock).unwrap();

    let removed = store.delete(station);
    assert_eq!(removed.len(), 2);
    assert_eq!(store.dock_points().count(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_reparent_rejects_cycles() {
    let mut store = EntityStore::new();
    let map = store.create_map("Map");
    let outer = store.spawn(map, "Outer", Transform::IDENTITY).unwrap();
    let inner = store.spawn(outer, "Inner", Transform::IDENTITY).unwrap();

    assert!(store.reparent(outer, inner, Transform::IDENTITY).is_err());
    assert_eq!(store.map_of(inner), Some(map));
}

#[test]
fn test_jump_drive_phases() {
    let mut store = EntityStore::new();
    let origin = store.create_map("Origin");
    let target = store.create_map("Target");
    let shuttle = store.spawn(origin, "Shuttle", Transform::at(4.0, 0.0)).unwrap();

    let mut drive = JumpDrive::new();
    let command = JumpCommand {
        entity: shuttle,
        target_map: target,
        target: Transform::at(1.0, 1.0),
        startup: 2.0,
        duration: 5.0,
    };
    assert!(drive.issue(0.0, command));
    assert!(!drive.issue(0.0, command));

    // Still docked during startup
    assert!(drive.advance(&mut store, 1.0).is_empty());
    assert_eq!(store.map_of(shuttle), Some(origin));

    let events = drive.advance(&mut store, 2.0);
    let JumpEvent::Started(started) = events[0] else {
        panic!("expected a start event, got {:?}", events);
    };
    assert_eq!(started.origin_map, Some(origin));
    assert!(started.origin_transform.position.distance(&Position::new(4.0, 0.0, 0.0)) < 1e-5);
    assert_eq!(store.map_of(shuttle), drive.transit_space());

    assert!(drive.advance(&mut store, 6.0).is_empty());
    let events = drive.advance(&mut store, 7.0);
    assert!(matches!(events[0], JumpEvent::Arrived(a) if a.map == target));
    assert_eq!(store.map_of(shuttle), Some(target));
    assert!(!drive.is_jumping(shuttle));
}

#[test]
fn test_jump_of_deleted_entity_is_dropped() {
    let mut store = EntityStore::new();
    let origin = store.create_map("Origin");
    let shuttle = store.spawn(origin, "Shuttle", Transform::IDENTITY).unwrap();

    let mut drive = JumpDrive::new();
    drive.issue(
        0.0,
        JumpCommand {
            entity: shuttle,
            target_map: origin,
            target: Transform::IDENTITY,
            startup: 1.0,
            duration: 1.0,
        },
    );
    store.delete(shuttle);

    assert!(drive.advance(&mut store, 5.0).is_empty());
    assert_eq!(drive.active_count(), 0);
}

#[test]
fn test_config_broadcasts_only_real_changes() {
    let mut service = ConfigService::new(TransitConfig::default());
    let subscription = service.subscribe();

    service.set_cooldown_secs(50.0);
    service.set_cooldown_secs(12.0);
    service.set_enabled(true);
    service.set_hub_map_path("/Maps/Misc/other.yml");

    assert_eq!(
        subscription.drain(),
        vec![
            ConfigChange::CooldownSecs(12.0),
            ConfigChange::Enabled(true),
            ConfigChange::HubMapPath("/Maps/Misc/other.yml".to_string()),
        ]
    );
    assert!(subscription.drain().is_empty());
    assert!((service.current().trip_secs() - 25.5).abs() < 1e-5);

    service.unsubscribe(subscription.id);
    service.set_enabled(false);
    assert!(subscription.drain().is_empty());
    assert_eq!(service.subscriber_count(), 0);
}
