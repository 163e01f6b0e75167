use glam::{Vec2, Vec3};
use survival_waves_core::{
    host::{
        ActorFactory, ActorSpawnError, AssetResolver, NavigationQuery, ResolveError,
        SpawnPointProvider,
    },
    KindHandle, KindReference, PreloadTicket, Rotation, SpawnPoint, WaveIndex,
};
use survival_waves_world::{query, ArenaLayout, CatalogEntry, LoadBehaviour, NavigableArea, World};

fn ticket(serial: u64) -> PreloadTicket {
    PreloadTicket::new(WaveIndex::FIRST, serial)
}

fn layout() -> ArenaLayout {
    ArenaLayout {
        spawn_points: vec![
            SpawnPoint::new(Vec3::new(-300.0, 0.0, 0.0), Rotation::from_yaw(0.0)),
            SpawnPoint::new(Vec3::new(300.0, 0.0, 0.0), Rotation::from_yaw(180.0)),
        ],
        floor: NavigableArea {
            min: Vec2::splat(-500.0),
            max: Vec2::splat(500.0),
        },
        actor_capacity: 2,
        catalog: vec![
            CatalogEntry {
                reference: KindReference::new("enemies/grunt"),
                load: LoadBehaviour::After { ticks: 1 },
                spawnable: true,
            },
            CatalogEntry {
                reference: KindReference::new("enemies/titan"),
                load: LoadBehaviour::After { ticks: 3 },
                spawnable: true,
            },
            CatalogEntry {
                reference: KindReference::new("props/barrel"),
                load: LoadBehaviour::After { ticks: 1 },
                spawnable: false,
            },
            CatalogEntry {
                reference: KindReference::new("enemies/lost"),
                load: LoadBehaviour::Never,
                spawnable: true,
            },
        ],
    }
}

#[test]
fn streaming_latency_is_measured_in_advances() {
    let mut world = World::new(layout());
    world.request_kind(ticket(0), &KindReference::new("enemies/grunt"));
    world.request_kind(ticket(1), &KindReference::new("enemies/titan"));
    assert_eq!(query::pending_loads(&world), 2);

    let first = world.advance();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].ticket, ticket(0));
    assert_eq!(first[0].outcome, Ok(KindHandle::new(0)));

    assert!(world.advance().is_empty());
    let third = world.advance();
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].outcome, Ok(KindHandle::new(1)));
    assert_eq!(query::pending_loads(&world), 0);
    assert_eq!(query::tick_index(&world), 3);
}

#[test]
fn unknown_and_unspawnable_assets_fail_on_next_advance() {
    let mut world = World::new(layout());
    world.request_kind(ticket(0), &KindReference::new("enemies/ghost"));
    world.request_kind(ticket(1), &KindReference::new("props/barrel"));

    let completions = world.advance();
    assert_eq!(
        completions[0].outcome,
        Err(ResolveError::UnknownAsset("enemies/ghost".to_owned()))
    );
    assert_eq!(
        completions[1].outcome,
        Err(ResolveError::NotSpawnable("props/barrel".to_owned()))
    );
}

#[test]
fn never_loading_assets_stay_pending() {
    let mut world = World::new(layout());
    world.request_kind(ticket(0), &KindReference::new("enemies/lost"));

    for _ in 0..50 {
        assert!(world.advance().is_empty());
    }
    assert_eq!(query::pending_loads(&world), 1);
}

#[test]
fn cancelled_requests_leave_the_stream() {
    let mut world = World::new(layout());
    world.request_kind(ticket(0), &KindReference::new("enemies/lost"));
    world.request_kind(ticket(1), &KindReference::new("enemies/grunt"));

    world.cancel_kind(ticket(0));
    world.cancel_kind(ticket(7));
    assert_eq!(query::pending_loads(&world), 1);

    let completions = world.advance();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].ticket, ticket(1));
    assert_eq!(query::pending_loads(&world), 0);
}

#[test]
fn factory_enforces_kind_and_capacity() {
    let mut world = World::new(layout());

    assert_eq!(
        world.spawn_enemy(KindHandle::new(2), Vec3::ZERO, Rotation::default()),
        Err(ActorSpawnError::UnknownKind(2))
    );
    assert_eq!(
        world.spawn_enemy(KindHandle::new(0), Vec3::new(600.0, 0.0, 150.0), Rotation::default()),
        Err(ActorSpawnError::Obstructed {
            x: 600.0,
            y: 0.0,
            z: 150.0
        })
    );

    let first = world
        .spawn_enemy(KindHandle::new(0), Vec3::ZERO, Rotation::default())
        .expect("room for the first enemy");
    let _second = world
        .summon_enemy(KindHandle::new(1), Vec3::new(10.0, 0.0, 0.0))
        .expect("room for the summon");
    assert_eq!(
        world.spawn_enemy(KindHandle::new(0), Vec3::ZERO, Rotation::default()),
        Err(ActorSpawnError::CapacityReached { capacity: 2 })
    );

    assert!(world.destroy_enemy(first));
    assert!(!world.destroy_enemy(first));
    assert_eq!(query::enemy_count(&world), 1);
    assert!(world
        .spawn_enemy(KindHandle::new(0), Vec3::ZERO, Rotation::default())
        .is_ok());
    assert_eq!(query::enemy_ids(&world).len(), 2);
}

#[test]
fn spawned_enemies_keep_their_placement() {
    let mut world = World::new(layout());
    let location = Vec3::new(1.0, 2.0, 150.0);
    let rotation = Rotation::from_yaw(45.0);
    let id = world
        .spawn_enemy(KindHandle::new(0), location, rotation)
        .expect("spawn");

    let enemies = query::enemies(&world);
    assert_eq!(enemies.len(), 1);
    assert_eq!(enemies[0].id, id);
    assert_eq!(enemies[0].location, location);
    assert_eq!(enemies[0].rotation, rotation);
}

#[test]
fn reachable_points_stay_on_the_floor() {
    let mut world = World::new(layout());
    assert_eq!(world.spawn_points().len(), 2);

    for point in world.spawn_points() {
        for _ in 0..32 {
            let reachable = world
                .find_reachable_point(point.location, 400.0)
                .expect("marker is on the floor");
            assert!(reachable.x.abs() <= 500.0 && reachable.y.abs() <= 500.0);
            assert!(reachable.truncate().distance(point.location.truncate()) <= 400.0 + 1e-3);
        }
    }

    assert_eq!(
        world.find_reachable_point(Vec3::new(900.0, 0.0, 0.0), 50.0),
        None
    );
}

#[test]
fn layout_defaults_fill_missing_fields() {
    let layout: ArenaLayout = toml::from_str(
        r#"
        [[spawn_points]]
        location = [0.0, 0.0, 0.0]

        [[catalog]]
        reference = "enemies/grunt"
        load = { after = { ticks = 2 } }
        "#,
    )
    .expect("layout parses");

    assert_eq!(layout.actor_capacity, 64);
    assert_eq!(layout.floor, NavigableArea::centered(2_000.0));
    assert!(layout.catalog[0].spawnable);
    assert_eq!(layout.catalog[0].load, LoadBehaviour::After { ticks: 2 });
    assert_eq!(layout.spawn_points[0].rotation, Rotation::default());
}
