use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;
use wave_survival::config::{load_game_config, GameConfig};
use wave_survival::constants::WORLD_SCALE;
use wave_survival::game::{CombatPlugin, CombatViewPlugin, Flags};

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

/// Top-down arena: no gravity.
fn setup_physics_config(mut config: Query<&mut RapierConfiguration>) {
    for mut cfg in config.iter_mut() {
        cfg.gravity = Vec2::ZERO;
    }
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Wave Survival".into(),
                resolution: WindowResolution::new(1200, 680),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .insert_resource(ClearColor(Color::srgb(0.04, 0.04, 0.06)))
        // Compiled defaults; load_game_config overwrites them from
        // assets/combat.toml (if present) in the Startup schedule.
        .insert_resource(GameConfig::default())
        .insert_resource(Flags::open_default())
        // Colliders are sized in pixels: world units times WORLD_SCALE.
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(WORLD_SCALE))
        .add_plugins((CombatPlugin, CombatViewPlugin))
        .add_systems(
            Startup,
            (
                load_game_config,
                setup_camera.after(load_game_config),
                setup_physics_config,
            ),
        )
        .run();
}
