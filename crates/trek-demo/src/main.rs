//! Headless demo that drives a procedural globe through a scripted session.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p trek-demo` to watch the log output.
//! Run with `cargo run -p trek-demo -- --height-exaggeration 3 --ticks 600` to override.

mod interaction_demos;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use trek_config::{CliArgs, Config};
use trek_geo::BoundingBox;
use trek_layers::{LayerStack, MemoryTextureProvider};
use trek_terrain::{
    InMemoryRegistry, ModelId, NoiseElevation, TerrainModel, TerrainRegistry, TerrainVariant,
};

/// Simulated frame time.
const FRAME_DT: f32 = 1.0 / 60.0;

/// Extra products layered over the global mosaic.
const DEMO_PRODUCTS: [&str; 3] = ["ctx-mosaic", "themis-day-ir", "mola-shaded-relief"];

/// Globe with a procedural DEM and an in-memory texture provider. The returned
/// provider handle shares state with the one inside the layer stack.
fn build_globe(config: &Config) -> (TerrainModel, MemoryTextureProvider) {
    let mut globe = TerrainModel::new(
        ModelId(1),
        TerrainVariant::Globe,
        &config.terrain,
        Arc::new(NoiseElevation::default()),
    );
    let provider = MemoryTextureProvider::new();
    let stack = LayerStack::new(Box::new(provider.clone()), config.layers.clone());
    if let Err(err) = globe.attach_layer_stack(stack) {
        error!(%err, "Failed to attach layer stack");
    }
    globe.on_initialized(Box::new(|id| info!(model = id.0, "Globe initialized")));
    (globe, provider)
}

/// Queue the base mosaic and a few overlays; fetches complete on later ticks.
fn add_demo_layers(globe: &mut TerrainModel, mosaic_id: &str) {
    let Some(layers) = globe.layers_mut() else {
        return;
    };
    if let Err(err) = layers.add_layer(mosaic_id, Some(0), None) {
        warn!(%err, "Base layer not added");
    }
    for product in DEMO_PRODUCTS {
        let name = product.to_string();
        let callback = Box::new(move || info!(product = %name, "Layer request finished"));
        if let Err(err) = layers.add_layer(product, None, Some(callback)) {
            warn!(%err, product, "Layer not added");
        }
    }
}

/// Exercise layer edits once the textures have arrived.
fn edit_demo_layers(globe: &mut TerrainModel) {
    let Some(layers) = globe.layers_mut() else {
        return;
    };
    if let Err(err) = layers.update_layer(1, Some(0.5), None, None) {
        warn!(%err, "Layer update failed");
    }
    if let Err(err) = layers.move_layer(1, 3, None) {
        warn!(%err, "Layer move failed");
    }
    if let Err(err) = layers.remove_layer(2, None) {
        warn!(%err, "Layer remove failed");
    }
    match "-30,-20,60,45".parse::<BoundingBox>() {
        Ok(bbox) => layers.update_bounding_box(bbox, true),
        Err(err) => warn!(%err, "Invalid demo bounding box"),
    }
    let names: Vec<&str> = layers.layers().iter().map(|l| l.product_id.as_str()).collect();
    info!(?names, uniform = ?layers.material().to_uniform(), "Layer stack after edits");
}

fn log_lod_selection(globe: &TerrainModel) {
    let Some(group) = globe.lod_group() else {
        return;
    };
    for screen_height in [0.9_f32, 0.2, 0.05, 0.01] {
        info!(
            screen_height,
            level = ?group.select_level(screen_height),
            "LOD selection"
        );
    }
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args
        .config
        .clone()
        .or_else(trek_config::default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".trek"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {e}, using defaults");
        config = Config::default();
    }

    let log_dir = config_dir.join("logs");
    trek_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!(config_dir = %config_dir.display(), ticks = args.ticks, "Starting trek demo");

    let mut registry = InMemoryRegistry::new(config.terrain.height_exaggeration);
    registry.set_textures_enabled(!args.no_textures);
    let (mut globe, provider) = build_globe(&config);
    registry.set_globe(globe.id());
    registry.set_visible_model(Some(globe.id()));

    if let Err(err) = globe.init(&mut registry) {
        error!(%err, "Globe initialization failed");
        return;
    }
    add_demo_layers(&mut globe, &config.terrain.global_mosaic_id);

    let mut session = interaction_demos::InteractionSession::new(&config.interaction);
    let exaggeration = config.terrain.height_exaggeration;
    let mut edited = false;
    let mut was_ready = false;

    for tick in 0..args.ticks {
        globe.tick(FRAME_DT, &mut registry);

        if globe.is_ready() && !was_ready {
            was_ready = true;
            log_lod_selection(&globe);
            session.on_model_ready(&mut globe);
        }
        if was_ready && !edited && globe.layers().is_some_and(|l| l.pending_fetches() == 0) {
            edited = true;
            edit_demo_layers(&mut globe);
        }

        // Two rapid changes coalesce into a single pending rescale.
        match tick {
            30 => registry.set_height_exaggeration(exaggeration * 2.0),
            31 => registry.set_height_exaggeration(exaggeration * 3.0),
            90 => globe.request_rescale(f32::NAN),
            _ => {}
        }

        if was_ready {
            session.tick(FRAME_DT, &mut globe);
        }
        std::thread::sleep(Duration::from_secs_f32(FRAME_DT));
    }

    info!(
        state = ?globe.init_state(),
        height_scale = globe.height_scale(),
        physics_updates = registry.physics_updates().len(),
        texture_fetches = provider.requests().len(),
        rotation = ?globe.transform().rotation,
        visible = ?registry.current_visible_model(),
        "Session finished"
    );
    globe.dispose(&mut registry);
}
