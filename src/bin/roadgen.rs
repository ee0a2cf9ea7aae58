use bevy::app::App;
use bevy::log::{Level, LogPlugin};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use waygen::config::{load_settings, load_settings_from, save_settings};
use waygen::{GenerationResult, RoadNetworkGenerator, RoadResult, WorldDefinition, WorldParams};

mod roadgen {
    pub mod cli_utils;
    pub mod settlement_scatter;
    pub mod terrain_builder;
}

use roadgen::cli_utils::*;
use roadgen::settlement_scatter::{ScatterConfig, scatter_settlements};
use roadgen::terrain_builder::TerrainBuilder;

#[derive(Parser, Clone)]
#[command(name = "roadgen")]
#[command(about = "Generate a terrain, scatter settlements and connect them with roads")]
struct Args {
    /// World name, also used for output file names
    #[arg(long, default_value = "generated_world")]
    name: String,

    /// Heightmap size in samples (format: WIDTHxHEIGHT)
    #[arg(long, default_value = "200x200")]
    size: String,

    /// Meters per heightmap cell
    #[arg(long, default_value = "20.0")]
    scale: f32,

    /// Terrain type preset (flat, hills, mountains, river, archipelago)
    /// or custom algorithm (perlin, ridged)
    #[arg(long, default_value = "hills")]
    terrain_type: String,

    /// Random seed for reproducible generation
    #[arg(long)]
    seed: Option<u32>,

    /// Terrain amplitude (height variation in meters)
    #[arg(long, default_value = "40.0")]
    amplitude: f32,

    /// Base frequency for noise (terrain feature density)
    #[arg(long, default_value = "0.0015")]
    frequency: f32,

    /// Number of noise octaves for detail
    #[arg(long, default_value = "4")]
    octaves: u32,

    /// Water surface height; terrain below this is water
    #[arg(long, default_value = "0.0")]
    sea_level: f32,

    /// Number of settlements to place
    #[arg(long, default_value = "12")]
    settlements: u32,

    /// Settlement population range as min,max
    #[arg(long, default_value = "50,5000")]
    population: String,

    /// Minimum distance between settlement centres in meters
    #[arg(long, default_value = "300.0")]
    min_spacing: f32,

    /// Generation settings file (TOML); defaults to the user config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write the effective settings to the user config directory
    #[arg(long)]
    write_settings: bool,

    /// Never build bridges; routes avoid water instead
    #[arg(long)]
    no_bridges: bool,

    /// Carve the finished roads into the terrain before saving the world
    #[arg(long)]
    carve: bool,

    /// Directory receiving the world and road network files
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Log pipeline internals at debug level
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> App {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let mut app = App::new();
    app.add_plugins(LogPlugin {
        level,
        filter: "wgpu=error,naga=warn".to_string(),
        ..Default::default()
    });
    app
}

fn main() -> RoadResult<()> {
    let args = Args::parse();
    let _log_app = init_logging(args.verbose);

    // Parse and validate all CLI arguments
    let (width, height) = parse_size(&args.size)?;
    let population_range = parse_population_range(&args.population)?;
    let settlement_count = validate_settlement_count(args.settlements);
    validate_output_name(&args.name)?;

    let mut settings = match &args.settings {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    if args.no_bridges {
        settings.routing.allow_bridges = false;
    }
    if args.carve {
        settings.carving.enabled = true;
    }
    if args.write_settings {
        save_settings(&settings)?;
    }

    let generator = TerrainBuilder::new(args.terrain_type.clone())
        .seed(args.seed)
        .amplitude(args.amplitude)
        .frequency(args.frequency)
        .octaves(args.octaves)
        .build()?;
    let seed = generator.seed;

    println!("Generating world: {}", args.name);
    println!("Terrain size: {width}x{height} samples at {} m (seed: {seed})", args.scale);
    let terrain = generator.generate(width, height, args.scale)?;

    let extent = terrain.world_width().max(terrain.world_depth());
    let params = WorldParams::new(args.sea_level, extent)?;
    let settlements = scatter_settlements(
        &terrain,
        params.sea_level,
        &ScatterConfig {
            count: settlement_count,
            population_range,
            min_spacing: args.min_spacing,
            max_slope_degrees: 12.0,
            seed: seed.wrapping_add(1337),
        },
    );

    let mut world = WorldDefinition::new(args.name.clone(), terrain, params, settlements)?;
    let network = RoadNetworkGenerator::new(params, settings)?;
    let result = network.generate(&world.settlements, Some(&world.terrain));

    if args.carve {
        let cells = network.carve_terrain(&result, Some(&mut world.terrain))?;
        println!("Carved {cells} terrain cells");
    }

    let world_path = args.out_dir.join(format!("{}.world.bin", args.name));
    let roads_path = args.out_dir.join(format!("{}.roads.bin", args.name));
    world.save_to_file(&world_path)?;
    result.to_snapshot(&params).save_to_file(&roads_path)?;

    print_summary(&world, &result, &world_path, &roads_path);
    Ok(())
}

fn print_summary(
    world: &WorldDefinition,
    result: &GenerationResult,
    world_path: &Path,
    roads_path: &Path,
) {
    println!("World saved to: {}", world_path.display());
    println!("Road network saved to: {}", roads_path.display());

    let (min_h, max_h) = world.terrain.min_max_height();
    println!("\nWorld summary:");
    println!(
        "  Terrain: {}x{} at scale {} (heights {:.1} to {:.1})",
        world.terrain.width, world.terrain.height, world.terrain.scale, min_h, max_h
    );
    println!("  Settlements: {}", world.settlements.len());

    println!("\nRoad network:");
    println!(
        "  Status: {}",
        if result.success { "complete" } else { "completed with errors" }
    );
    println!(
        "  Segments: {} from {} planned connections",
        result.road_segments.len(),
        result.planned_connections
    );

    let mut tiers = BTreeMap::new();
    for segment in &result.road_segments {
        if let Some(bridge) = &segment.bridge {
            *tiers.entry(bridge.profile.tier.to_string()).or_insert(0) += 1;
        }
    }
    println!("  Bridges: {}", result.bridge_count());
    for (tier, count) in tiers {
        println!("    {tier}: {count}");
    }

    let stats = result.get_navigation_stats();
    println!(
        "  Graph: {} nodes, {} edges, {} component(s), {} isolated",
        stats.total_nodes, stats.total_edges, stats.connected_components, stats.isolated_nodes
    );
    println!(
        "  Length: {:.0} m total, {:.0} m on bridges, average degree {:.2}",
        stats.total_length, stats.bridge_length, stats.avg_node_degree
    );
    for (road_type, length) in &stats.length_by_type {
        println!("    {road_type}: {length:.0} m");
    }
    println!(
        "  Mesh triangles: {}",
        result.meshes.iter().map(|m| m.triangle_count()).sum::<usize>()
    );

    if !result.violations.is_empty() {
        println!("  Constraint violations: {}", result.violations.len());
    }
    for warning in &result.warnings {
        println!("  Warning: {warning}");
    }
    for error in result.error_messages() {
        println!("  Error: {error}");
    }
}
