//! # Biome Classification Integration Test
//!
//! Runs the full default stack (settings file -> sampler -> cache ->
//! lookup -> classifier) and checks the biomes it produces.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use strata_procedural::{
    Biome, BiomeClassifier, BiomeId, BiomeProvider, BiomeTable, BiomeTableConfig, BiomeType,
    CategoryKey, Cell, DefaultBiomeRule, HeightmapKind, TerrainCategory, WorldSettings,
};

fn provider(seed: u64) -> BiomeProvider {
    let settings = WorldSettings {
        chunk_size: 16,
        region_chunks: 4,
        cache_capacity: 128,
        warmup_threads: 0,
        ..WorldSettings::with_seed(seed)
    };
    BiomeProvider::from_settings(settings).expect("settings are valid")
}

/// Test: [A, B, C] with identity 0.5 -> B and 0.99 -> C.
#[test]
fn test_identity_selects_candidate() {
    let key = CategoryKey::Climate(BiomeType::TemperateForest);
    let table = BiomeTable::builder()
        .extend(key, [Biome::Taiga, Biome::Forest, Biome::BirchForest])
        .build(DefaultBiomeRule::default());
    let classifier = BiomeClassifier::new(Arc::new(table));

    let mut cell = Cell::new();
    cell.set_terrain(TerrainCategory::Plains);
    cell.set_biome_type(BiomeType::TemperateForest);

    cell.set_identity(0.5);
    assert_eq!(classifier.classify(&cell), Biome::BirchForest.id(), "Sorted: Forest, BirchForest, Taiga");

    cell.set_identity(0.99);
    assert_eq!(classifier.classify(&cell), Biome::Taiga.id());

    cell.set_identity(0.0);
    assert_eq!(classifier.classify(&cell), Biome::Forest.id());
}

/// Test: the generated world is varied and classification is stable.
#[test]
fn test_world_biome_variety() {
    let provider = provider(12345);
    let mut counts: HashMap<BiomeId, usize> = HashMap::new();

    for x in (-6000..6000).step_by(150) {
        for z in (-6000..6000).step_by(150) {
            let cell = provider.lookup().get_cell(x, z, false).unwrap();
            *counts.entry(provider.biome_for_cell(&cell)).or_default() += 1;
        }
    }

    // Populated and direct lookups agree on the biome.
    for &(x, z) in &[(0, 0), (-1500, 450), (2999, -3000)] {
        let direct = provider.lookup().get_cell(x, z, false).unwrap();
        assert_eq!(provider.biome_at(x, z).unwrap(), provider.biome_for_cell(&direct));
    }

    println!("Biome distribution:");
    for (biome, count) in &counts {
        println!("  {biome}: {count}");
    }

    assert!(counts.len() >= 4, "Expected several biomes, found {}", counts.len());
    assert!(
        counts.keys().all(|id| id.biome().is_some()),
        "Standard table only yields built-in biomes"
    );
}

/// Test: water terrain never classifies to a land-only biome and is not a
/// spawn point.
#[test]
fn test_ocean_cells_are_water_biomes() {
    let provider = provider(99);
    let water: BTreeSet<BiomeId> = [Biome::DeepOcean, Biome::Ocean, Biome::WarmOcean, Biome::FrozenOcean]
        .into_iter()
        .map(Biome::id)
        .collect();

    for i in 0..400 {
        let (x, z) = (i * 97 - 20_000, i * -61 + 9_000);
        let cell = provider.lookup().get_cell(x, z, false).unwrap();
        if matches!(cell.terrain(), TerrainCategory::Ocean | TerrainCategory::DeepOcean) {
            assert!(water.contains(&provider.biome_for_cell(&cell)));
            assert!(!BiomeProvider::can_spawn_at(&cell));
        }
    }
}

/// Test: surface height is never below the water level.
#[test]
fn test_surface_above_water() {
    let provider = provider(7);
    let water_level = provider.lookup().settings().levels.water_level;

    for i in 0..40 {
        let (x, z) = (i * 131, i * 29);
        let surface = provider.height_at(x, z, HeightmapKind::Surface).unwrap();
        let floor = provider.height_at(x, z, HeightmapKind::OceanFloor).unwrap();
        assert!(surface >= water_level);
        assert!(surface >= floor);
    }
}

/// Test: settings and biome tables load from TOML files on disk.
#[test]
fn test_load_from_files() {
    let dir = std::env::temp_dir().join(format!("strata-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let settings_path = dir.join("world.toml");
    std::fs::write(
        &settings_path,
        "seed = 314\nchunk_size = 8\nregion_chunks = 2\nwarmup_threads = 0\n",
    )
    .unwrap();

    let settings = WorldSettings::load(&settings_path).unwrap();
    assert_eq!(settings.seed.value(), 314);
    assert_eq!(settings.region_size(), 16);

    let table_text = BiomeTable::standard().snapshot().to_toml_string().unwrap();
    let table_path = dir.join("biomes.toml");
    std::fs::write(&table_path, &table_text).unwrap();

    let config = BiomeTableConfig::from_toml_str(&std::fs::read_to_string(&table_path).unwrap()).unwrap();
    assert_eq!(BiomeTable::from_config(&config), BiomeTable::standard());

    std::fs::remove_dir_all(&dir).ok();
}
