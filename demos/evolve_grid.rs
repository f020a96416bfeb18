use cgpgrid::config::{ConfigManager, ENV_PREFIX};
use cgpgrid::engines::generation::{Decoder, Genome, Mutator};
use cgpgrid::engines::placement::{presets, PlacementMap};
use cgpgrid::functions::{OperatorCatalog, OperatorDescriptor};
use cgpgrid::types::{Category, ParameterKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;

fn create_catalog() -> anyhow::Result<OperatorCatalog> {
    Ok(OperatorCatalog::from_definitions(&[
        OperatorDescriptor::new("GaussFilter", 1)
            .with_parameter(vec![3.0, 5.0, 7.0, 9.0, 11.0], ParameterKind::Continuous)
            .with_category(Category::ImageToImage),
        OperatorDescriptor::new("MeanImage", 1)
            .with_parameter(vec![3.0, 5.0, 7.0], ParameterKind::Continuous)
            .with_category(Category::ImageToImage),
        OperatorDescriptor::new("SobelAmp", 1)
            .with_parameter(vec![3.0, 5.0, 7.0], ParameterKind::Categorical)
            .with_category(Category::EdgeAmplitude),
        OperatorDescriptor::new("Threshold", 1)
            .with_parameter(vec![32.0, 64.0, 96.0, 128.0, 160.0, 192.0, 224.0], ParameterKind::Continuous)
            .with_category(Category::ImageToRegion),
        OperatorDescriptor::new("OpeningCircle", 1)
            .with_parameter(vec![1.5, 2.5, 3.5, 4.5], ParameterKind::Continuous)
            .with_category(Category::RegionToRegion),
        OperatorDescriptor::new("ClosingCircle", 1)
            .with_parameter(vec![1.5, 2.5, 3.5, 4.5], ParameterKind::Continuous)
            .with_category(Category::RegionToRegion),
        OperatorDescriptor::new("ReduceDomainThreshold", 2)
            .with_parameter(vec![64.0, 128.0, 192.0], ParameterKind::Continuous)
            .with_category(Category::ImageAndRegionToRegion),
        OperatorDescriptor::new("HysteresisThreshold", 2)
            .with_parameter(vec![20.0, 40.0, 60.0], ParameterKind::Continuous)
            .with_parameter(vec![80.0, 100.0, 120.0], ParameterKind::Continuous)
            .with_category(Category::EdgeAmpAndRegionToRegion),
    ])?)
}

/// Stand-in fitness: prefer phenotypes using many distinct grid nodes
fn fitness(decoder: &Decoder, genome: &Genome) -> anyhow::Result<usize> {
    Ok(decoder.active_nodes_with(genome, true)?.len())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("=== CGP Grid Evolution Demo ===\n");

    let args: Vec<String> = env::args().collect();
    let config_path = args.get(1).map(|s| s.as_str()).unwrap_or("cgp.toml");
    let generations: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let offspring: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(4);

    let manager = ConfigManager::new();
    manager.load_layered(config_path, ENV_PREFIX)?;
    let settings = manager.get()?;

    let placement = PlacementMap::new(create_catalog()?, presets::simple()?)?;
    let config = settings.grid.build(placement)?;
    let mutator = settings.mutation.build_mutator()?;
    let decoder = Decoder::new(&config);
    println!(
        "Grid {}x{} ({} genes), mutator {}",
        config.geometry().rows,
        config.columns(),
        config.length(),
        mutator.name()
    );

    let mut rng = StdRng::seed_from_u64(settings.mutation.seed);
    let creator = settings.mutation.build_validity_creator(|genome: &Genome| {
        decoder
            .active_nodes_with(genome, true)
            .map(|active| !active.is_empty())
            .unwrap_or(false)
    })?;
    let outcome = creator.create_checked(&config, &mut rng)?;
    if !outcome.is_valid() {
        println!("No genome with an active grid node after {} attempts", creator.max_attempts());
    }
    let mut parent = outcome.into_genome();
    let mut best = fitness(&decoder, &parent)?;

    for generation in 0..generations {
        for _ in 0..offspring {
            let child = mutator.mutate(&parent, &config, &mut rng)?;
            let score = fitness(&decoder, &child)?;
            // neutral drift: ties replace the parent
            if score >= best {
                best = score;
                parent = child;
            }
        }
        println!("Generation {}: best = {}", generation + 1, best);
    }

    println!("\n{}", decoder.render_grid(&parent)?);
    for node in decoder.decode(&parent)? {
        println!(
            "{:>3} {:<24} inputs {:?} parameters {:?}",
            node.node,
            config.catalog().name_of(node.operator),
            node.inputs,
            node.parameters
        );
    }
    Ok(())
}
