use cgpgrid::engines::generation::mutators::{MutatorKind, UntilActiveMutator};
use cgpgrid::engines::generation::{
    ColumnRecombinator, Configuration, Creator, Decoder, ExhaustiveCreator, GridGeometry, Genome,
    CreationOutcome, Mutator, RandomCreator, ValidityCreator,
};
use cgpgrid::config::{MutationConfig, MutationStrategy};
use cgpgrid::engines::placement::{presets, PlacementMap};
use cgpgrid::functions::{OperatorCatalog, OperatorDescriptor};
use cgpgrid::types::{Category, GenomeLayout, ParameterKind, SearchSpace};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_catalog() -> OperatorCatalog {
    OperatorCatalog::from_definitions(&[
        OperatorDescriptor::new("GaussFilter", 1)
            .with_parameter(vec![3.0, 5.0, 7.0, 9.0, 11.0], ParameterKind::Continuous)
            .with_category(Category::ImageToImage),
        OperatorDescriptor::new("MedianImage", 1)
            .with_parameter(vec![1.0, 2.0, 3.0], ParameterKind::Continuous)
            .with_parameter(vec![0.0, 1.0], ParameterKind::Categorical)
            .with_category(Category::ImageToImage),
        OperatorDescriptor::new("SobelAmp", 1)
            .with_parameter(vec![3.0, 5.0], ParameterKind::Categorical)
            .with_category(Category::EdgeAmplitude),
        OperatorDescriptor::new("Threshold", 1)
            .with_parameter(vec![32.0, 64.0, 96.0, 128.0, 160.0, 192.0], ParameterKind::Continuous)
            .with_category(Category::ImageToRegion),
        OperatorDescriptor::new("OpeningCircle", 1)
            .with_parameter(vec![1.5, 2.5, 3.5], ParameterKind::Continuous)
            .with_category(Category::RegionToRegion),
        OperatorDescriptor::new("FillUp", 1).with_category(Category::RegionToRegion),
        OperatorDescriptor::new("ReduceDomainThreshold", 2)
            .with_parameter(vec![10.0, 20.0], ParameterKind::Continuous)
            .with_category(Category::ImageAndRegionToRegion),
        OperatorDescriptor::new("HysteresisThreshold", 2)
            .with_parameter(vec![20.0, 40.0], ParameterKind::Continuous)
            .with_category(Category::EdgeAmpAndRegionToRegion),
    ])
    .expect("catalog")
}

fn create_configuration(layout: GenomeLayout, search_space: SearchSpace, self_adaptive: bool) -> Configuration {
    let placement = PlacementMap::new(create_catalog(), presets::simple().unwrap()).expect("placement");
    Configuration::builder(GridGeometry {
        rows: 3,
        columns: 9,
        levels_back: 1,
        input_count: 2,
        parameter_count: 2,
        program_input_count: 1,
        outputs_count: 2,
    })
    .layout(layout)
    .search_space(search_space)
    .step_size_metadata(true)
    .self_adaptive(self_adaptive)
    .crossover_columns(vec![3, 6])
    .placement_map(placement)
    .build()
    .expect("configuration")
}

fn all_mutators() -> Vec<MutatorKind> {
    [
        MutationStrategy::Point,
        MutationStrategy::ActiveNode,
        MutationStrategy::UntilActive,
        MutationStrategy::Probabilistic,
        MutationStrategy::CustomProbabilistic,
        MutationStrategy::SelfAdaptive,
        MutationStrategy::SinglePass,
    ]
    .into_iter()
    .map(|strategy| {
        MutationConfig {
            strategy,
            ..MutationConfig::default()
        }
        .build_mutator()
        .expect("mutator")
    })
    .collect()
}

#[test]
fn test_thousand_random_genomes_respect_bounds() {
    init_logging();
    for layout in [GenomeLayout::Linear, GenomeLayout::Columnar] {
        let config = create_configuration(layout, SearchSpace::Full, false);
        let mut rng = StdRng::seed_from_u64(1000);
        for _ in 0..1000 {
            let genome = RandomCreator::new().create(&config, &mut rng).expect("genome");
            config.validate_genome(&genome).expect("bounds");
            config.validate_parameters(&genome).expect("parameter bounds");
        }
    }
}

#[test]
fn test_mutation_chains_stay_legal() {
    init_logging();
    for layout in [GenomeLayout::Linear, GenomeLayout::Columnar] {
        let config = create_configuration(layout, SearchSpace::Full, true);
        let mut rng = StdRng::seed_from_u64(77);
        for mutator in all_mutators() {
            let mut genome = RandomCreator::new().create(&config, &mut rng).expect("genome");
            for generation in 0..40 {
                let child = mutator.mutate(&genome, &config, &mut rng).expect("mutation");
                config
                    .validate_genome(&child)
                    .unwrap_or_else(|e| panic!("{} generation {}: {}", mutator.name(), generation, e));
                // point mutation adds unbounded noise to parameter genes
                if !matches!(mutator, MutatorKind::Point(_)) {
                    config.validate_parameters(&child).expect("parameter bounds");
                }
                genome = child;
            }
            println!("{}: step size after 40 generations {:?}", mutator.name(), genome.step_size());
        }
    }
}

#[test]
fn test_parent_is_never_modified() {
    init_logging();
    let config = create_configuration(GenomeLayout::Linear, SearchSpace::Full, true);
    let mut rng = StdRng::seed_from_u64(78);
    let parent = RandomCreator::new().create(&config, &mut rng).expect("genome");
    let snapshot = parent.clone();
    for mutator in all_mutators() {
        let _ = mutator.mutate(&parent, &config, &mut rng).expect("mutation");
        assert_eq!(parent, snapshot);
    }
}

#[test]
fn test_parameters_only_mutators_keep_structure() {
    init_logging();
    let config = create_configuration(GenomeLayout::Columnar, SearchSpace::ParametersOnly, true);
    let decoder = Decoder::new(&config);
    let mut rng = StdRng::seed_from_u64(79);
    for mutator in all_mutators() {
        let parent = RandomCreator::new().create(&config, &mut rng).expect("genome");
        let child = mutator.mutate(&parent, &config, &mut rng).expect("mutation");
        assert_eq!(
            decoder.execution_tree(&parent, None).unwrap(),
            decoder.execution_tree(&child, None).unwrap(),
            "{} changed the structure",
            mutator.name()
        );
    }
}

#[test]
fn test_until_active_always_changes_phenotype() {
    init_logging();
    let config = create_configuration(GenomeLayout::Linear, SearchSpace::Full, false);
    let decoder = Decoder::new(&config);
    let mut rng = StdRng::seed_from_u64(80);
    let mutator = UntilActiveMutator::new(true);
    for _ in 0..200 {
        let parent = ExhaustiveCreator::new().create(&config, &mut rng).expect("genome");
        let (child, site) = mutator.mutate_traced(&parent, &config, &mut rng).expect("mutation");
        assert!(decoder.active_nodes(&parent).unwrap().contains(site.node as i64));
        assert_ne!(parent.get(site.address).unwrap(), child.get(site.address).unwrap());
    }
}

#[test]
fn test_recombination_copies_whole_columns() {
    init_logging();
    for layout in [GenomeLayout::Linear, GenomeLayout::Columnar] {
        let config = create_configuration(layout, SearchSpace::Full, true);
        let mut rng = StdRng::seed_from_u64(81);
        let parents: Vec<Genome> = (0..3)
            .map(|_| RandomCreator::new().create(&config, &mut rng).expect("genome"))
            .collect();
        let refs: Vec<&Genome> = parents.iter().collect();
        let child = ColumnRecombinator::new().recombine(&refs, &config).expect("child");

        for column in 0..config.columns() {
            let (vector, range) = config.column_gene_range(column);
            let genes = &child.vectors()[vector][range.clone()];
            let donors = parents
                .iter()
                .filter(|p| &p.vectors()[vector][range.clone()] == genes)
                .count();
            assert!(donors >= 1, "column {} matches no parent", column);
        }
        assert_eq!(child.step_size(), parents[2].step_size());
        config.validate_genome(&child).expect("bounds");
    }
}

#[test]
fn test_validity_creator_finds_wide_genomes() {
    init_logging();
    let config = create_configuration(GenomeLayout::Linear, SearchSpace::Full, false);
    let decoder = Decoder::new(&config);
    let mut rng = StdRng::seed_from_u64(82);
    let creator = ValidityCreator::new(|genome: &Genome| {
        decoder
            .active_nodes_with(genome, true)
            .map(|active| active.len() >= 3)
            .unwrap_or(false)
    });
    let outcome = creator.create_checked(&config, &mut rng).expect("creation");
    assert!(outcome.is_valid());
    let genome = outcome.into_genome();
    assert!(decoder.active_nodes_with(&genome, true).unwrap().len() >= 3);
}

#[test]
fn test_configured_validity_budget_runs_out() {
    init_logging();
    let config = create_configuration(GenomeLayout::Linear, SearchSpace::Full, false);
    let mut rng = StdRng::seed_from_u64(83);
    let settings = MutationConfig {
        validity_attempts: 3,
        ..MutationConfig::default()
    };
    let calls = std::sync::atomic::AtomicUsize::new(0);
    let creator = settings
        .build_validity_creator(|_: &Genome| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            false
        })
        .expect("creator");
    assert_eq!(creator.max_attempts(), 3);

    let outcome = creator.create_checked(&config, &mut rng).expect("creation");
    assert!(matches!(outcome, CreationOutcome::Exhausted(_)));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    config.validate_genome(&outcome.into_genome()).expect("bounds");
}
