use cgpgrid::engines::generation::{
    create_population, Configuration, Creator, Decoder, GridGeometry, RandomCreator,
};
use cgpgrid::engines::placement::{DependencyGraph, PlacementMap};
use cgpgrid::functions::{OperatorCatalog, OperatorDescriptor};
use cgpgrid::types::{Category, ParameterKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two single-input operators sharing one category
fn create_catalog() -> OperatorCatalog {
    OperatorCatalog::from_definitions(&[
        OperatorDescriptor::new("Erosion", 1)
            .with_parameter(vec![1.0, 2.0, 3.0, 4.0], ParameterKind::Continuous)
            .with_category(Category::RegionToRegion),
        OperatorDescriptor::new("Dilation", 1)
            .with_parameter(vec![1.0, 2.0, 3.0], ParameterKind::Continuous)
            .with_category(Category::RegionToRegion),
    ])
    .expect("catalog")
}

fn create_graph() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let region = graph.add_node(Category::RegionToRegion);
    graph.set_outputs(vec![region]).expect("outputs");
    graph
}

fn create_configuration() -> Configuration {
    let placement = PlacementMap::new(create_catalog(), create_graph()).expect("placement map");
    Configuration::builder(GridGeometry {
        rows: 3,
        columns: 4,
        levels_back: 1,
        input_count: 2,
        parameter_count: 1,
        program_input_count: 1,
        outputs_count: 1,
    })
    .placement_map(placement)
    .build()
    .expect("configuration")
}

#[test]
fn test_placement_of_single_category_grid() {
    init_logging();
    let config = create_configuration();

    for column in 0..config.columns() {
        assert_eq!(config.operator_bounds(column), &[0, 1]);
        for op in [0, 1] {
            assert_eq!(config.input_bounds(column, op, 0).unwrap(), &[-1]);
        }
    }
    let expected: Vec<i64> = (0..12).collect();
    assert_eq!(config.program_output_bounds(), expected.as_slice());
    assert_eq!(config.length(), 4 * 12 + 1);
}

#[test]
fn test_fifty_genomes_decode() {
    init_logging();
    let config = create_configuration();
    let decoder = Decoder::new(&config);
    let mut rng = StdRng::seed_from_u64(2024);

    for i in 0..50 {
        let genome = RandomCreator::new().create(&config, &mut rng).expect("genome");
        config.validate_genome(&genome).expect("legal genome");

        let active = decoder.active_nodes(&genome).expect("active nodes");
        assert!(!active.is_empty(), "genome {} has no active node", i);

        let tree = decoder.execution_tree(&genome, Some(&active)).expect("tree");
        let order = tree.topological_order().expect("acyclic tree");
        assert_eq!(order.len(), active.len());

        let decoded = decoder.decode(&genome).expect("decode");
        assert_eq!(decoded.len(), active.grid_nodes().len());
        for node in &decoded {
            assert_eq!(node.inputs, vec![-1]);
            assert_eq!(node.parameters.len(), 1);
        }
    }
}

#[test]
fn test_parallel_population_matches_sequential_seeds() {
    init_logging();
    let config = create_configuration();
    let population = create_population(&RandomCreator::new(), &config, 50, 7).expect("population");
    assert_eq!(population.len(), 50);

    for (i, genome) in population.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(7 + i as u64);
        let expected = RandomCreator::new().create(&config, &mut rng).expect("genome");
        assert_eq!(genome, &expected);
    }

    let distinct: HashSet<String> = population.iter().map(|g| format!("{:?}", g.flatten())).collect();
    println!("{} distinct genomes out of {}", distinct.len(), population.len());
    assert!(distinct.len() > 1);
}
