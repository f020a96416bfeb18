//! Ready-made dependency graphs for image-processing pipelines.
//!
//! Every graph is layered and acyclic. Where a category conceptually feeds
//! itself (region to region) the loop is unrolled into separate "first" and
//! "end" instances.

use super::dependency_graph::DependencyGraph;
use crate::error::Result;
use crate::types::Category;

/// Images are filtered, thresholded into regions, then refined by region
/// operators, operators mixing an image or an edge amplitude with a region.
pub fn simple() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let r2r_first = g.add_node(Category::RegionToRegion);
    let r2r_end = g.add_node(Category::RegionToRegion);
    let img_and_r2r = g.add_node(Category::ImageAndRegionToRegion);
    let edge_and_r2r = g.add_node(Category::EdgeAmpAndRegionToRegion);
    let img2r = g.add_node(Category::ImageToRegion);
    let img2img = g.add_node(Category::ImageToImage);
    let edge = g.add_node(Category::EdgeAmplitude);
    let image = g.add_input(-1)?;

    g.add_child(r2r_end, img_and_r2r)?;
    g.add_child(r2r_end, img2r)?;
    g.add_child(r2r_first, img2r)?;
    g.add_child(edge, img2img)?;
    g.add_and_dependencies(img_and_r2r, vec![vec![r2r_first, img2r], vec![img2img]])?;
    g.add_and_dependencies(edge_and_r2r, vec![vec![edge], vec![r2r_first, img2r]])?;
    g.add_child(img2r, img2img)?;
    g.add_child(img2r, edge)?;
    g.add_child(r2r_end, edge_and_r2r)?;
    g.add_child(r2r_end, r2r_first)?;
    g.add_child(img2r, image)?;
    g.add_child(img2img, image)?;
    g.add_child(edge, image)?;

    g.set_outputs(vec![r2r_end, img2r])?;
    Ok(g)
}

/// Same stages as `simple` with every stage also allowed to read the raw input
/// and a central region stage feeding back into the image stages.
/// Allows combinations that may fail at execution time.
pub fn unlimited() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let r2r_first = g.add_node(Category::RegionToRegion);
    let r2r_end = g.add_node(Category::RegionToRegion);
    let r2r_center = g.add_node(Category::RegionToRegion);
    let img_and_r2r = g.add_node(Category::ImageAndRegionToRegion);
    let edge_and_r2r = g.add_node(Category::EdgeAmpAndRegionToRegion);
    let img2r = g.add_node(Category::ImageToRegion);
    let img2img = g.add_node(Category::ImageToImage);
    let edge = g.add_node(Category::EdgeAmplitude);
    let image = g.add_input(-1)?;

    g.add_child(r2r_end, img2r)?;
    g.add_child(r2r_end, img_and_r2r)?;
    g.add_child(r2r_first, img2r)?;
    g.add_child(edge, img2img)?;
    g.add_and_dependencies(img_and_r2r, vec![vec![r2r_first, img2r], vec![img2img]])?;
    g.add_and_dependencies(edge_and_r2r, vec![vec![edge], vec![r2r_first, img2r]])?;
    g.add_child(img2r, img2img)?;
    g.add_child(img2r, edge)?;
    g.add_child(r2r_end, edge_and_r2r)?;
    g.add_child(r2r_end, r2r_first)?;
    g.add_child(img2r, image)?;
    g.add_child(img2img, image)?;
    g.add_child(edge, image)?;

    g.add_child(r2r_first, image)?;
    g.add_child(r2r_end, image)?;
    g.add_child(img2img, r2r_center)?;
    g.add_child(r2r_center, image)?;
    g.add_child(img2r, r2r_center)?;
    g.add_child(edge, r2r_center)?;
    g.add_child(edge_and_r2r, r2r_center)?;

    g.set_outputs(vec![r2r_end, img2r, img2img, edge, edge_and_r2r])?;
    Ok(g)
}

/// `simple` with a second program input feeding the edge amplitude stage
pub fn multiple_images_input() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let r2r_first = g.add_node(Category::RegionToRegion);
    let r2r_end = g.add_node(Category::RegionToRegion);
    let img_and_r2r = g.add_node(Category::ImageAndRegionToRegion);
    let edge_and_r2r = g.add_node(Category::EdgeAmpAndRegionToRegion);
    let img2r = g.add_node(Category::ImageToRegion);
    let img2img = g.add_node(Category::ImageToImage);
    let edge = g.add_node(Category::EdgeAmplitude);
    let first_image = g.add_input(-1)?;
    let second_image = g.add_input(-2)?;

    g.add_child(r2r_end, img_and_r2r)?;
    g.add_child(r2r_end, img2r)?;
    g.add_child(r2r_first, img2r)?;
    g.add_child(edge, img2img)?;
    g.add_and_dependencies(img_and_r2r, vec![vec![r2r_first, img2r], vec![img2img]])?;
    g.add_and_dependencies(edge_and_r2r, vec![vec![edge], vec![r2r_first, img2r]])?;
    g.add_child(img2r, img2img)?;
    g.add_child(img2r, edge)?;
    g.add_child(r2r_end, edge_and_r2r)?;
    g.add_child(r2r_end, r2r_first)?;
    g.add_child(img2r, first_image)?;
    g.add_child(img2img, first_image)?;
    g.add_child(edge, second_image)?;

    g.set_outputs(vec![r2r_end, img2r])?;
    Ok(g)
}

pub fn regions_only() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let r2r = g.add_node(Category::RegionToRegion);
    let region = g.add_input(-1)?;
    g.add_child(r2r, region)?;
    g.set_outputs(vec![r2r])?;
    Ok(g)
}

pub fn images_only() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let img2img = g.add_node(Category::ImageToImage);
    let image = g.add_input(-1)?;
    g.add_child(img2img, image)?;
    g.set_outputs(vec![img2img])?;
    Ok(g)
}

/// Fixed filter, threshold, morphology sequence
pub fn filter_threshold_morphology() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let r2r = g.add_node(Category::RegionToRegion);
    let img2r = g.add_node(Category::ImageToRegion);
    let img2img = g.add_node(Category::ImageToImage);
    let image = g.add_input(-1)?;
    g.add_child(r2r, img2r)?;
    g.add_child(img2r, img2img)?;
    g.add_child(img2img, image)?;
    g.add_child(img2r, image)?;
    g.set_outputs(vec![r2r])?;
    Ok(g)
}

/// Colour/gray conversions feeding orientation and binary region stages.
/// The orientation and magnitude stages are not consumed by any output and
/// get dropped during placement.
pub fn multiple_image_types_to_region() -> Result<DependencyGraph> {
    let mut g = DependencyGraph::new();
    let image = g.add_input(-1)?;
    let img2img = g.add_node(Category::ImageToImage);
    g.add_child(img2img, image)?;
    let orientation = g.add_node(Category::ImageToRegion);
    g.add_child(orientation, img2img)?;
    let _magnitude = g.add_node(Category::ImageToImage);
    let img2r = g.add_node(Category::ImageToRegion);
    g.add_child(img2r, img2img)?;
    let r2r = g.add_node(Category::RegionToRegion);
    g.add_child(r2r, img2r)?;
    g.set_outputs(vec![r2r])?;
    Ok(g)
}

/// The graphs experiments usually sweep over
pub fn collection() -> Result<Vec<DependencyGraph>> {
    Ok(vec![simple()?, unlimited()?, multiple_images_input()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_layers() {
        let graph = simple().unwrap();
        let layers = graph.layers();
        // img2img < edge < img2r < r2r_first < {img_and_r2r, edge_and_r2r} < r2r_end
        assert_eq!(layers.len(), 6);
        assert_eq!(layers[&0].len(), 1);
        assert_eq!(layers[&4].len(), 2);
        assert_eq!(graph.estimate_column_count(), 7);
        assert_eq!(graph.input_nodes().len(), 1);
    }

    #[test]
    fn test_multiple_inputs_keep_identifiers() {
        let graph = multiple_images_input().unwrap();
        let mut ids: Vec<_> = graph
            .input_nodes()
            .into_iter()
            .filter_map(|id| graph.node(id).and_then(|n| n.program_input))
            .collect();
        ids.sort();
        assert_eq!(ids, vec![-2, -1]);
        assert_eq!(graph.nodes().count(), 9);
    }

    #[test]
    fn test_all_presets_build() {
        assert!(collection().unwrap().len() == 3);
        assert!(regions_only().is_ok());
        assert!(images_only().is_ok());
        assert!(filter_threshold_morphology().is_ok());
        assert!(multiple_image_types_to_region().is_ok());
    }
}
