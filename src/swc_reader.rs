use itertools::Itertools;
use log::{info, warn};
use std::collections::HashMap;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::error::ModelError;

/// We use the CNIC spec, as per: http://www.neuronland.org/NLMorphologyConverter/MorphologyFormats/SWC/Spec.html
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone)]
pub enum StructureIdentifier {
    Undefined,
    Soma,
    Axon,
    BasalDendrite,
    ApicalDendrite,
    ForkPoint,
    EndPoint,
    Custom,
}

impl From<u8> for StructureIdentifier {
    fn from(v: u8) -> Self {
        match v {
            0 => StructureIdentifier::Undefined,
            1 => StructureIdentifier::Soma,
            2 => StructureIdentifier::Axon,
            3 => StructureIdentifier::BasalDendrite,
            4 => StructureIdentifier::ApicalDendrite,
            5 => StructureIdentifier::ForkPoint,
            6 => StructureIdentifier::EndPoint,
            _ => StructureIdentifier::Custom,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Node {
    pub node_id: u64,
    pub structured_identifier: StructureIdentifier,
    pub x_pos: f64,
    pub y_pos: f64,
    pub z_pos: f64,
    pub radius: f64,
    pub parent_id: u64,
}

fn parse_line(line: &str) -> Result<Node, String> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() != 7 {
        return Err(format!("expected 7 columns, got {}", cols.len()));
    }

    let node_id = cols[0]
        .parse::<u64>()
        .map_err(|_| format!("bad node id {:?}", cols[0]))?;
    let structured_identifier: StructureIdentifier = cols[1]
        .parse::<u8>()
        .map_err(|_| format!("bad structure type {:?}", cols[1]))?
        .into();
    let x_pos = cols[2]
        .parse::<f64>()
        .map_err(|_| format!("bad x position {:?}", cols[2]))?;
    let y_pos = cols[3]
        .parse::<f64>()
        .map_err(|_| format!("bad y position {:?}", cols[3]))?;
    let z_pos = cols[4]
        .parse::<f64>()
        .map_err(|_| format!("bad z position {:?}", cols[4]))?;
    let radius = cols[5]
        .parse::<f64>()
        .map_err(|_| format!("bad radius {:?}", cols[5]))?;

    // Parse parent_id: -1 in file becomes 0 (temporary, will be self-referencing for root)
    let parent_id_raw = cols[6]
        .parse::<i64>()
        .map_err(|_| format!("bad parent id {:?}", cols[6]))?;
    let parent_id = if parent_id_raw == -1 { 0 } else { parent_id_raw as u64 };

    Ok(Node {
        node_id,
        structured_identifier,
        x_pos,
        y_pos,
        z_pos,
        radius,
        parent_id,
    })
}

/// Reads in swc from `read_path` and returns the nodes in topological order,
/// ids remapped to be sequential from 0, together with the parent -> children
/// and child -> parents maps the compartment builder consumes.
///   If a `write_path` is given, we spit out the processed, sorted, file there,
///   with the comments at the start stripped out
/// Optionally emits warnings for:
///   - zero-radius points
/// Strict mode:
///   - if any of the above warnings are hit, we terminate immediately
///
/// Based on https://en.wikipedia.org/wiki/Topological_sorting#Depth-first_search
pub fn swc_reader(
    read_path: &str,
    emit_warnings: Option<bool>,
    strict: Option<bool>,
    write_path: Option<&str>,
) -> Result<(Vec<Node>, HashMap<u64, Vec<u64>>, HashMap<u64, Vec<u64>>), ModelError> {
    let f = File::open(read_path)?;

    let mut nodes_vec: Vec<Node> = Vec::new();
    for (lineno, line) in BufReader::new(f).lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let node = parse_line(&line).map_err(|reason| ModelError::Parse {
            line: lineno + 1,
            reason,
        })?;

        if node.radius == 0.0 && emit_warnings.unwrap_or(true) {
            warn!(
                "Zero-radius for section ID: {} of type: {:?}",
                node.node_id, node.structured_identifier
            );
            if node.structured_identifier != StructureIdentifier::EndPoint
                && strict.unwrap_or(false)
            {
                return Err(ModelError::ZeroRadius { node: node.node_id });
            }
        }

        nodes_vec.push(node);
    }

    // Quick debug logs for the count of the types
    let accum_types: HashMap<StructureIdentifier, usize> = nodes_vec
        .iter()
        .map(|&node| node.structured_identifier)
        .counts();
    for el in accum_types {
        info!("{:?} - #{:?}", el.0, el.1);
    }

    // Create lookup map: node_id -> Node
    let nodes_by_id: HashMap<u64, Node> = nodes_vec.iter().map(|n| (n.node_id, *n)).collect();

    ////////////////////////
    // BFS traversal for topological order
    ////////////////////////
    // Construct mapping from parent to children for the BFS
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    for n in &nodes_vec {
        children.entry(n.parent_id).or_default().push(n.node_id);
    }

    // Find root node (parent_id == 0)
    let root = nodes_vec
        .iter()
        .find(|n| n.parent_id == 0)
        .ok_or(ModelError::NoRoot)?;

    let mut sorted_node_ids: Vec<u64> = Vec::new();
    let mut queue: VecDeque<u64> = VecDeque::new();
    queue.push_back(root.node_id);
    let mut visited: HashSet<u64> = HashSet::new();

    while let Some(node_id) = queue.pop_front() {
        if visited.contains(&node_id) {
            warn!("Cycle detected at {}", node_id);
            continue;
        }
        visited.insert(node_id);
        sorted_node_ids.push(node_id);

        // Add children to queue
        if let Some(child_ids) = children.get(&node_id) {
            for &child_id in child_ids {
                if !visited.contains(&child_id) {
                    queue.push_back(child_id);
                }
            }
        }
    }

    if sorted_node_ids.len() < nodes_vec.len() {
        warn!(
            "{} nodes unreachable from the root, dropped",
            nodes_vec.len() - sorted_node_ids.len()
        );
    }

    // Create old_id -> new_id mapping (sequential starting at 0)
    let mut old_to_new_id: HashMap<u64, u64> = HashMap::new();
    for (new_id, old_id) in sorted_node_ids.iter().enumerate() {
        old_to_new_id.insert(*old_id, new_id as u64);
    }

    // Track statistics
    let mut zero_radius_count: HashMap<String, usize> = HashMap::new();
    let mut label_breakdown: HashMap<String, usize> = HashMap::new();

    // Map forward from the soma -> dendrites
    let mut parent_child_map: HashMap<u64, Vec<u64>> = HashMap::new();
    // Map backward from dendrites -> Soma
    let mut child_parent_map: HashMap<u64, Vec<u64>> = HashMap::new();
    // Remap nodes with new sequential IDs and fix radii
    let remapped_nodes: Vec<Node> = sorted_node_ids
        .iter()
        .map(|old_id| {
            let mut node = nodes_by_id[old_id];
            let new_id = old_to_new_id[old_id];

            node.node_id = new_id;

            // Remap parent ID: root node becomes self-referencing
            node.parent_id = if node.parent_id == 0 {
                new_id // Root points to itself
            } else {
                *old_to_new_id.get(&node.parent_id).unwrap_or(&0)
            };

            // Fix radius if needed
            let type_str = format!("{:?}", node.structured_identifier);
            if node.radius == 0.0 {
                *zero_radius_count.entry(type_str.clone()).or_insert(0) += 1;
                node.radius = 1.0;
            }

            // Track label statistics
            *label_breakdown.entry(type_str).or_insert(0) += 1;

            parent_child_map
                .entry(node.parent_id)
                .or_default()
                .push(node.node_id);
            child_parent_map
                .entry(node.node_id)
                .or_default()
                .push(node.parent_id);

            node
        })
        .collect();

    // Write to file if requested
    if let Some(output_path) = write_path {
        let mut output = String::new();
        output.push_str("# Processed SWC file\n");

        for node in &remapped_nodes {
            // Written 1-based per SWC convention; the root (self-referencing
            // in memory) goes out as -1
            let parent_id = if node.parent_id == node.node_id {
                -1i64
            } else {
                node.parent_id as i64 + 1
            };

            output.push_str(&format!(
                "{} {} {:.2} {:.2} {:.2} {} {}\n",
                node.node_id + 1,
                match node.structured_identifier {
                    StructureIdentifier::Undefined => 0,
                    StructureIdentifier::Soma => 1,
                    StructureIdentifier::Axon => 2,
                    StructureIdentifier::BasalDendrite => 3,
                    StructureIdentifier::ApicalDendrite => 4,
                    StructureIdentifier::ForkPoint => 5,
                    StructureIdentifier::EndPoint => 6,
                    StructureIdentifier::Custom => 7,
                },
                node.x_pos,
                node.y_pos,
                node.z_pos,
                node.radius,
                parent_id
            ));
        }

        fs::write(output_path, output)?;
    }

    // Log summary
    info!("Processed {} nodes", remapped_nodes.len());

    if !zero_radius_count.is_empty() {
        info!(
            "SWC Label Convention: 0=undefined, 1=soma, 2=axon, 3=basal dendrite, 4=apical dendrite, 5=fork, 6=end"
        );
        info!("Fixed zero-radius points by type: {:?}", zero_radius_count);
    }

    info!("Node type breakdown: {:?}", label_breakdown);

    Ok((remapped_nodes, parent_child_map, child_parent_map))
}
