use std::collections::{HashMap, VecDeque};

use crate::channels::{ActiveParameters, Mechanism};
use crate::swc_reader::{Node, StructureIdentifier};

/// Morphological compartment groups.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Group {
    Soma,
    Axon,
    Dend,
    Apic,
}

impl Group {
    pub fn as_str(self) -> &'static str {
        match self {
            Group::Soma => "soma",
            Group::Axon => "axon",
            Group::Dend => "dend",
            Group::Apic => "apic",
        }
    }
}

impl From<StructureIdentifier> for Group {
    fn from(id: StructureIdentifier) -> Self {
        match id {
            StructureIdentifier::Soma => Group::Soma,
            StructureIdentifier::Axon => Group::Axon,
            StructureIdentifier::ApicalDendrite => Group::Apic,
            // Undefined/fork/end/custom markers carry no better label
            _ => Group::Dend,
        }
    }
}

/// One 3-d sample along a compartment, after position shifts.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Sampled diameter at this point
    pub d: f64,
}

/// A discretized stretch of neuronal cable with uniform electrical properties.
///
/// Every parameter the model assigns is an explicit named field here; there is
/// no dynamic attribute store. The active block stays `None` outside the soma.
pub struct Compartment {
    /// `soma[0]`-style name, per-group insertion order
    pub name: String,
    pub group: Group,
    /// Index of the parent compartment in the owning store; None for the root
    pub parent: Option<usize>,
    /// Position on the parent (0.0 proximal, 1.0 distal) this compartment attaches to
    pub parent_pos: f64,

    /// Cable length (um)
    pub length: f64,
    /// Cable diameter (um), mean over the samples
    pub diam: f64,
    /// Number of numerical sub-segments; odd, >= 1
    pub nseg: usize,
    /// 3-d samples the compartment was built from; empty for synthetic stubs
    pub points: Vec<Point3d>,

    /// Axial resistance (ohm cm)
    pub ra: f64,
    /// Specific membrane capacitance (uF/cm2)
    pub cm: f64,
    /// Passive leak reversal potential (mV)
    pub e_pas: f64,
    /// Passive leak conductance (S/cm2)
    pub g_pas: f64,

    /// Inserted mechanisms, insertion order
    pub mechanisms: Vec<Mechanism>,
    /// Somatic channel parameters; None for every other group
    pub active: Option<ActiveParameters>,
}

impl Compartment {
    pub(crate) fn new(name: String, group: Group, length: f64, diam: f64) -> Compartment {
        Compartment {
            name,
            group,
            parent: None,
            parent_pos: 1.0,
            length,
            diam,
            nseg: 1,
            points: Vec::new(),
            ra: 0.0,
            cm: 0.0,
            e_pas: 0.0,
            g_pas: 0.0,
            mechanisms: Vec::new(),
            active: None,
        }
    }

    /// Attach this compartment to `parent` at `pos` along its length.
    pub(crate) fn connect(&mut self, parent: usize, pos: f64) {
        self.parent = Some(parent);
        self.parent_pos = pos;
    }

    /// Insert a mechanism; inserting twice is a no-op.
    pub fn insert(&mut self, mechanism: Mechanism) {
        if !self.mechanisms.contains(&mechanism) {
            self.mechanisms.push(mechanism);
        }
    }

    pub fn has_mechanism(&self, mechanism: Mechanism) -> bool {
        self.mechanisms.contains(&mechanism)
    }
}

fn square(x: f64) -> f64 {
    x * x
}

/// Assumes simple direct path between the nodes
fn compute_length(curr: &Node, other: &Node) -> f64 {
    let x_diff = square(curr.x_pos - other.x_pos);
    let y_diff = square(curr.y_pos - other.y_pos);
    let z_diff = square(curr.z_pos - other.z_pos);
    (x_diff + y_diff + z_diff).sqrt()
}

/// The single owning store of compartments. Group collections are views over
/// the membership tags; "all" is the store itself, insertion order.
#[derive(Default)]
pub struct Compartments {
    pub components: Vec<Compartment>,
}

impl Compartments {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Compartment> {
        self.components.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Compartment> {
        self.components.iter_mut()
    }

    /// Compartments of one group, per-group insertion order.
    pub fn group(&self, group: Group) -> impl Iterator<Item = &Compartment> {
        self.components.iter().filter(move |c| c.group == group)
    }

    /// Store index of the first compartment of `group`.
    pub fn first_of(&self, group: Group) -> Option<usize> {
        self.components.iter().position(|c| c.group == group)
    }

    pub(crate) fn push(&mut self, compartment: Compartment) -> usize {
        self.components.push(compartment);
        self.components.len() - 1
    }

    /// Builds compartments from a topologically sorted morphology.
    ///
    /// One compartment per unbranched run of same-type nodes: runs break at
    /// branch points and at type changes. Run length is the path length back
    /// to the parent node, summed along the run; a single-sample root
    /// collapses to a sphere-equivalent cable (L = diam = 2r). With
    /// `use_axon` unset, reconstructed axon subtrees are dropped at import.
    ///
    /// Node ids must be dense indices, the way `swc_reader` remaps them.
    pub(crate) fn from_sorted_nodes(
        nodes: &[Node],
        parent_child_map: &HashMap<u64, Vec<u64>>,
        use_axon: bool,
    ) -> Compartments {
        let mut store = Compartments::default();
        let mut group_counts: HashMap<Group, usize> = HashMap::new();

        let Some(root) = nodes.iter().find(|n| n.parent_id == n.node_id) else {
            return store;
        };

        // The parent->children map includes the root's self-loop
        let children_of = |id: u64| -> Vec<u64> {
            parent_child_map
                .get(&id)
                .map(|c| c.iter().copied().filter(|&child| child != id).collect())
                .unwrap_or_default()
        };

        // (first node of the run, parent compartment index)
        let mut pending: VecDeque<(u64, Option<usize>)> = VecDeque::new();
        pending.push_back((root.node_id, None));

        while let Some((start_id, parent_idx)) = pending.pop_front() {
            let start = &nodes[start_id as usize];
            let group = Group::from(start.structured_identifier);
            if group == Group::Axon && !use_axon {
                // Reconstructed axon dropped at import; the model attaches its own stub
                continue;
            }

            // Extend the run while the chain is unbranched and stays in one group
            let mut run: Vec<u64> = vec![start_id];
            loop {
                let tail = *run.last().unwrap();
                let tail_children = children_of(tail);
                match tail_children[..] {
                    [only]
                        if Group::from(nodes[only as usize].structured_identifier) == group =>
                    {
                        run.push(only);
                    }
                    _ => break,
                }
            }

            let mut length = if start_id == root.node_id {
                0.0
            } else {
                compute_length(start, &nodes[start.parent_id as usize])
            };
            for pair in run.windows(2) {
                length += compute_length(&nodes[pair[0] as usize], &nodes[pair[1] as usize]);
            }
            if length == 0.0 {
                // Single-sample root: sphere-equivalent cable
                length = start.radius * 2.0;
            }

            let diam = run
                .iter()
                .map(|&id| nodes[id as usize].radius * 2.0)
                .sum::<f64>()
                / run.len() as f64;

            let ordinal = group_counts.entry(group).or_insert(0);
            let name = format!("{}[{}]", group.as_str(), ordinal);
            *ordinal += 1;

            let mut compartment = Compartment::new(name, group, length, diam);
            compartment.points = run
                .iter()
                .map(|&id| {
                    let n = &nodes[id as usize];
                    Point3d {
                        x: n.x_pos,
                        y: n.y_pos,
                        z: n.z_pos,
                        d: n.radius * 2.0,
                    }
                })
                .collect();
            if let Some(parent) = parent_idx {
                compartment.connect(parent, 1.0);
            }
            let idx = store.push(compartment);

            let tail = *run.last().unwrap();
            for child in children_of(tail) {
                pending.push_back((child, Some(idx)));
            }
        }

        store
    }
}
