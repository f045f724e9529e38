use std::fmt;

use log::info;

use crate::channels::{self, ACTIVE_MECHANISMS, Mechanism};
use crate::compartments::{Compartment, Compartments, Group};
use crate::error::ModelError;
use crate::swc_reader::swc_reader;

/// Morphology this model was fit against, from the Allen Cell Types pipeline.
pub const MORPHOLOGY_PATH: &str = "Nr5a1-Cre_Ai14_IVSCC_-177834.02.01.01_471678482_m.swc";

/// Display name used when none is supplied.
const DEFAULT_NAME: &str = "Neuron472306544_instance";

/// Geometry of the two synthetic axon stub compartments.
const AXON_STUB_LENGTH: f64 = 30.0;
const AXON_STUB_DIAM: f64 = 1.0;

/// Loads the morphology at `path` into `target`, shifting every sample by the
/// given offsets. With `use_axon` unset the reconstructed axon is dropped at
/// import, leaving room for the model's own stub.
pub fn load_swc(
    path: &str,
    target: &mut Cell,
    use_axon: bool,
    xshift: f64,
    yshift: f64,
    zshift: f64,
) -> Result<(), ModelError> {
    let (mut nodes, parent_child_map, _child_parent_map) = swc_reader(path, None, None, None)?;

    for node in &mut nodes {
        node.x_pos += xshift;
        node.y_pos += yshift;
        node.z_pos += zshift;
    }

    target.compartments = Compartments::from_sorted_nodes(&nodes, &parent_child_map, use_axon);
    Ok(())
}

/// A fully built instance of Allen Cell Types model 472306544.
///
/// Owns every compartment exclusively; there is no shared engine state, so
/// independent cells can be built concurrently. Construction is terminal:
/// nothing mutates a cell after `build` returns it.
pub struct Cell {
    name: Option<String>,
    position: (f64, f64, f64),
    compartments: Compartments,
}

impl Cell {
    /// Builds the model from the canonical morphology file in the working
    /// directory. `(x, y, z)` is the position offset applied to every sample.
    pub fn build(name: Option<String>, x: f64, y: f64, z: f64) -> Result<Cell, ModelError> {
        Cell::build_from(MORPHOLOGY_PATH, name, x, y, z)
    }

    /// Same pipeline against an explicit morphology path.
    pub fn build_from(
        path: &str,
        name: Option<String>,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<Cell, ModelError> {
        let mut cell = Cell {
            name,
            position: (x, y, z),
            compartments: Compartments::default(),
        };

        load_swc(path, &mut cell, false, x, y, z)?;
        cell.attach_axon_stub()?;
        cell.insert_mechanisms();
        cell.discretize_model();
        cell.set_mechanism_parameters();

        info!("built {} with {} compartments", cell, cell.compartments.len());
        Ok(cell)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn position(&self) -> (f64, f64, f64) {
        self.position
    }

    /// The owning compartment store ("all", insertion order).
    pub fn compartments(&self) -> &Compartments {
        &self.compartments
    }

    /// Replaces whatever axon the import left with the model's two-compartment
    /// stub: `axon[0]` off the midpoint of the first soma compartment,
    /// `axon[1]` off the far end of `axon[0]`.
    fn attach_axon_stub(&mut self) -> Result<(), ModelError> {
        let soma0 = self
            .compartments
            .first_of(Group::Soma)
            .ok_or(ModelError::NoSoma)?;

        let mut axon0 = Compartment::new(
            "axon[0]".to_owned(),
            Group::Axon,
            AXON_STUB_LENGTH,
            AXON_STUB_DIAM,
        );
        axon0.connect(soma0, 0.5);
        let axon0_idx = self.compartments.push(axon0);

        let mut axon1 = Compartment::new(
            "axon[1]".to_owned(),
            Group::Axon,
            AXON_STUB_LENGTH,
            AXON_STUB_DIAM,
        );
        axon1.connect(axon0_idx, 1.0);
        self.compartments.push(axon1);

        Ok(())
    }

    /// Passive leak everywhere; the active set on the soma only.
    fn insert_mechanisms(&mut self) {
        for compartment in self.compartments.iter_mut() {
            compartment.insert(Mechanism::Pas);
            if compartment.group == Group::Soma {
                for mechanism in ACTIVE_MECHANISMS {
                    compartment.insert(mechanism);
                }
            }
        }
    }

    /// nseg = 1 + 2 * floor(L / 40): odd everywhere, one extra segment pair
    /// per 40 um of cable, uniform across groups.
    fn discretize_model(&mut self) {
        for compartment in self.compartments.iter_mut() {
            compartment.nseg = 1 + 2 * (compartment.length / 40.0) as usize;
        }
    }

    /// Writes the fitted tables onto the compartments: global ra/e_pas,
    /// per-group passive parameters, and the somatic channel block.
    fn set_mechanism_parameters(&mut self) {
        for compartment in self.compartments.iter_mut() {
            compartment.ra = channels::RA;
            compartment.e_pas = channels::E_PAS;

            let passive = channels::passive(compartment.group);
            compartment.cm = passive.cm;
            compartment.g_pas = passive.g_pas;

            if compartment.group == Group::Soma {
                compartment.active = Some(channels::soma_active());
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or(DEFAULT_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels;
    use std::fs;

    // Soma sphere with four basal branches of known length and one apical,
    // lengths chosen to straddle the 40 um discretization steps.
    const FIXTURE_SWC: &str = "\
# test morphology
1 1 0.0 0.0 0.0 5.0 -1
2 3 10.0 0.0 0.0 1.0 1
3 3 0.0 40.0 0.0 1.0 1
4 3 0.0 0.0 79.9 1.0 1
5 3 -80.0 0.0 0.0 1.0 1
6 4 0.0 -30.0 0.0 1.5 1
";

    fn build_fixture(name: Option<String>) -> Cell {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.swc");
        fs::write(&path, FIXTURE_SWC).unwrap();
        Cell::build_from(path.to_str().unwrap(), name, 0.0, 0.0, 0.0).unwrap()
    }

    #[test]
    fn test_axon_stub_geometry() {
        let cell = build_fixture(None);
        let axons: Vec<&Compartment> = cell.compartments().group(Group::Axon).collect();

        assert_eq!(axons.len(), 2);
        for axon in &axons {
            assert_eq!(axon.length, 30.0);
            assert_eq!(axon.diam, 1.0);
            assert_eq!(axon.nseg, 1);
        }
        assert_eq!(axons[0].name, "axon[0]");
        assert_eq!(axons[1].name, "axon[1]");
    }

    #[test]
    fn test_axon_stub_topology() {
        let cell = build_fixture(None);
        let store = cell.compartments();

        let soma0 = store.first_of(Group::Soma).unwrap();
        let axon_idxs: Vec<usize> = store
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.group == Group::Axon)
            .map(|(i, _)| i)
            .collect();

        let axon0 = &store.components[axon_idxs[0]];
        let axon1 = &store.components[axon_idxs[1]];
        assert_eq!(axon0.parent, Some(soma0));
        assert_eq!(axon0.parent_pos, 0.5);
        assert_eq!(axon1.parent, Some(axon_idxs[0]));
        assert_eq!(axon1.parent_pos, 1.0);
    }

    #[test]
    fn test_discretization_rule() {
        let cell = build_fixture(None);

        let nseg_by_length: Vec<(f64, usize)> = cell
            .compartments()
            .iter()
            .map(|c| (c.length, c.nseg))
            .collect();

        for (length, nseg) in nseg_by_length {
            assert_eq!(nseg, 1 + 2 * (length / 40.0) as usize);
            assert_eq!(nseg % 2, 1);
        }

        // The fixture pins the interesting steps: 10 -> 1, 40 -> 3, 79.9 -> 3, 80 -> 5
        let dends: Vec<&Compartment> = cell.compartments().group(Group::Dend).collect();
        let mut nsegs: Vec<(f64, usize)> =
            dends.iter().map(|c| (c.length, c.nseg)).collect();
        nsegs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        assert_eq!(nsegs[0], (10.0, 1));
        assert_eq!(nsegs[1], (40.0, 3));
        assert!((nsegs[2].0 - 79.9).abs() < 1e-9);
        assert_eq!(nsegs[2].1, 3);
        assert_eq!(nsegs[3], (80.0, 5));
    }

    #[test]
    fn test_mechanism_placement() {
        let cell = build_fixture(None);

        for compartment in cell.compartments().iter() {
            assert!(compartment.has_mechanism(Mechanism::Pas), "{}", compartment.name);

            let active_count = ACTIVE_MECHANISMS
                .iter()
                .filter(|&&m| compartment.has_mechanism(m))
                .count();
            if compartment.group == Group::Soma {
                assert_eq!(active_count, 11, "{}", compartment.name);
            } else {
                assert_eq!(active_count, 0, "{}", compartment.name);
            }
        }
    }

    #[test]
    fn test_parameter_assignment() {
        let cell = build_fixture(None);

        for compartment in cell.compartments().iter() {
            assert_eq!(compartment.ra, 69.59);
            assert_eq!(compartment.e_pas, -92.3040847778);

            let expected = channels::passive(compartment.group);
            assert_eq!(compartment.cm, expected.cm);
            assert_eq!(compartment.g_pas, expected.g_pas);

            match compartment.group {
                Group::Soma => {
                    let active = compartment.active.expect("soma carries the active block");
                    assert_eq!(active, channels::soma_active());
                    assert_eq!(compartment.g_pas, 0.000127994);
                }
                _ => assert!(compartment.active.is_none(), "{}", compartment.name),
            }
        }
    }

    #[test]
    fn test_position_offsets_shift_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.swc");
        fs::write(&path, FIXTURE_SWC).unwrap();

        let moved =
            Cell::build_from(path.to_str().unwrap(), None, 100.0, -50.0, 2.5).unwrap();
        assert_eq!(moved.position(), (100.0, -50.0, 2.5));

        let soma = moved.compartments().group(Group::Soma).next().unwrap();
        assert_eq!(soma.points[0].x, 100.0);
        assert_eq!(soma.points[0].y, -50.0);
        assert_eq!(soma.points[0].z, 2.5);

        // Geometry is shift-invariant
        let home = build_fixture(None);
        let home_lengths: Vec<f64> =
            home.compartments().iter().map(|c| c.length).collect();
        let moved_lengths: Vec<f64> =
            moved.compartments().iter().map(|c| c.length).collect();
        assert_eq!(home_lengths, moved_lengths);
    }

    #[test]
    fn test_display_name() {
        let named = build_fixture(Some("my cell".to_owned()));
        assert_eq!(named.to_string(), "my cell");
        assert_eq!(named.name(), Some("my cell"));

        let unnamed = build_fixture(None);
        assert_eq!(unnamed.to_string(), "Neuron472306544_instance");
        assert_eq!(unnamed.name(), None);
    }

    #[test]
    fn test_missing_morphology_is_an_error() {
        let result = Cell::build_from("no/such/morphology.swc", None, 0.0, 0.0, 0.0);
        assert!(matches!(result, Err(ModelError::Io(_))));
    }

    #[test]
    fn test_morphology_without_soma_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nosoma.swc");
        // A lone dendrite root; nothing for the axon stub to attach to
        fs::write(&path, "1 3 0.0 0.0 0.0 1.0 -1\n2 3 10.0 0.0 0.0 1.0 1\n").unwrap();

        let result = Cell::build_from(path.to_str().unwrap(), None, 0.0, 0.0, 0.0);
        assert!(matches!(result, Err(ModelError::NoSoma)));
    }
}
