//! Allen Cell Types model 472306544 as an explicit multi-compartment cable model.
//!
//! `cell::Cell::build` runs the whole pipeline: load the SWC morphology,
//! attach the two-compartment axon stub, insert membrane mechanisms,
//! discretize, and write the fitted biophysics tables onto the compartments.

use pyo3::prelude::*;

pub mod cell;
pub mod channels;
pub mod compartments;
pub mod error;
pub mod swc_reader;

/// A Python module implemented in Rust.
#[pymodule]
mod cell_model_rs {
    use pyo3::exceptions::{PyIOError, PyValueError};
    use pyo3::prelude::*;

    use crate::cell::Cell;
    use crate::error::ModelError;

    fn to_pyerr(err: ModelError) -> PyErr {
        match err {
            ModelError::Io(_) => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }

    /// The cell as Python sees it, mirroring the class the model was
    /// originally distributed as.
    #[pyclass]
    struct Neuron472306544 {
        cell: Cell,
    }

    #[pymethods]
    impl Neuron472306544 {
        #[new]
        #[pyo3(signature = (name=None, x=0.0, y=0.0, z=0.0))]
        fn new(name: Option<String>, x: f64, y: f64, z: f64) -> PyResult<Self> {
            let cell = Cell::build(name, x, y, z).map_err(to_pyerr)?;
            Ok(Neuron472306544 { cell })
        }

        fn __str__(&self) -> String {
            self.cell.to_string()
        }
    }
}
