use crate::compartments::Group;

///
/// The membrane mechanisms inserted into the compartments.
/// Mechanism set as per: https://nrn.readthedocs.io/en/9.0.0/tutorials/scripting-neuron-basics.html#Biophysical-mechanisms
///
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Mechanism {
    /// Passive leak, inserted everywhere
    Pas,
    /// Intracellular calcium buffering/decay
    CaDynamics,
    /// High-voltage-activated calcium
    CaHva,
    /// Low-voltage-activated calcium
    CaLva,
    /// Hyperpolarization-activated cation (h-current)
    Ih,
    /// Muscarinic potassium
    Im,
    /// Persistent potassium
    KP,
    /// Transient potassium
    KT,
    /// Fast potassium (Kv3.1)
    Kv31,
    /// Transient sodium
    NaTs,
    /// Persistent sodium
    Nap,
    /// Small-conductance calcium-activated potassium
    Sk,
}

impl Mechanism {
    /// The mechanism name as the simulation engine's mod files spell it.
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::Pas => "pas",
            Mechanism::CaDynamics => "CaDynamics",
            Mechanism::CaHva => "Ca_HVA",
            Mechanism::CaLva => "Ca_LVA",
            Mechanism::Ih => "Ih",
            Mechanism::Im => "Im",
            Mechanism::KP => "K_P",
            Mechanism::KT => "K_T",
            Mechanism::Kv31 => "Kv3_1",
            Mechanism::NaTs => "NaTs",
            Mechanism::Nap => "Nap",
            Mechanism::Sk => "SK",
        }
    }
}

/// The eleven active mechanisms; these go onto the soma only.
pub const ACTIVE_MECHANISMS: [Mechanism; 11] = [
    Mechanism::CaDynamics,
    Mechanism::CaHva,
    Mechanism::CaLva,
    Mechanism::Ih,
    Mechanism::Im,
    Mechanism::KP,
    Mechanism::KT,
    Mechanism::Kv31,
    Mechanism::NaTs,
    Mechanism::Nap,
    Mechanism::Sk,
];

// The constants below come out of the Allen Institute's perisomatic fitting
// pipeline and are opaque calibration data; the tests lock them against the
// published model.

/// Axial resistance (ohm cm), every compartment.
pub const RA: f64 = 69.59;

/// Passive reversal potential (mV), every compartment.
pub const E_PAS: f64 = -92.3040847778;

/// Per-group passive membrane parameters.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct PassiveParameters {
    /// Specific membrane capacitance (uF/cm2)
    pub cm: f64,
    /// Passive leak conductance (S/cm2)
    pub g_pas: f64,
}

/// Fitted passive parameters for a compartment group. The dendritic cm
/// stands in for spine area the reconstruction does not capture.
pub fn passive(group: Group) -> PassiveParameters {
    match group {
        Group::Apic => PassiveParameters {
            cm: 3.32,
            g_pas: 5.53024413679e-05,
        },
        Group::Axon => PassiveParameters {
            cm: 1.0,
            g_pas: 0.000543836758861,
        },
        Group::Dend => PassiveParameters {
            cm: 3.32,
            g_pas: 7.21843220556e-05,
        },
        Group::Soma => PassiveParameters {
            cm: 1.0,
            g_pas: 0.000127994,
        },
    }
}

/// Somatic reversal potentials and maximal conductances, one field per fitted
/// constant. Only soma compartments ever carry these.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct ActiveParameters {
    /// Sodium reversal potential (mV)
    pub ena: f64,
    /// Potassium reversal potential (mV)
    pub ek: f64,
    pub gbar_im: f64,
    pub gbar_ih: f64,
    pub gbar_na_ts: f64,
    pub gbar_nap: f64,
    pub gbar_k_p: f64,
    pub gbar_k_t: f64,
    pub gbar_sk: f64,
    pub gbar_kv3_1: f64,
    pub gbar_ca_hva: f64,
    pub gbar_ca_lva: f64,
    /// Fraction of calcium influx reaching the buffered pool
    pub gamma_ca_dynamics: f64,
    /// Calcium removal time constant (ms)
    pub decay_ca_dynamics: f64,
}

/// The fitted somatic channel table.
pub fn soma_active() -> ActiveParameters {
    ActiveParameters {
        ena: 53.0,
        ek: -107.0,
        gbar_im: 0.00191334,
        gbar_ih: 2.44044e-09,
        gbar_na_ts: 0.421007,
        gbar_nap: 0.000356633,
        gbar_k_p: 0.000650387,
        gbar_k_t: 0.000211966,
        gbar_sk: 0.000185708,
        gbar_kv3_1: 0.09298,
        gbar_ca_hva: 0.000579632,
        gbar_ca_lva: 0.00536169,
        gamma_ca_dynamics: 0.00324249,
        decay_ca_dynamics: 344.751,
    }
}
