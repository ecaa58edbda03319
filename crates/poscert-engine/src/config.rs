//! Solver configuration and the feasibility status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Positivstellensatz family used for the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    /// SOS multipliers over the full bounded-degree monomial vector.
    Putinar,
    /// Hypothesis-product monoid extension; the SOS multipliers stay at
    /// degree [`SolverConfig::handelman_sos_degree`].
    Handelman,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "putinar" => Ok(Method::Putinar),
            "handelman" => Ok(Method::Handelman),
            other => Err(format!(
                "unknown method `{other}`; possible methods: putinar handelman"
            )),
        }
    }
}

/// External SDP solver used for the reduced feasibility problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    Mosek,
    Csdp,
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mosek" => Ok(Engine::Mosek),
            "csdp" => Ok(Engine::Csdp),
            other => Err(format!(
                "unknown solver engine `{other}`; possible solver engines: mosek csdp"
            )),
        }
    }
}

/// Outcome of a solve. `Unknown` before the first solve; asking for
/// solve-dependent data in that state is an error, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feasibility {
    Feasible,
    Infeasible,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Degree bound: monomial-vector degree for Putinar, monoid power-sum
    /// bound for Handelman, and the default template degree for functions
    /// declared without one.
    pub degree: u32,
    pub method: Method,
    pub engine: Engine,
    /// Injects a `1 >= 0` hypothesis into every condition so a bare SOS
    /// term is always available.
    pub add_one_geq_zero: bool,
    /// Degree of the SOS monomial vector on the Handelman path. The monoid
    /// carries the hypothesis powers, so 0 (constant multipliers) suffices.
    pub handelman_sos_degree: u32,
    /// See [`poscert_sdp::SdpProblem::set_legacy_double_remap`].
    pub legacy_double_remap: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            degree: 2,
            method: Method::Putinar,
            engine: Engine::Mosek,
            add_one_geq_zero: true,
            handelman_sos_degree: 0,
            legacy_double_remap: true,
        }
    }
}
