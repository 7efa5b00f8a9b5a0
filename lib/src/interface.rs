/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! The public surface of the scheduler library: error kinds, the options
//! block consumed by the core, and the schedule representation handed back
//! to the caller.

use crate::data_structures::{InstCount, InstIx, TypedIxVec};
use crate::graph_trans::GraphTransType;
use crate::ready_list::SchedPriorities;
use crate::region::{LowerBoundAlg, SpillCostFunc};
use std::fmt;

//=============================================================================
// Errors

/// Fatal conditions reported to the caller.  Timeouts are not errors: the
/// scheduler returns the incumbent schedule with `is_optml == false`.
#[derive(Clone, Debug)]
pub enum SchedError {
  /// Cycle detected, orphan instruction, or malformed boundary structure.
  InvalidDag(String),
  /// Issue rate of zero, inconsistent slot totals, or similar.
  InfeasibleModel(String),
  /// An unknown transformation, cost function, or priority name.
  InvalidConfig(String),
  /// An internal arena ran out of index space.
  OutOfMemory(String),
}

impl fmt::Display for SchedError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match self {
      SchedError::InvalidDag(s) => write!(fmt, "invalid DAG: {}", s),
      SchedError::InfeasibleModel(s) => {
        write!(fmt, "infeasible machine model: {}", s)
      }
      SchedError::InvalidConfig(s) => write!(fmt, "invalid config: {}", s),
      SchedError::OutOfMemory(s) => write!(fmt, "out of memory: {}", s),
    }
  }
}

impl std::error::Error for SchedError {}

//=============================================================================
// Options

/// All knobs consumed by the core.  Parsing these out of whatever
/// configuration syntax the host compiler uses is the caller's business.
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
  pub spill_cost_func: SpillCostFunc,
  pub lower_bound_alg: LowerBoundAlg,
  /// Transformations applied before enumeration, in order.
  pub graph_trans: Vec<GraphTransType>,
  /// Time limit for the whole region, in milliseconds.  0 means no limit.
  pub region_timeout_ms: u64,
  /// Time limit per target schedule length, in milliseconds.  0 means no
  /// limit.
  pub lngth_timeout_ms: u64,
  /// Interpret the two timeouts as per-instruction budgets (scaled by the
  /// number of real instructions) rather than per-block ones.
  pub timeout_per_inst: bool,
  /// Explore schedules containing stall slots.  With unpipelined
  /// instructions this can produce strictly better schedules.
  pub enumerate_stalls: bool,
  /// log2 of the history-table bucket count.
  pub hist_table_hash_bits: u16,
  /// Weight of the spill cost relative to schedule length in the objective.
  pub spill_cost_factor: InstCount,
  /// Skip enumeration if the heuristic schedule's spill cost exceeds this.
  /// 0 means no limit.
  pub max_spill_cost: InstCount,
  /// Regions outside [min_dag_size, max_dag_size] keep their heuristic
  /// schedule.
  pub min_dag_size: InstCount,
  pub max_dag_size: InstCount,
  /// Force live-in-defining instructions ahead of all independent ones.
  pub fix_live_in: bool,
  /// Force live-out-using instructions after all independent ones.
  pub fix_live_out: bool,
  /// Priority list for the heuristic list scheduler.
  pub hurstc_prirts: SchedPriorities,
  /// Priority list for the enumerator's ready list.
  pub enum_prirts: SchedPriorities,
}

impl Default for SchedulerOptions {
  fn default() -> Self {
    use crate::ready_list::PriorityKey;
    SchedulerOptions {
      spill_cost_func: SpillCostFunc::Perp,
      lower_bound_alg: LowerBoundAlg::LangevinCerny,
      graph_trans: Vec::new(),
      region_timeout_ms: 0,
      lngth_timeout_ms: 0,
      timeout_per_inst: false,
      enumerate_stalls: true,
      hist_table_hash_bits: 16,
      spill_cost_factor: 1,
      max_spill_cost: 0,
      min_dag_size: 1,
      max_dag_size: 1000,
      fix_live_in: false,
      fix_live_out: false,
      hurstc_prirts: vec![
        PriorityKey::CrtclPath,
        PriorityKey::ScsrCnt,
        PriorityKey::NodeNum,
      ],
      enum_prirts: vec![
        PriorityKey::CrtclPath,
        PriorityKey::ScsrCnt,
        PriorityKey::NodeNum,
      ],
    }
  }
}

//=============================================================================
// Schedules

/// A complete schedule for one region: an issue time on the slot clock for
/// every real instruction, plus the achieved length and cost figures.
///
/// Times are 1-based: the instruction issued at time t occupies cycle
/// (t-1)/R, slot (t-1) mod R, where R is the issue rate.  Times within
/// [1, lngth*R] not claimed by any instruction are stalls.
#[derive(Clone, Debug)]
pub struct Schedule {
  pub times: TypedIxVec<InstIx, InstCount>,
  pub lngth: InstCount,
  pub cost: InstCount,
  pub peak_spill_cost: InstCount,
  pub spill_cost_sum: InstCount,
  pub is_optml: bool,
}

impl Schedule {
  pub fn cycle_of(&self, inst: InstIx, issue_rate: InstCount) -> InstCount {
    (self.times[inst] - 1) / issue_rate
  }

  /// The instructions in issue order.
  pub fn order(&self) -> Vec<InstIx> {
    let mut order: Vec<InstIx> =
      (0..self.times.len()).map(crate::data_structures::mkInstIx).collect();
    order.sort_by_key(|ix| self.times[*ix]);
    order
  }
}
