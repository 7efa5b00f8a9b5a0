/* -*- Mode: Rust; tab-width: 8; indent-tabs-mode: nil; rust-indent-offset: 2 -*-
 * vim: set ts=8 sts=2 et sw=2 tw=80:
*/

//! bbsched: a branch-and-bound machine-instruction scheduler with
//! history-based dominance pruning, for use as an alternative
//! pre-register-allocation scheduler in a compiler backend.

mod data_structures;
mod dep_graph;
mod enumerator;
mod graph_trans;
mod hist_table;
mod interface;
mod list_sched;
mod machine_model;
mod ready_list;
mod region;

pub use crate::data_structures::{
  cycle_of, mkInstIx, slot_of, BitVec, InstCount, InstIx, InstType,
  IssueType, RegIx, RegType, TypedIxVec, INVALID_VALUE,
};
pub use crate::dep_graph::{
  DataDepGraph, DdgBuilder, DepEdge, LatencyPrecision, Register,
  SchedInstruction,
};
pub use crate::enumerator::{EnumResult, EnumStats, Enumerator};
pub use crate::graph_trans::{apply_graph_trans, GraphTransType};
pub use crate::hist_table::{HistTable, ReserveSlot};
pub use crate::interface::{SchedError, Schedule, SchedulerOptions};
pub use crate::list_sched::{sched_lngth, schdul_hurstc};
pub use crate::machine_model::{
  DepKind, InstTypeInfo, IssueTypeInfo, MachineModel, RegTypeInfo,
  DEFAULT_INST_TYPE_NAME,
};
pub use crate::ready_list::{prirts_from_names, PriorityKey, SchedPriorities};
pub use crate::region::{
  cmput_sched_cost, cmput_sched_lwr_bound, schedule_region, verify_sched,
  LowerBoundAlg, SpillCostFunc,
};
